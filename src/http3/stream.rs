//! One HTTP/3 request stream (spec §4.4), implementing the [`Stream`] SPI
//! on top of an opaque [`QuicStream`]. Unlike the HTTP/2 adapter, no
//! separate flow-control layer is needed here — QUIC's own stream/connection
//! flow control already applies beneath the opaque provider, so `write`
//! backpressure is whatever the provider's `write` future does.

use super::frame::{self, H3Frame};
use super::qpack;
use super::quic::QuicStream;
use crate::error::{Error, Result};
use crate::frame::{Flags, Frame, FrameType};
use crate::headers::Headers;
use crate::spi::Stream;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

pub struct Http3StreamHandle {
    id: u64,
    quic: Box<dyn QuicStream>,
    read_buf: BytesMut,
    peer_ended: bool,
}

impl std::fmt::Debug for Http3StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http3StreamHandle").field("id", &self.id).finish()
    }
}

impl Http3StreamHandle {
    pub fn new(id: u64, quic: Box<dyn QuicStream>) -> Self {
        Self { id, quic, read_buf: BytesMut::new(), peer_ended: false }
    }

    fn map_frame(h3: H3Frame, end_stream: bool) -> Result<Option<Frame>> {
        match h3.frame_type {
            frame::FRAME_DATA => {
                let flags = if end_stream { Flags::END_STREAM } else { Flags::empty() };
                Ok(Some(Frame::new(FrameType::Data, flags, h3.payload)))
            }
            frame::FRAME_HEADERS => {
                let headers = qpack::decode(&h3.payload)?;
                let mut flags = Flags::END_HEADERS;
                if end_stream {
                    flags |= Flags::END_STREAM;
                }
                Ok(Some(Frame::new(FrameType::Headers, flags, headers.to_wire_bytes())))
            }
            // Unknown frame types on a request stream MUST be ignored, not
            // errored (RFC 9114 §9).
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Stream for Http3StreamHandle {
    async fn write_frame(&mut self, frame_type: FrameType, flags: Flags, data: Bytes) -> Result<()> {
        let end_stream = flags.contains(Flags::END_STREAM) || frame_type == FrameType::Status;
        let h3 = match frame_type {
            FrameType::Headers | FrameType::Metadata | FrameType::Status => {
                let headers = Headers::from_wire_bytes(&data)?;
                H3Frame::new(frame::FRAME_HEADERS, qpack::encode(&headers))
            }
            FrameType::Data => H3Frame::new(frame::FRAME_DATA, data),
            FrameType::Cancel => {
                self.cancel().await;
                return Ok(());
            }
            FrameType::Ping => {
                return Err(Error::InvalidArgument(
                    "PING is not meaningful on an HTTP/3 request stream".into(),
                ))
            }
        };
        self.quic.write(&h3.encode()).await?;
        if end_stream {
            self.quic.finish().await?;
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some((h3, consumed)) = H3Frame::try_decode(&self.read_buf)? {
                let drained_all = consumed == self.read_buf.len();
                self.read_buf = self.read_buf.split_off(consumed);
                let end_stream = drained_all && self.peer_ended;
                if let Some(frame) = Self::map_frame(h3, end_stream)? {
                    return Ok(Some(frame));
                }
                continue;
            }
            if self.peer_ended {
                return Ok(None);
            }
            let mut tmp = [0u8; 8192];
            let n = self.quic.read(&mut tmp).await?;
            if n == 0 {
                self.peer_ended = true;
            } else {
                self.read_buf.extend_from_slice(&tmp[..n]);
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.quic.finish().await
    }

    async fn cancel(&mut self) {
        self.quic.reset(0).await;
    }

    fn stream_id(&self) -> u64 {
        self.id
    }
}
