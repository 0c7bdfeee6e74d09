//! A single HTTP/2 stream (spec §4.3 "Stream"), implementing the [`Stream`]
//! SPI trait (C1) on top of the wire frame channel the connection's reader
//! task feeds. Grounded in the teacher's `stream.rs`/`stream_coordinator.rs`
//! (a per-request handle fed by a coordinator thread), generalized from a
//! single outstanding request to a long-lived bidirectional stream.

use super::connection::Shared;
use super::state_machine::StreamState;
use super::wire::{flags as wflags, WireFrame, WireType};
use crate::error::{Error, Result};
use crate::frame::{Flags, Frame, FrameType};
use crate::spi::Stream;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use super::flow_control::Window;

/// Per-stream state shared between the connection's reader task (which
/// pushes inbound frames and updates `state`) and the [`Http2StreamHandle`]
/// the caller owns (which reads from `frame_rx` and writes via `shared`).
pub(super) struct StreamEntry {
    pub frame_tx: mpsc::UnboundedSender<Result<Frame>>,
    frame_rx: Mutex<mpsc::UnboundedReceiver<Result<Frame>>>,
    pub send_window: Window,
    pub state: Mutex<StreamState>,
    pub recv_consumed: AtomicU32,
    /// Held for the stream's lifetime so `max_concurrent_streams` admission
    /// is released automatically when the entry drops out of the connection's
    /// stream map, rather than tracked by hand.
    _admission: Option<tokio::sync::OwnedSemaphorePermit>,
}

impl StreamEntry {
    pub fn new(_id: u32, _our_initial_window: u32, their_initial_window: u32) -> Self {
        Self::with_admission(_id, _our_initial_window, their_initial_window, None)
    }

    pub fn with_admission(
        _id: u32,
        _our_initial_window: u32,
        their_initial_window: u32,
        admission: Option<tokio::sync::OwnedSemaphorePermit>,
    ) -> Self {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        Self {
            frame_tx,
            frame_rx: Mutex::new(frame_rx),
            send_window: Window::new(their_initial_window),
            state: Mutex::new(StreamState::Idle),
            recv_consumed: AtomicU32::new(0),
            _admission: admission,
        }
    }
}

pub struct Http2StreamHandle {
    id: u32,
    shared: Arc<Shared>,
    entry: Arc<StreamEntry>,
}

impl std::fmt::Debug for Http2StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http2StreamHandle").field("id", &self.id).finish()
    }
}

impl Http2StreamHandle {
    pub(super) fn new(id: u32, shared: Arc<Shared>, entry: Arc<StreamEntry>) -> Self {
        Self { id, shared, entry }
    }

    async fn send_headers(&self, data: Bytes, end_stream: bool) -> Result<()> {
        let headers = crate::headers::Headers::from_wire_bytes(&data)?;
        let payload = {
            let mut encoder = self.shared.hpack_encoder.lock().await;
            encoder.encode(&headers)
        };
        let mut wire_flags = wflags::END_HEADERS;
        if end_stream {
            wire_flags |= wflags::END_STREAM;
        }
        self.shared
            .writer_tx
            .send(WireFrame::new(WireType::Headers, wire_flags, self.id, payload))
            .map_err(|_| Error::Closed)?;
        Ok(())
    }

    async fn send_data(&self, data: Bytes, end_stream: bool) -> Result<()> {
        let max_frame_size = self.shared.their_settings.lock().await.max_frame_size as usize;
        if data.is_empty() {
            self.shared.conn_send_window.wait_for_capacity(0).await;
            self.entry.send_window.wait_for_capacity(0).await;
            let flags = if end_stream { wflags::END_STREAM } else { 0 };
            self.shared
                .writer_tx
                .send(WireFrame::new(WireType::Data, flags, self.id, data))
                .map_err(|_| Error::Closed)?;
            return Ok(());
        }

        let mut offset = 0;
        while offset < data.len() {
            let remaining = data.len() - offset;
            let chunk_len = remaining.min(max_frame_size);
            let chunk = data.slice(offset..offset + chunk_len);
            self.shared
                .conn_send_window
                .wait_for_capacity(chunk_len as u32)
                .await;
            self.entry.send_window.wait_for_capacity(chunk_len as u32).await;

            offset += chunk_len;
            let is_last = offset == data.len();
            let flags = if is_last && end_stream { wflags::END_STREAM } else { 0 };
            self.shared
                .writer_tx
                .send(WireFrame::new(WireType::Data, flags, self.id, chunk))
                .map_err(|_| Error::Closed)?;
        }
        Ok(())
    }

    async fn mark_end_stream_sent(&self) {
        let closed = {
            let mut state = self.entry.state.lock().await;
            *state = match *state {
                StreamState::Idle | StreamState::Open => StreamState::HalfClosedLocal,
                StreamState::HalfClosedRemote => StreamState::Closed,
                other => other,
            };
            *state == StreamState::Closed
        };
        if closed {
            self.shared.streams.remove(&self.id);
        }
    }
}

#[async_trait]
impl Stream for Http2StreamHandle {
    async fn write_frame(&mut self, frame_type: FrameType, flags: Flags, data: Bytes) -> Result<()> {
        {
            let state = *self.entry.state.lock().await;
            if !state.can_write() {
                return Err(Error::InvalidState(format!(
                    "cannot write on stream {} in state {state:?}",
                    self.id
                )));
            }
        }
        let end_stream = flags.contains(Flags::END_STREAM);
        match frame_type {
            FrameType::Headers | FrameType::Metadata => self.send_headers(data, end_stream).await?,
            FrameType::Status => self.send_headers(data, true).await?,
            FrameType::Data => self.send_data(data, end_stream).await?,
            FrameType::Cancel => {
                self.cancel().await;
                return Ok(());
            }
            FrameType::Ping => {
                return Err(Error::InvalidArgument(
                    "PING is a connection-level frame, not a stream frame".into(),
                ))
            }
        }
        if end_stream || frame_type == FrameType::Status {
            self.mark_end_stream_sent().await;
        }
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut rx = self.entry.frame_rx.lock().await;
        match rx.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.send_data(Bytes::new(), true).await?;
        self.mark_end_stream_sent().await;
        Ok(())
    }

    async fn cancel(&mut self) {
        let _ = self.shared.writer_tx.send(WireFrame::new(
            WireType::RstStream,
            0,
            self.id,
            Bytes::copy_from_slice(&0u32.to_be_bytes()),
        ));
        *self.entry.state.lock().await = StreamState::Closed;
        self.shared.streams.remove(&self.id);
    }

    fn stream_id(&self) -> u64 {
        u64::from(self.id)
    }
}
