//! RFC 7540 §4 frame format: 9-byte header (24-bit length, 8-bit type,
//! 8-bit flags, 32-bit stream id with the reserved bit cleared) plus
//! payload. Grounded in the teacher's `Frame::try_from_stream`/`write_into`
//! (`frame.rs`), generalized from `async_std` to `tokio` I/O and from a
//! single concrete `Frame` struct to wire-header (this module) plus the
//! connection-level interpretation in `connection.rs`.

use crate::error::{Error, Result};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The client connection preface (RFC 7540 §3.5).
pub const PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub const FRAME_HEADER_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    Data = 0,
    Headers = 1,
    Priority = 2,
    RstStream = 3,
    Settings = 4,
    PushPromise = 5,
    Ping = 6,
    GoAway = 7,
    WindowUpdate = 8,
    Continuation = 9,
}

impl WireType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Data,
            1 => Self::Headers,
            2 => Self::Priority,
            3 => Self::RstStream,
            4 => Self::Settings,
            5 => Self::PushPromise,
            6 => Self::Ping,
            7 => Self::GoAway,
            8 => Self::WindowUpdate,
            9 => Self::Continuation,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WireFrame {
    pub ty: WireType,
    pub flags: u8,
    pub stream_id: u32,
    pub payload: Bytes,
}

impl WireFrame {
    pub fn new(ty: WireType, flags: u8, stream_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            ty,
            flags,
            stream_id,
            payload: payload.into(),
        }
    }

    /// Reads one frame, rejecting frame types outside 0–9, lengths over
    /// `max_frame_size`, and DATA/HEADERS on stream 0 (spec §4.3).
    pub async fn read_from(
        io: &mut (impl AsyncRead + Unpin),
        max_frame_size: u32,
    ) -> Result<Self> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        io.read_exact(&mut header).await?;
        let length = u32::from_be_bytes([0, header[0], header[1], header[2]]);
        if length > max_frame_size {
            return Err(Error::Protocol(format!(
                "frame length {length} exceeds max_frame_size {max_frame_size}"
            )));
        }
        let ty = WireType::from_u8(header[3])
            .ok_or_else(|| Error::Protocol(format!("unknown frame type {}", header[3])))?;
        let flags = header[4];
        let stream_id = u32::from_be_bytes([header[5], header[6], header[7], header[8]]) & 0x7fff_ffff;
        if stream_id == 0 && matches!(ty, WireType::Data | WireType::Headers) {
            return Err(Error::Protocol(format!(
                "{ty:?} frame on stream 0 is a protocol error"
            )));
        }
        let mut payload = vec![0u8; length as usize];
        io.read_exact(&mut payload).await?;
        Ok(Self {
            ty,
            flags,
            stream_id,
            payload: Bytes::from(payload),
        })
    }

    pub async fn write_into(&self, io: &mut (impl AsyncWrite + Unpin)) -> Result<()> {
        let len = self.payload.len() as u32;
        let mut header = [0u8; FRAME_HEADER_LEN];
        header[0..3].copy_from_slice(&len.to_be_bytes()[1..]);
        header[3] = self.ty as u8;
        header[4] = self.flags;
        header[5..9].copy_from_slice(&(self.stream_id & 0x7fff_ffff).to_be_bytes());
        io.write_all(&header).await?;
        io.write_all(&self.payload).await?;
        Ok(())
    }
}

impl std::fmt::Debug for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Self::Data => "DATA",
            Self::Headers => "HEADERS",
            Self::Priority => "PRIORITY",
            Self::RstStream => "RST_STREAM",
            Self::Settings => "SETTINGS",
            Self::PushPromise => "PUSH_PROMISE",
            Self::Ping => "PING",
            Self::GoAway => "GOAWAY",
            Self::WindowUpdate => "WINDOW_UPDATE",
            Self::Continuation => "CONTINUATION",
        })
    }
}

pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_frame() {
        let frame = WireFrame::new(WireType::Data, flags::END_STREAM, 1, Bytes::from_static(b"hi"));
        let mut buf = Vec::new();
        frame.write_into(&mut buf).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let read = WireFrame::read_from(&mut cursor, 16_384).await.unwrap();
        assert_eq!(read.stream_id, 1);
        assert_eq!(read.flags, flags::END_STREAM);
        assert_eq!(&read.payload[..], b"hi");
    }

    #[tokio::test]
    async fn rejects_oversized_frame() {
        let frame = WireFrame::new(WireType::Data, 0, 1, Bytes::from(vec![0u8; 20]));
        let mut buf = Vec::new();
        frame.write_into(&mut buf).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let err = WireFrame::read_from(&mut cursor, 16).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn rejects_data_on_stream_zero() {
        let frame = WireFrame::new(WireType::Data, 0, 0, Bytes::from_static(b"x"));
        // Bypass the constructor's implicit stream id masking by writing raw bytes.
        let mut buf = Vec::new();
        frame.write_into(&mut buf).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let err = WireFrame::read_from(&mut cursor, 16_384).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_frame_type() {
        let mut buf = vec![0, 0, 0, 200, 0, 0, 0, 0, 1];
        let mut cursor = std::io::Cursor::new(std::mem::take(&mut buf));
        let err = WireFrame::read_from(&mut cursor, 16_384).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
