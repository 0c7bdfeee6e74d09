//! Uniform frame model (C2, spec §3/§4.2).
//!
//! This is the language-neutral frame every [`crate::spi::Stream`] reads and
//! writes, independent of which wire adapter (HTTP/2, HTTP/3, mock) backs the
//! stream. Adapters translate their own wire frame types into this shape on
//! read and back out again on write.

use bitflags::bitflags;
use bytes::Bytes;

/// The frame kinds the core SPI moves across a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FrameType {
    Data,
    Headers,
    Status,
    Cancel,
    Ping,
    Metadata,
}

bitflags! {
    /// Named flag bits shared across adapters (spec §4.2).
    #[repr(transparent)]
    pub struct Flags: u8 {
        const END_STREAM  = 0x01;
        const END_HEADERS = 0x04;
        const ACK         = 0x01;
        const PADDED      = 0x08;
        const PRIORITY    = 0x20;
    }
}

/// A transient value produced by `readFrame` and consumed by `writeFrame`.
///
/// Ownership of `data` passes to the caller on read, and to the stream on
/// write (spec §3 "Frame").
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub flags: Flags,
    pub data: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, flags: Flags, data: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            flags,
            data: data.into(),
        }
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.contains(Flags::END_STREAM)
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags.contains(Flags::END_HEADERS)
    }

    /// Split this frame's payload into chunks no larger than `max_frame_size`,
    /// preserving END_STREAM only on the last chunk (spec §4.2).
    pub fn split_for_egress(self, max_frame_size: usize) -> Vec<Frame> {
        if self.data.len() <= max_frame_size || max_frame_size == 0 {
            return vec![self];
        }
        let end_stream = self.is_end_stream();
        let carry_flags = self.flags & !Flags::END_STREAM;
        let mut data = self.data;
        let mut out = Vec::new();
        while !data.is_empty() {
            let take = max_frame_size.min(data.len());
            let chunk = data.split_to(take);
            let is_last = data.is_empty();
            let mut flags = carry_flags;
            if is_last && end_stream {
                flags |= Flags::END_STREAM;
            }
            out.push(Frame::new(self.frame_type, flags, chunk));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_end_stream_only_on_last_chunk() {
        let frame = Frame::new(
            FrameType::Data,
            Flags::END_STREAM,
            Bytes::from(vec![0u8; 10]),
        );
        let parts = frame.split_for_egress(4);
        assert_eq!(parts.len(), 3);
        assert!(!parts[0].is_end_stream());
        assert!(!parts[1].is_end_stream());
        assert!(parts[2].is_end_stream());
        assert_eq!(
            parts[0].data.len() + parts[1].data.len() + parts[2].data.len(),
            10
        );
    }

    #[test]
    fn split_noop_when_under_limit() {
        let frame = Frame::new(FrameType::Data, Flags::empty(), Bytes::from_static(b"hi"));
        let parts = frame.split_for_egress(16_384);
        assert_eq!(parts.len(), 1);
    }
}
