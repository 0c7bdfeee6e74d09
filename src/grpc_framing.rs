//! gRPC message framing (C5, spec §4.5, §6).
//!
//! Every logical RPC payload is a sequence of length-prefixed messages:
//! `compressed:1 byte + length:4-byte big-endian + body:length bytes`.
//! Messages flow inside DATA frames; a single DATA frame may carry exactly
//! one message, a fragment, or several back to back, so the receiver
//! reassembles message boundaries independently of frame boundaries.

use bytes::{Buf, BufMut, Bytes, BytesMut};

const PREFIX_LEN: usize = 5;

/// Encode one message with the 5-byte gRPC prefix.
pub fn encode_message(compressed: bool, body: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(PREFIX_LEN + body.len());
    out.put_u8(u8::from(compressed));
    out.put_u32(body.len() as u32);
    out.extend_from_slice(body);
    out.freeze()
}

/// Decode exactly one prefixed message from the front of `data`, which must
/// contain at least one complete message. Returns `(compressed, body)`.
pub fn decode_message(data: &[u8]) -> Option<(bool, &[u8])> {
    if data.len() < PREFIX_LEN {
        return None;
    }
    let compressed = data[0] != 0;
    let len = u32::from_be_bytes([data[1], data[2], data[3], data[4]]) as usize;
    if data.len() < PREFIX_LEN + len {
        return None;
    }
    Some((compressed, &data[PREFIX_LEN..PREFIX_LEN + len]))
}

/// Accumulates bytes from successive DATA frames and yields complete
/// gRPC-framed messages as they become available, reassembling message
/// boundaries across frame boundaries (spec §4.5).
#[derive(Debug, Default)]
pub struct MessageReassembler {
    buf: BytesMut,
}

impl MessageReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete message, if one has fully arrived.
    pub fn next_message(&mut self) -> Option<(bool, Bytes)> {
        if self.buf.len() < PREFIX_LEN {
            return None;
        }
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        if self.buf.len() < PREFIX_LEN + len {
            return None;
        }
        let compressed = self.buf[0] != 0;
        self.buf.advance(PREFIX_LEN);
        let body = self.buf.split_to(len).freeze();
        Some((compressed, body))
    }

    /// Drain all messages that have completely arrived.
    pub fn drain_complete(&mut self) -> Vec<(bool, Bytes)> {
        let mut out = Vec::new();
        while let Some(msg) = self.next_message() {
            out.push(msg);
        }
        out
    }

    pub fn has_pending_bytes(&self) -> bool {
        !self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_message() {
        let encoded = encode_message(false, b"hello");
        let (compressed, body) = decode_message(&encoded).unwrap();
        assert!(!compressed);
        assert_eq!(body, b"hello");
        assert_eq!(body.len(), 5);
    }

    #[test]
    fn reassembles_message_split_across_frames() {
        let encoded = encode_message(true, b"0123456789");
        let mut reassembler = MessageReassembler::new();
        reassembler.push(&encoded[0..3]);
        assert!(reassembler.next_message().is_none());
        reassembler.push(&encoded[3..]);
        let (compressed, body) = reassembler.next_message().unwrap();
        assert!(compressed);
        assert_eq!(&body[..], b"0123456789");
    }

    #[test]
    fn drains_multiple_messages_in_one_frame() {
        let mut frame = BytesMut::new();
        frame.extend_from_slice(&encode_message(false, b"a"));
        frame.extend_from_slice(&encode_message(false, b"bb"));
        let mut reassembler = MessageReassembler::new();
        reassembler.push(&frame);
        let msgs = reassembler.drain_complete();
        assert_eq!(msgs.len(), 2);
        assert_eq!(&msgs[0].1[..], b"a");
        assert_eq!(&msgs[1].1[..], b"bb");
        assert!(!reassembler.has_pending_bytes());
    }
}
