//! HPACK encoder (C3, spec §4.3).
//!
//! The encoder is permitted to omit dynamic-table insertion entirely,
//! emitting only indexed references into the static table plus
//! literal-without-indexing for anything else (spec §9: dynamic-table
//! population is declared but never populated, and the core profile may
//! omit it safely). Huffman is never used, matching spec §4.3's "if not
//! implemented the adapter MUST NOT set the Huffman bit on emitted
//! strings".

use super::{integer, static_table};
use crate::headers::Headers;
use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Default)]
pub struct Encoder;

impl Encoder {
    pub fn new() -> Self {
        Self
    }

    pub fn encode(&mut self, headers: &Headers) -> Bytes {
        let mut out = BytesMut::new();
        for (name, value) in headers.iter() {
            self.encode_one(&mut out, name, value);
        }
        out.freeze()
    }

    fn encode_one(&mut self, out: &mut BytesMut, name: &str, value: &str) {
        if let Some(index) = static_table::find_exact(name, value) {
            // Indexed Header Field — RFC 7541 §6.1, 7-bit prefix, top bit set.
            integer::encode(out, 7, 0x80, index);
            return;
        }
        if let Some(index) = static_table::find_name(name) {
            // Literal Header Field without Indexing — Indexed Name,
            // RFC 7541 §6.2.2, 4-bit prefix, top nibble 0000.
            integer::encode(out, 4, 0x00, index);
            self.write_string(out, value);
            return;
        }
        // Literal Header Field without Indexing — New Name.
        out.put_u8(0x00);
        self.write_string(out, name);
        self.write_string(out, value);
    }

    /// RFC 7541 §5.2: H bit (never set here) + 7-bit length prefix + raw bytes.
    fn write_string(&self, out: &mut BytesMut, s: &str) {
        integer::encode(out, 7, 0x00, s.len());
        out.extend_from_slice(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_grpc_headers_use_static_hits_and_literal_path() {
        let mut headers = Headers::new();
        headers.push(":method", "POST");
        headers.push(":scheme", "https");
        headers.push(":path", "/Foo/Bar");
        headers.push("content-type", "application/grpc");
        headers.push("te", "trailers");

        let mut encoder = Encoder::new();
        let encoded = encoder.encode(&headers);

        // :method, :scheme, content-type, te are exact static hits: one byte
        // each with the high bit set.
        assert_eq!(encoded[0] & 0x80, 0x80);
        // cross-check against the real `hpack` crate's decoder is done in
        // tests/hpack.rs where the dev-dependency is available.
        assert!(!encoded.is_empty());
    }
}
