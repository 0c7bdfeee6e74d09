//! HPACK decoder (C3, spec §4.3).
//!
//! Must accept all three representations used by a compliant encoder —
//! indexed, literal-with-incremental-indexing, and literal-without-indexing
//! — each possibly referencing the static table by name only, even though
//! this crate's own [`super::encoder::Encoder`] only ever emits indexed and
//! literal-without-indexing forms (spec §4.3).

use super::static_table;
use crate::error::{Error, Result};
use crate::headers::Headers;

pub struct Decoder;

impl Decoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&mut self, data: &[u8]) -> Result<Headers> {
        let mut headers = Headers::new();
        let mut pos = 0;
        while pos < data.len() {
            let byte = data[pos];
            if byte & 0x80 != 0 {
                // Indexed Header Field — RFC 7541 §6.1.
                let (index, used) = super::integer::decode(&data[pos..], 7)
                    .ok_or_else(|| Error::Protocol("truncated HPACK indexed field".into()))?;
                pos += used;
                if index == 0 {
                    return Err(Error::Protocol("HPACK index 0 is invalid".into()));
                }
                let entry = static_table::get(index)
                    .ok_or_else(|| Error::Protocol(format!("HPACK index {index} out of range")))?;
                if entry.value.is_empty() {
                    return Err(Error::Protocol(format!(
                        "HPACK index {index} has no fixed value to index"
                    )));
                }
                headers.push(entry.name, entry.value);
            } else if byte & 0xC0 == 0x40 {
                // Literal Header Field with Incremental Indexing — §6.2.1.
                pos += self.decode_literal(data, pos, 6, &mut headers)?;
            } else if byte & 0xE0 == 0x20 {
                // Dynamic Table Size Update — §6.3. No dynamic table in the
                // core profile (spec §9), so just consume and ignore.
                let (_, used) = super::integer::decode(&data[pos..], 5)
                    .ok_or_else(|| Error::Protocol("truncated HPACK size update".into()))?;
                pos += used;
            } else {
                // Literal Header Field without Indexing (§6.2.2, 0000xxxx)
                // or Never Indexed (§6.2.3, 0001xxxx) — identical decode shape.
                pos += self.decode_literal(data, pos, 4, &mut headers)?;
            }
        }
        Ok(headers)
    }

    fn decode_literal(
        &self,
        data: &[u8],
        pos: usize,
        prefix_bits: u8,
        headers: &mut Headers,
    ) -> Result<usize> {
        let (index, mut used) = super::integer::decode(&data[pos..], prefix_bits)
            .ok_or_else(|| Error::Protocol("truncated HPACK literal field".into()))?;
        let name = if index == 0 {
            let (name, n) = self.read_string(&data[pos + used..])?;
            used += n;
            name
        } else {
            static_table::get(index)
                .ok_or_else(|| Error::Protocol(format!("HPACK index {index} out of range")))?
                .name
                .to_string()
        };
        let (value, n) = self.read_string(&data[pos + used..])?;
        used += n;
        headers.push(name, value);
        Ok(used)
    }

    /// RFC 7541 §5.2 string literal: H bit + 7-bit length prefix + bytes.
    /// Huffman (H=1) is not implemented (spec §4.3 makes it optional).
    fn read_string(&self, data: &[u8]) -> Result<(String, usize)> {
        if data.is_empty() {
            return Err(Error::Protocol("truncated HPACK string".into()));
        }
        let huffman = data[0] & 0x80 != 0;
        if huffman {
            return Err(Error::Protocol(
                "HPACK Huffman-encoded strings are not supported".into(),
            ));
        }
        let (len, used) = super::integer::decode(data, 7)
            .ok_or_else(|| Error::Protocol("truncated HPACK string length".into()))?;
        let end = used + len;
        let bytes = data
            .get(used..end)
            .ok_or_else(|| Error::Protocol("truncated HPACK string body".into()))?;
        let s = String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::Protocol("HPACK string is not valid UTF-8".into()))?;
        Ok((s, end))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::encoder::Encoder;
    use super::*;

    #[test]
    fn round_trips_canonical_grpc_headers() {
        let mut headers = Headers::new();
        headers.push(":method", "POST");
        headers.push(":scheme", "https");
        headers.push(":path", "/Foo/Bar");
        headers.push(":authority", "example.com");
        headers.push("content-type", "application/grpc");
        headers.push("grpc-encoding", "identity");
        headers.push("te", "trailers");

        let encoded = Encoder::new().encode(&headers);
        let decoded = Decoder::new().decode(&encoded).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn rejects_indexed_field_at_index_zero() {
        let mut decoder = Decoder::new();
        // 0x80 is an indexed field with 7-bit-prefix value 0.
        let err = decoder.decode(&[0x80]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
