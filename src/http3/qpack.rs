//! QPACK, static-table-only profile (RFC 9204, spec §4.4).
//!
//! Every encoded field section starts with a two-VarInt prefix (Required
//! Insert Count, Delta Base); both are always 0 here because the dynamic
//! table is never populated, so no stream can ever be QPACK-blocked. Reuses
//! the HPACK static table (the gRPC canonical header set, spec §4.3) and its
//! RFC 7541 §5.1 prefix-integer codec, since QPACK's own indexed field line
//! uses the identical variable-prefix-width integer shape, just with a 6-bit
//! prefix and different marker bits.

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::hpack::{integer, static_table};
use bytes::{BufMut, Bytes, BytesMut};

const INDEXED_STATIC_MARKER: u8 = 0xC0; // '11' + S=1
const LITERAL_MARKER: u8 = 0x50; // spec-defined fixed literal-line marker

pub fn encode(headers: &Headers) -> Bytes {
    let mut out = BytesMut::new();
    super::varint::encode(&mut out, 0); // Required Insert Count
    super::varint::encode(&mut out, 0); // Delta Base (sign+value folded to 0)
    for (name, value) in headers.iter() {
        if let Some(index) = static_table::find_exact(name, value) {
            integer::encode(&mut out, 6, INDEXED_STATIC_MARKER, index);
        } else {
            out.put_u8(LITERAL_MARKER);
            super::varint::encode(&mut out, name.len() as u64);
            out.extend_from_slice(name.as_bytes());
            super::varint::encode(&mut out, value.len() as u64);
            out.extend_from_slice(value.as_bytes());
        }
    }
    out.freeze()
}

pub fn decode(data: &[u8]) -> Result<Headers> {
    let mut pos = 0;
    let (_required_insert_count, used) = super::varint::decode(data)?;
    pos += used;
    let (_delta_base, used) = super::varint::decode(&data[pos..])?;
    pos += used;

    let mut headers = Headers::new();
    while pos < data.len() {
        let byte = data[pos];
        if byte & 0xC0 == 0xC0 {
            let (index, used) = integer::decode(&data[pos..], 6)
                .ok_or_else(|| Error::Protocol("truncated QPACK indexed field line".into()))?;
            pos += used;
            let entry = static_table::get(index)
                .ok_or_else(|| Error::Protocol(format!("QPACK static index {index} out of range")))?;
            headers.push(entry.name, entry.value);
        } else if byte == LITERAL_MARKER {
            pos += 1;
            let (name_len, used) = super::varint::decode(&data[pos..])?;
            pos += used;
            let name = read_str(data, &mut pos, name_len as usize)?;
            let (value_len, used) = super::varint::decode(&data[pos..])?;
            pos += used;
            let value = read_str(data, &mut pos, value_len as usize)?;
            headers.push(name, value);
        } else {
            return Err(Error::Protocol(format!(
                "unsupported QPACK field line marker 0x{byte:02x}"
            )));
        }
    }
    Ok(headers)
}

fn read_str(data: &[u8], pos: &mut usize, len: usize) -> Result<String> {
    let bytes = data
        .get(*pos..*pos + len)
        .ok_or_else(|| Error::Protocol("truncated QPACK literal".into()))?;
    *pos += len;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::Protocol("QPACK literal is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_hit_round_trips_canonical_headers() {
        let mut headers = Headers::new();
        headers.push(":method", "POST");
        headers.push(":scheme", "https");
        headers.push("content-type", "application/grpc");
        let encoded = encode(&headers);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn literal_line_round_trips_an_uncommon_header() {
        let mut headers = Headers::new();
        headers.push(":path", "/my.Service/Method");
        headers.push("x-request-id", "abc-123");
        let encoded = encode(&headers);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn prefix_is_always_zero_required_insert_count_and_delta_base() {
        let encoded = encode(&Headers::new());
        assert_eq!(&encoded[..2], &[0, 0]);
    }
}
