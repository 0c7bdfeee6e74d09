//! QUIC variable-length integer encoding (RFC 9000 §16), used by every
//! HTTP/3 frame header and by QPACK's prefix integers (spec §4.4).
//!
//! The top two bits of the first byte select one of four length classes
//! (1/2/4/8 bytes), leaving 6/14/30/62 usable value bits respectively. No
//! direct analog exists in the teacher crate (HTTP/2 frame lengths are a
//! fixed 24-bit field); grounded on the QUIC varint routines in
//! `examples/other_examples` (s2n-quic / quinn-style varint modules).

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

pub const MAX_1_BYTE: u64 = (1 << 6) - 1;
pub const MAX_2_BYTE: u64 = (1 << 14) - 1;
pub const MAX_4_BYTE: u64 = (1 << 30) - 1;
pub const MAX_8_BYTE: u64 = (1 << 62) - 1;

pub fn encode(out: &mut BytesMut, value: u64) {
    if value <= MAX_1_BYTE {
        out.put_u8(value as u8);
    } else if value <= MAX_2_BYTE {
        out.put_u16(0b01 << 14 | value as u16);
    } else if value <= MAX_4_BYTE {
        out.put_u32(0b10 << 30 | value as u32);
    } else if value <= MAX_8_BYTE {
        out.put_u64(0b11u64 << 62 | value);
    } else {
        unreachable!("VarInt values are bounded to 62 bits by construction");
    }
}

pub fn encoded(value: u64) -> Bytes {
    let mut out = BytesMut::new();
    encode(&mut out, value);
    out.freeze()
}

/// Returns `(value, bytes_consumed)`.
pub fn decode(data: &[u8]) -> Result<(u64, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| Error::Protocol("truncated VarInt".into()))?;
    let len = 1usize << (first >> 6);
    if data.len() < len {
        return Err(Error::Protocol("truncated VarInt".into()));
    }
    let mut value = u64::from(first & 0x3f);
    for &byte in &data[1..len] {
        value = (value << 8) | u64::from(byte);
    }
    Ok((value, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_four_length_classes() {
        for &value in &[0u64, 37, MAX_1_BYTE, MAX_1_BYTE + 1, MAX_2_BYTE, MAX_2_BYTE + 1, MAX_4_BYTE, MAX_4_BYTE + 1, MAX_8_BYTE] {
            let mut buf = BytesMut::new();
            encode(&mut buf, value);
            let (decoded, consumed) = decode(&buf).unwrap();
            assert_eq!(decoded, value, "value={value}");
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn uses_the_smallest_length_class_that_fits() {
        assert_eq!(encoded(37).len(), 1);
        assert_eq!(encoded(MAX_1_BYTE + 1).len(), 2);
        assert_eq!(encoded(MAX_2_BYTE + 1).len(), 4);
        assert_eq!(encoded(MAX_4_BYTE + 1).len(), 8);
    }

    #[test]
    fn rejects_truncated_input() {
        let mut buf = BytesMut::new();
        encode(&mut buf, MAX_2_BYTE + 1);
        let short = &buf[..1];
        assert!(decode(short).is_err());
    }
}
