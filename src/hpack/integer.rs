//! RFC 7541 §5.1 integer representation.
//!
//! The teacher's original `hpack.rs` always used a 7-bit prefix for literal
//! name/value lengths regardless of representation; spec §9's Open
//! Questions flag that as a bug relative to RFC 7541 and direct
//! implementers to follow the RFC. This encodes/decodes against an
//! arbitrary prefix width so each representation can supply its own.

use bytes::{BufMut, BytesMut};

/// Encode `value` using an `n`-bit prefix (`n` in 1..=8), appending to `out`.
/// `prefix_bits_value` carries any representation-specific high bits that
/// share the first byte with the prefix (already shifted into place); pass 0
/// if the representation has no such bits.
pub fn encode(out: &mut BytesMut, n: u8, prefix_bits_value: u8, mut value: usize) {
    let max_prefix = (1usize << n) - 1;
    if value < max_prefix {
        out.put_u8(prefix_bits_value | value as u8);
        return;
    }
    out.put_u8(prefix_bits_value | max_prefix as u8);
    value -= max_prefix;
    while value >= 128 {
        out.put_u8(((value % 128) | 0x80) as u8);
        value /= 128;
    }
    out.put_u8(value as u8);
}

/// Decode an integer with an `n`-bit prefix starting at `data[0]`. Returns
/// `(value, bytes_consumed)`.
pub fn decode(data: &[u8], n: u8) -> Option<(usize, usize)> {
    if data.is_empty() {
        return None;
    }
    let max_prefix = (1usize << n) - 1;
    let prefix = (data[0] as usize) & max_prefix;
    if prefix < max_prefix {
        return Some((prefix, 1));
    }
    let mut value = max_prefix;
    let mut m = 0u32;
    let mut consumed = 1;
    loop {
        let byte = *data.get(consumed)?;
        consumed += 1;
        value += ((byte & 0x7f) as usize) << m;
        m += 7;
        if byte & 0x80 == 0 {
            break;
        }
        if consumed > 1 + 10 {
            // guards against pathological/overlong encodings
            return None;
        }
    }
    Some((value, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_from_rfc_10_fits_in_prefix() {
        let mut out = BytesMut::new();
        encode(&mut out, 5, 0, 10);
        assert_eq!(&out[..], &[0b0000_1010]);
        assert_eq!(decode(&out, 5), Some((10, 1)));
    }

    #[test]
    fn example_from_rfc_1337_needs_continuation() {
        let mut out = BytesMut::new();
        encode(&mut out, 5, 0, 1337);
        assert_eq!(&out[..], &[0b0001_1111, 0b1001_1010, 0b0000_1010]);
        assert_eq!(decode(&out, 5), Some((1337, 3)));
    }

    #[test]
    fn round_trip_boundary_values() {
        for n in 1..=8u8 {
            for value in [0usize, (1 << n) - 2, (1 << n) - 1, (1 << n), 16_383, 1_000_000] {
                let mut out = BytesMut::new();
                encode(&mut out, n, 0, value);
                let (decoded, consumed) = decode(&out, n).unwrap();
                assert_eq!(decoded, value, "n={n} value={value}");
                assert_eq!(consumed, out.len());
            }
        }
    }
}
