//! HTTP/3 frame format (RFC 9114 §7.2, spec §4.4): `type:VarInt,
//! length:VarInt, payload`. Unknown frame types on request streams are
//! ignored rather than errored, per RFC 9114. Grounded on the frame-type
//! constants and control-stream handling in `examples/security-union-h3`'s
//! h3 crate source, reimplemented over this crate's own VarInt codec rather
//! than that crate's `bytes`-based reader.

use super::varint;
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};

pub const FRAME_DATA: u64 = 0x00;
pub const FRAME_HEADERS: u64 = 0x01;
pub const FRAME_SETTINGS: u64 = 0x04;
pub const FRAME_GOAWAY: u64 = 0x07;
pub const FRAME_MAX_PUSH_ID: u64 = 0x0d;

/// The unidirectional stream-type VarInt identifying a control stream
/// (spec §4.4 "Control streams").
pub const STREAM_TYPE_CONTROL: u64 = 0x00;

#[derive(Debug, Clone)]
pub struct H3Frame {
    pub frame_type: u64,
    pub payload: Bytes,
}

impl H3Frame {
    pub fn new(frame_type: u64, payload: impl Into<Bytes>) -> Self {
        Self { frame_type, payload: payload.into() }
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::new();
        varint::encode(&mut out, self.frame_type);
        varint::encode(&mut out, self.payload.len() as u64);
        out.extend_from_slice(&self.payload);
        out.freeze()
    }

    /// Decodes one frame from the front of `data`, returning the frame and
    /// the number of bytes consumed. Returns `Ok(None)` if `data` doesn't yet
    /// contain a complete frame (caller should read more and retry).
    pub fn try_decode(data: &[u8]) -> Result<Option<(Self, usize)>> {
        let (frame_type, used_type) = match varint::decode(data) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        let rest = &data[used_type..];
        let (len, used_len) = match varint::decode(rest) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        let header_len = used_type + used_len;
        let total = header_len + len as usize;
        if data.len() < total {
            return Ok(None);
        }
        let payload = Bytes::copy_from_slice(&data[header_len..total]);
        Ok(Some((Self { frame_type, payload }, total)))
    }
}

/// Parses the fixed-format SETTINGS frame payload: a flat sequence of
/// `(id:VarInt, value:VarInt)` pairs. The core never sends or needs any
/// particular setting beyond the exchange itself; unknown ids are ignored
/// per RFC 9114 §7.2.4.
pub fn parse_settings_payload(payload: &[u8]) -> Result<Vec<(u64, u64)>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < payload.len() {
        let (id, used) = varint::decode(&payload[pos..])?;
        pos += used;
        let (value, used) = varint::decode(&payload[pos..])?;
        pos += used;
        out.push((id, value));
    }
    Ok(out)
}

pub fn encode_settings_payload(settings: &[(u64, u64)]) -> Bytes {
    let mut out = BytesMut::new();
    for &(id, value) in settings {
        varint::encode(&mut out, id);
        varint::encode(&mut out, value);
    }
    out.freeze()
}

/// Validates that the first frame read from a freshly-opened control stream
/// is SETTINGS (spec §4.4 "SETTINGS MUST be the first frame").
pub fn require_settings_first(frame: &H3Frame) -> Result<()> {
    if frame.frame_type != FRAME_SETTINGS {
        return Err(Error::Protocol(
            "control stream's first frame must be SETTINGS".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_headers_frame() {
        let frame = H3Frame::new(FRAME_HEADERS, Bytes::from_static(b"qpack-bytes"));
        let encoded = frame.encode();
        let (decoded, consumed) = H3Frame::try_decode(&encoded).unwrap().unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.frame_type, FRAME_HEADERS);
        assert_eq!(&decoded.payload[..], b"qpack-bytes");
    }

    #[test]
    fn incomplete_frame_requests_more_bytes() {
        let frame = H3Frame::new(FRAME_DATA, Bytes::from_static(b"0123456789"));
        let encoded = frame.encode();
        let short = &encoded[..encoded.len() - 1];
        assert!(H3Frame::try_decode(short).unwrap().is_none());
    }

    #[test]
    fn settings_payload_round_trips() {
        let settings = vec![(0x06, 100), (0x08, 0)];
        let payload = encode_settings_payload(&settings);
        assert_eq!(parse_settings_payload(&payload).unwrap(), settings);
    }

    #[test]
    fn rejects_non_settings_first_frame() {
        let frame = H3Frame::new(FRAME_DATA, Bytes::new());
        assert!(require_settings_first(&frame).is_err());
    }
}
