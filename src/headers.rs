//! Header representation shared by HPACK/QPACK and the server/client
//! contexts (spec §3 "RequestContext/ResponseContext" — "a key→value
//! mapping of headers").

/// An ordered, possibly-repeating header list. Kept as a `Vec` rather than
/// a `HashMap` so encode order is deterministic (useful for the HPACK
/// static-hit test in spec §8 scenario 6) and repeated header names are
/// preserved, matching HTTP/2's header-list semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Headers {
    /// Canonical adapter-agnostic encoding used as the payload of a C2
    /// `FrameType::Headers` frame: each pair as
    /// `u32 name_len | name | u32 value_len | value`, big-endian lengths.
    /// Adapters decode their wire compression (HPACK/QPACK) into `Headers`
    /// and re-encode to this shape before handing frames to the SPI, so C6/
    /// C7 never depend on which compression scheme produced them.
    pub fn to_wire_bytes(&self) -> bytes::Bytes {
        use bytes::BufMut;
        let mut out = bytes::BytesMut::new();
        for (name, value) in &self.0 {
            out.put_u32(name.len() as u32);
            out.extend_from_slice(name.as_bytes());
            out.put_u32(value.len() as u32);
            out.extend_from_slice(value.as_bytes());
        }
        out.freeze()
    }

    pub fn from_wire_bytes(data: &[u8]) -> crate::error::Result<Self> {
        use crate::error::Error;
        let mut pairs = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let name_len = read_u32(data, &mut pos)?;
            let name = read_str(data, &mut pos, name_len)?;
            let value_len = read_u32(data, &mut pos)?;
            let value = read_str(data, &mut pos, value_len)?;
            pairs.push((name, value));
        }
        return Ok(Self(pairs));

        fn read_u32(data: &[u8], pos: &mut usize) -> crate::error::Result<usize> {
            let bytes = data
                .get(*pos..*pos + 4)
                .ok_or_else(|| Error::Protocol("truncated header wire length".into()))?;
            *pos += 4;
            Ok(u32::from_be_bytes(bytes.try_into().unwrap()) as usize)
        }

        fn read_str(data: &[u8], pos: &mut usize, len: usize) -> crate::error::Result<String> {
            let bytes = data
                .get(*pos..*pos + len)
                .ok_or_else(|| Error::Protocol("truncated header wire field".into()))?;
            *pos += len;
            String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::Protocol("header wire field is not valid UTF-8".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let mut headers = Headers::new();
        headers.push(":path", "/Foo/Bar");
        headers.push("grpc-status", "0");
        let bytes = headers.to_wire_bytes();
        let decoded = Headers::from_wire_bytes(&bytes).unwrap();
        assert_eq!(decoded, headers);
    }
}
