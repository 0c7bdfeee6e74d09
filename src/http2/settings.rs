//! SETTINGS frame payload and the connection-default values used until the
//! peer's SETTINGS arrives (spec §4.3). Grounded in the teacher's
//! `SettingsFrame`/`SettingsParameter` (`frame.rs`, `enums.rs`), generalized
//! to a plain struct instead of a `HashMap` keyed on a `FromPrimitive` enum.

use crate::error::Result;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: u32,
}

impl Default for Settings {
    /// Defaults used until the peer's SETTINGS frame is received (spec §4.3).
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: false,
            max_concurrent_streams: 100,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: 8192,
        }
    }
}

const HEADER_TABLE_SIZE: u16 = 0x1;
const ENABLE_PUSH: u16 = 0x2;
const MAX_CONCURRENT_STREAMS: u16 = 0x3;
const INITIAL_WINDOW_SIZE: u16 = 0x4;
const MAX_FRAME_SIZE: u16 = 0x5;
const MAX_HEADER_LIST_SIZE: u16 = 0x6;

impl Settings {
    /// Our outbound SETTINGS always disables server push (spec §4.3: "server
    /// push is refused").
    pub fn ours() -> Self {
        Self {
            enable_push: false,
            ..Default::default()
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(6 * 6);
        out.put_u16(HEADER_TABLE_SIZE);
        out.put_u32(self.header_table_size);
        out.put_u16(ENABLE_PUSH);
        out.put_u32(u32::from(self.enable_push));
        out.put_u16(MAX_CONCURRENT_STREAMS);
        out.put_u32(self.max_concurrent_streams);
        out.put_u16(INITIAL_WINDOW_SIZE);
        out.put_u32(self.initial_window_size);
        out.put_u16(MAX_FRAME_SIZE);
        out.put_u32(self.max_frame_size);
        out.put_u16(MAX_HEADER_LIST_SIZE);
        out.put_u32(self.max_header_list_size);
        out.freeze()
    }

    /// Applies recognized parameters on top of the current settings,
    /// ignoring unknown ones per spec (each DATA-bearing parameter overrides
    /// in place; unrecognized 2-byte ids are skipped, as RFC 7540 requires).
    pub fn apply_update(&mut self, payload: &[u8]) -> Result<()> {
        let mut buf = payload;
        while buf.len() >= 6 {
            let id = buf.get_u16();
            let value = buf.get_u32();
            match id {
                HEADER_TABLE_SIZE => self.header_table_size = value,
                ENABLE_PUSH => self.enable_push = value != 0,
                MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = value,
                INITIAL_WINDOW_SIZE => self.initial_window_size = value,
                MAX_FRAME_SIZE => self.max_frame_size = value,
                MAX_HEADER_LIST_SIZE => self.max_header_list_size = value,
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_apply() {
        let settings = Settings {
            header_table_size: 2048,
            enable_push: false,
            max_concurrent_streams: 50,
            initial_window_size: 32_768,
            max_frame_size: 32_768,
            max_header_list_size: 4096,
        };
        let encoded = settings.encode();
        let mut applied = Settings::default();
        applied.apply_update(&encoded).unwrap();
        assert_eq!(applied, settings);
    }

    #[test]
    fn ignores_unknown_parameter_ids() {
        let mut out = BytesMut::new();
        out.put_u16(0xfe);
        out.put_u32(123);
        out.put_u16(MAX_FRAME_SIZE);
        out.put_u32(20_000);
        let mut settings = Settings::default();
        settings.apply_update(&out).unwrap();
        assert_eq!(settings.max_frame_size, 20_000);
    }
}
