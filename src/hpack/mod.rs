//! HPACK header compression, scoped to the gRPC header subset (C3, spec §4.3).

mod decoder;
mod encoder;
mod integer;
mod static_table;

pub use decoder::Decoder;
pub use encoder::Encoder;
