//! HTTP/3 adapter (C4, spec §4.4): RFC 9114 framing over opaque QUIC
//! streams, QPACK (static-table-only profile, RFC 9204), and RFC 9000 §16
//! VarInts. No example repo in the retrieval pack implements an HTTP/3
//! server end to end; this module is grounded on `examples/security-union-h3`
//! (frame/stream-type constants, control-stream discipline) and the HTTP/2
//! adapter in this crate for overall shape (`Transport`/`Listener`/
//! `Connection`/`Stream` split), adapted to QUIC's substrate owning framing
//! concerns HTTP/2 handles itself (flow control, stream admission).

mod connection;
mod frame;
mod listener;
mod qpack;
pub mod quic;
mod stream;
mod transport;
mod varint;

pub use connection::Http3Connection;
pub use listener::Http3Listener;
pub use transport::Http3Transport;
