//! HTTP/2 adapter (C3, spec §4.3): RFC 7540 framing, HPACK, stream state
//! machine, and connection+stream flow control, wired to the transport SPI
//! (C1). Grounded in the teacher crate's `frame.rs`/`stream.rs`/
//! `connection.rs`/`socket.rs`/`client.rs`, generalized from a single
//! concrete client-over-TCP-plus-rustls pipeline into a generic adapter
//! usable by both the server (accepting streams) and the client (opening
//! them).

mod connection;
mod flow_control;
mod listener;
mod settings;
mod state_machine;
mod stream;
mod transport;
mod wire;

pub use connection::Http2Connection;
pub use listener::Http2Listener;
pub use settings::Settings;
pub use transport::Http2Transport;

use tokio::io::{AsyncRead, AsyncWrite};

/// Any duplex byte stream an HTTP/2 connection can run over — a bare TCP
/// socket, or one wrapped in `tokio-rustls`. Boxing behind this trait lets
/// [`Http2Connection`] stay a single concrete type regardless of which
/// transport produced the stream.
pub trait AsyncDuplex: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncDuplex for T {}
