//! The opaque QUIC substrate the HTTP/3 adapter runs over (spec §4.4
//! "Underlying substrate" / spec §1 "the underlying QUIC datagram layer
//! (consumed as an opaque stream provider)"). The core never parses QUIC
//! packets; it only ever calls `createStream`/`read`/`write`/`finish`/
//! `reset` through this trait, exactly as spec §4.4 names them, and trusts
//! the substrate to have already done ALPN negotiation ("h3").
//!
//! No concrete QUIC implementation ships in this crate — same posture as
//! [`crate::spi::ClientTlsConfig`]/[`crate::spi::ServerTlsConfig`] for TLS:
//! the embedder supplies a real provider (e.g. backed by `quinn` or
//! `s2n-quic`), and this module only plumbs through it.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// One QUIC stream, bidirectional or the send/receive half of a
/// unidirectional pair.
#[async_trait]
pub trait QuicStream: Send + Debug {
    /// Reads into `buf`, returning the number of bytes read, or 0 at the
    /// peer's FIN/stream end.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    async fn write(&mut self, data: &[u8]) -> Result<()>;
    /// Signals no more data will be written (QUIC FIN).
    async fn finish(&mut self) -> Result<()>;
    /// Abruptly terminates the stream with an application error code.
    async fn reset(&mut self, error_code: u64);
}

/// One QUIC connection: creates streams and accepts peer-initiated ones.
#[async_trait]
pub trait QuicConnectionProvider: Send + Sync + Debug {
    async fn open_bi_stream(&self) -> Result<Box<dyn QuicStream>>;
    async fn accept_bi_stream(&self) -> Result<Option<Box<dyn QuicStream>>>;
    async fn open_uni_stream(&self) -> Result<Box<dyn QuicStream>>;
    async fn accept_uni_stream(&self) -> Result<Option<Box<dyn QuicStream>>>;
    async fn close(&self, error_code: u64);
    async fn is_connected(&self) -> bool;
}

/// The top-level substrate: dials or binds a QUIC endpoint with "h3" ALPN
/// already negotiated by the time a connection is handed back.
#[async_trait]
pub trait QuicProvider: Send + Sync + Debug {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn QuicConnectionProvider>>;
    async fn listen(&self, bind_address: &str) -> Result<Box<dyn QuicListenerProvider>>;
}

#[async_trait]
pub trait QuicListenerProvider: Send + Debug {
    async fn accept(&mut self) -> Result<Arc<dyn QuicConnectionProvider>>;
    async fn close(&mut self);
}
