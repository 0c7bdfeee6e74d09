//! Transport Service-Provider Interface (C1, spec §3/§4.1).
//!
//! `Transport` → `Listener`/`Connection` → `Stream` is the capability set
//! every wire adapter (HTTP/2, HTTP/3, the in-memory mock used by tests)
//! implements identically, so server and client code (C6/C7) is generic
//! over it and never depends on a native wire error or byte layout.
//! Grounded in the teacher's `Connection`/`Socket`/`Stream` split
//! (`connection.rs`, `socket.rs`, `stream.rs`), generalized from a single
//! concrete HTTP/2-over-rustls pair into trait objects per the
//! `TransportProtocol`/`Connection` pattern used by the pack's transport
//! abstraction examples.

use crate::error::Result;
use crate::frame::{Flags, Frame, FrameType};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// TLS configuration the embedder hands in. The core never implements a
/// handshake itself (spec §1 lists "concrete TLS implementation" as an
/// external collaborator) — these are thin wrappers around `rustls`
/// configs that an adapter plumbs straight into `tokio-rustls`, the same
/// library the teacher crate already depends on for its client connector.
#[derive(Clone)]
pub struct ClientTlsConfig {
    pub rustls_config: Arc<tokio_rustls::rustls::ClientConfig>,
    pub server_name: String,
}

#[derive(Clone)]
pub struct ServerTlsConfig {
    pub rustls_config: Arc<tokio_rustls::rustls::ServerConfig>,
}

/// `connect`/`listen` capability set (spec §4.1).
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn connect(
        &self,
        endpoint: &str,
        tls: Option<ClientTlsConfig>,
    ) -> Result<Arc<dyn Connection>>;
    async fn listen(
        &self,
        bind_address: &str,
        tls: Option<ServerTlsConfig>,
    ) -> Result<Box<dyn Listener>>;
}

/// `openStream`/`close`/`ping`/`isConnected` capability set (spec §4.1),
/// plus `accept_stream` — the server-side complement spec §4.6's
/// "per-connection handling ... reads streams as they arrive via the
/// adapter's multiplexing" requires but spec §4.1's prose leaves implicit.
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    async fn open_stream(&self) -> Result<Box<dyn Stream>>;
    /// Surfaces the next stream the peer opened. Returns `Ok(None)` once the
    /// connection is drained and will yield no more streams.
    async fn accept_stream(&self) -> Result<Option<Box<dyn Stream>>>;
    async fn close(&self);
    async fn ping(&self) -> Result<()>;
    async fn is_connected(&self) -> bool;
    /// Begin graceful shutdown: refuse new streams, let existing ones run
    /// to completion (spec §4.6 "Graceful shutdown"). Adapters map this to
    /// GOAWAY (HTTP/2) or GOAWAY-on-control-stream (HTTP/3).
    async fn go_away(&self);
}

/// `writeFrame`/`readFrame`/`close`/`cancel` capability set (spec §4.1).
#[async_trait]
pub trait Stream: Send + Debug {
    async fn write_frame(&mut self, frame_type: FrameType, flags: Flags, data: bytes::Bytes) -> Result<()>;
    /// Blocks until a frame arrives or the stream ends/resets. Returns
    /// `Ok(None)` once the peer has cleanly ended the stream with no more
    /// frames to deliver.
    async fn read_frame(&mut self) -> Result<Option<Frame>>;
    async fn close(&mut self) -> Result<()>;
    /// Maps to RST_STREAM (HTTP/2) or STOP_SENDING+RESET_STREAM (HTTP/3/QUIC).
    async fn cancel(&mut self);
    fn stream_id(&self) -> u64;
}

/// `accept`/`close` capability set (spec §4.1).
#[async_trait]
pub trait Listener: Send + Debug {
    /// Fails with `Error::Timeout` (liveness tick, caller should retry) or
    /// `Error::Closed` (shutdown, caller should stop looping).
    async fn accept(&mut self) -> Result<Arc<dyn Connection>>;
    async fn close(&mut self);
}
