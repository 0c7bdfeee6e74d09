//! Server configuration (spec §6 "Configuration", §4.6).

use crate::spi::ServerTlsConfig;

/// Everything `RpcServer::init` needs. No environment variables or file
/// formats are parsed here (spec §6: "those belong to the CLI collaborator").
#[derive(Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub tls_config: Option<ServerTlsConfig>,
    pub max_concurrent_connections: usize,
    /// Secondary, server-owned admission gate on top of whatever the
    /// adapter's own SETTINGS/QUIC substrate enforces (spec §4.6
    /// "Per-connection handling" reads this as the ceiling on concurrently
    /// running per-stream handler tasks for one connection).
    pub max_concurrent_streams_per_connection: usize,
    /// Deadline installed on a `RequestContext` when the request carries no
    /// `grpc-timeout` header (spec §4.6 "Deadline propagation").
    pub request_timeout_ms: Option<u64>,
    pub rate_limiter_burst: Option<u32>,
    pub rate_limiter_rate: Option<f64>,
}

impl ServerConfig {
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            tls_config: None,
            max_concurrent_connections: 1024,
            max_concurrent_streams_per_connection: 100,
            request_timeout_ms: None,
            rate_limiter_burst: None,
            rate_limiter_rate: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_address", &self.bind_address)
            .field("tls_config", &self.tls_config.is_some())
            .field("max_concurrent_connections", &self.max_concurrent_connections)
            .field(
                "max_concurrent_streams_per_connection",
                &self.max_concurrent_streams_per_connection,
            )
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("rate_limiter_burst", &self.rate_limiter_burst)
            .field("rate_limiter_rate", &self.rate_limiter_rate)
            .finish()
    }
}
