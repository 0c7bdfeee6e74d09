//! [`Transport`] implementation over an injected opaque QUIC provider (spec
//! §4.4 "Underlying substrate"). Unlike the HTTP/2 adapter, TLS is not
//! plumbed through here: QUIC requires TLS 1.3 for its handshake and ALPN
//! ("h3") negotiation, so the substrate is expected to already be
//! TLS-configured when it's constructed — the `tls` parameter accepted here
//! only exists to satisfy the shared [`Transport`] signature and is ignored.

use super::connection::{Http3Connection, Role};
use super::quic::QuicProvider;
use crate::error::Result;
use crate::spi::{ClientTlsConfig, Connection, Listener, ServerTlsConfig, Transport};
use async_trait::async_trait;
use std::sync::Arc;

pub struct Http3Transport {
    quic: Arc<dyn QuicProvider>,
}

impl std::fmt::Debug for Http3Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http3Transport").finish()
    }
}

impl Http3Transport {
    pub fn new(quic: Arc<dyn QuicProvider>) -> Self {
        Self { quic }
    }
}

#[async_trait]
impl Transport for Http3Transport {
    async fn connect(&self, endpoint: &str, tls: Option<ClientTlsConfig>) -> Result<Arc<dyn Connection>> {
        if tls.is_some() {
            log::debug!("Http3Transport ignores ClientTlsConfig; the QUIC provider owns TLS");
        }
        let quic_conn = self.quic.connect(endpoint).await?;
        Http3Connection::establish(quic_conn, Role::Client).await
    }

    async fn listen(&self, bind_address: &str, tls: Option<ServerTlsConfig>) -> Result<Box<dyn Listener>> {
        if tls.is_some() {
            log::debug!("Http3Transport ignores ServerTlsConfig; the QUIC provider owns TLS");
        }
        let listener = self.quic.listen(bind_address).await?;
        Ok(Box::new(super::listener::Http3Listener::new(listener)))
    }
}
