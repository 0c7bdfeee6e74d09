//! Accepts raw TCP (or TLS) connections and promotes each into an
//! [`Http2Connection`] in server role (spec §4.1 "Listener").
//! Grounded in the teacher's `Socket::listen`/accept loop (`socket.rs`),
//! generalized to validate the client preface before handing the connection
//! off, and to build a multiplexed [`Http2Connection`] rather than a single
//! request/response pair.

use super::connection::{Http2Connection, Role};
use super::AsyncDuplex;
use crate::error::{Error, Result};
use crate::spi::{Connection, Listener};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub struct Http2Listener {
    inner: TcpListener,
    tls: Option<TlsAcceptor>,
}

impl std::fmt::Debug for Http2Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http2Listener")
            .field("local_addr", &self.inner.local_addr().ok())
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

impl Http2Listener {
    pub(super) fn new(inner: TcpListener, tls: Option<TlsAcceptor>) -> Self {
        Self { inner, tls }
    }
}

#[async_trait]
impl Listener for Http2Listener {
    async fn accept(&mut self) -> Result<Arc<dyn Connection>> {
        let (socket, _peer) = self.inner.accept().await?;
        socket.set_nodelay(true).ok();

        let io: Box<dyn AsyncDuplex> = match &self.tls {
            Some(acceptor) => {
                let stream = acceptor
                    .accept(socket)
                    .await
                    .map_err(|e| Error::Protocol(format!("TLS handshake failed: {e}")))?;
                Box::new(stream)
            }
            None => Box::new(socket),
        };

        Http2Connection::establish(io, Role::Server).await
    }

    async fn close(&mut self) {}
}
