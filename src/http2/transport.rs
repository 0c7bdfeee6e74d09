//! [`Transport`] implementation that dials/binds plain TCP sockets,
//! optionally wrapped in TLS via `tokio-rustls` (spec §4.1, §4.3).
//! Grounded in the teacher's `Client::connect` (`client.rs`) and its
//! `webpki`-backed connector setup, generalized to also accept a listener
//! side and an adapter-supplied TLS config rather than a single hardcoded
//! `TlsConnector`.

use super::connection::{Http2Connection, Role};
use super::listener::Http2Listener;
use super::AsyncDuplex;
use crate::error::{Error, Result};
use crate::spi::{ClientTlsConfig, Connection, Listener, ServerTlsConfig, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::rustls::ServerName;
use tokio_rustls::{TlsAcceptor, TlsConnector};

#[derive(Debug, Default)]
pub struct Http2Transport;

impl Http2Transport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for Http2Transport {
    async fn connect(&self, endpoint: &str, tls: Option<ClientTlsConfig>) -> Result<Arc<dyn Connection>> {
        let socket = TcpStream::connect(endpoint)
            .await
            .map_err(|e| Error::Protocol(format!("connect to {endpoint} failed: {e}")))?;
        socket.set_nodelay(true).ok();

        let io: Box<dyn AsyncDuplex> = match tls {
            Some(cfg) => {
                let connector = TlsConnector::from(cfg.rustls_config);
                let server_name = ServerName::try_from(cfg.server_name.as_str())
                    .map_err(|_| Error::InvalidArgument(format!("invalid TLS server name: {}", cfg.server_name)))?;
                let stream = connector
                    .connect(server_name, socket)
                    .await
                    .map_err(|e| Error::Protocol(format!("TLS handshake failed: {e}")))?;
                Box::new(stream)
            }
            None => Box::new(socket),
        };

        Http2Connection::establish(io, Role::Client).await
    }

    async fn listen(&self, bind_address: &str, tls: Option<ServerTlsConfig>) -> Result<Box<dyn Listener>> {
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|e| Error::Protocol(format!("bind {bind_address} failed: {e}")))?;
        let acceptor = tls.map(|cfg| TlsAcceptor::from(cfg.rustls_config));
        Ok(Box::new(Http2Listener::new(listener, acceptor)))
    }
}
