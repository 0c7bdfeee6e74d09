//! Promotes QUIC connections accepted by the opaque provider into
//! [`Http3Connection`]s in server role (spec §4.4, §4.1 "Listener").

use super::connection::{Http3Connection, Role};
use super::quic::QuicListenerProvider;
use crate::error::Result;
use crate::spi::{Connection, Listener};
use async_trait::async_trait;
use std::sync::Arc;

pub struct Http3Listener {
    inner: Box<dyn QuicListenerProvider>,
}

impl std::fmt::Debug for Http3Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http3Listener").finish()
    }
}

impl Http3Listener {
    pub(super) fn new(inner: Box<dyn QuicListenerProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Listener for Http3Listener {
    async fn accept(&mut self) -> Result<Arc<dyn Connection>> {
        let quic_conn = self.inner.accept().await?;
        Http3Connection::establish(quic_conn, Role::Server).await
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}
