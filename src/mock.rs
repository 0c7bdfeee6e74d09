//! In-memory transport (SPEC_FULL §3.4, §4.1) used by the contract-test
//! harness in `tests/`: a full [`crate::spi::Transport`] implementation with
//! no sockets, so [`crate::server::Server`] and [`crate::client::Client`]
//! exercise the real request/response/deadline/shutdown machinery against
//! deterministic `#[tokio::test]`s instead of live ports.
//!
//! Grounded in the HTTP/2 adapter's own concurrency idioms
//! (`http2::connection::Shared` — `mpsc::unbounded_channel` for the
//! accept-stream queue, atomics for connection state, `DashMap` for
//! listener registration) since the teacher ships no loopback/mock
//! transport of its own; the address→listener registry below plays the
//! role the teacher's `Socket::connect` plays for a live `TcpStream`.

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::spi::{ClientTlsConfig, Connection, Listener, ServerTlsConfig, Stream, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

type ConnSender = mpsc::UnboundedSender<Arc<dyn Connection>>;

/// Process-wide address→listener registry, analogous to binding a real port:
/// [`MockTransport::connect`] looks an address up here rather than resolving
/// DNS, so tests can run many transports in one process without port
/// collisions.
static REGISTRY: Lazy<DashMap<String, ConnSender>> = Lazy::new(DashMap::new);

/// A [`crate::spi::Transport`] backed by nothing but channels. Cloning is
/// cheap and every clone shares the same [`REGISTRY`], matching the
/// spec's "transport instances are cheap to construct" framing (spec §3).
#[derive(Debug, Default, Clone, Copy)]
pub struct MockTransport;

impl MockTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, endpoint: &str, _tls: Option<ClientTlsConfig>) -> Result<Arc<dyn Connection>> {
        let sender = REGISTRY
            .get(endpoint)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NotConnected)?;
        let (client, server) = MockConnection::pair();
        sender.send(server).map_err(|_| Error::Closed)?;
        Ok(client)
    }

    async fn listen(&self, bind_address: &str, _tls: Option<ServerTlsConfig>) -> Result<Box<dyn Listener>> {
        let (tx, rx) = mpsc::unbounded_channel();
        REGISTRY.insert(bind_address.to_string(), tx);
        Ok(Box::new(MockListener {
            address: bind_address.to_string(),
            incoming: rx,
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct MockListener {
    address: String,
    incoming: mpsc::UnboundedReceiver<Arc<dyn Connection>>,
    closed: bool,
}

#[async_trait]
impl Listener for MockListener {
    async fn accept(&mut self) -> Result<Arc<dyn Connection>> {
        if self.closed {
            return Err(Error::Closed);
        }
        self.incoming.recv().await.ok_or(Error::Closed)
    }

    async fn close(&mut self) {
        self.closed = true;
        REGISTRY.remove(&self.address);
    }
}

/// One side of an in-memory connection pair. `peer_incoming` delivers
/// streams this side opens to the *other* side's `incoming_streams` queue,
/// mirroring the directionality `open_stream`/`accept_stream` have on a real
/// multiplexed transport.
#[derive(Debug)]
struct MockConnection {
    next_stream_id: AtomicU64,
    peer_incoming: mpsc::UnboundedSender<Box<dyn Stream>>,
    incoming_streams: Mutex<mpsc::UnboundedReceiver<Box<dyn Stream>>>,
    connected: AtomicBool,
}

impl MockConnection {
    fn pair() -> (Arc<dyn Connection>, Arc<dyn Connection>) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let a: Arc<dyn Connection> = Arc::new(MockConnection {
            next_stream_id: AtomicU64::new(1),
            peer_incoming: b_tx,
            incoming_streams: Mutex::new(a_rx),
            connected: AtomicBool::new(true),
        });
        let b: Arc<dyn Connection> = Arc::new(MockConnection {
            next_stream_id: AtomicU64::new(2),
            peer_incoming: a_tx,
            incoming_streams: Mutex::new(b_rx),
            connected: AtomicBool::new(true),
        });
        (a, b)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn open_stream(&self) -> Result<Box<dyn Stream>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let id = self.next_stream_id.fetch_add(2, Ordering::SeqCst);
        let (local_tx, local_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let local = MockStream {
            id,
            tx: Some(peer_tx),
            rx: local_rx,
        };
        let peer = MockStream {
            id,
            tx: Some(local_tx),
            rx: peer_rx,
        };
        self.peer_incoming
            .send(Box::new(peer))
            .map_err(|_| Error::Closed)?;
        Ok(Box::new(local))
    }

    async fn accept_stream(&self) -> Result<Option<Box<dyn Stream>>> {
        Ok(self.incoming_streams.lock().await.recv().await)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn ping(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn go_away(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct MockStream {
    id: u64,
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl Stream for MockStream {
    async fn write_frame(&mut self, frame_type: crate::frame::FrameType, flags: crate::frame::Flags, data: bytes::Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.send(Frame::new(frame_type, flags, data)).map_err(|_| Error::Closed)
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }

    async fn cancel(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Frame::new(
                crate::frame::FrameType::Cancel,
                crate::frame::Flags::empty(),
                bytes::Bytes::new(),
            ));
        }
    }

    fn stream_id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Flags, FrameType};

    #[tokio::test]
    async fn connect_without_listener_fails() {
        let transport = MockTransport::new();
        let err = transport.connect("mock://nowhere", None).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn client_stream_is_visible_to_server_accept() {
        let transport = MockTransport::new();
        let mut listener = transport.listen("mock://pair-test", None).await.unwrap();

        let accept_task = tokio::spawn(async move {
            let conn = listener.accept().await.unwrap();
            let mut stream = conn.accept_stream().await.unwrap().unwrap();
            let frame = stream.read_frame().await.unwrap().unwrap();
            assert_eq!(frame.data.as_ref(), b"hello");
        });

        let client_conn = transport.connect("mock://pair-test", None).await.unwrap();
        let mut stream = client_conn.open_stream().await.unwrap();
        stream
            .write_frame(FrameType::Data, Flags::END_STREAM, bytes::Bytes::from_static(b"hello"))
            .await
            .unwrap();

        accept_task.await.unwrap();
    }
}
