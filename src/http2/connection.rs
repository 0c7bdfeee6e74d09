//! The HTTP/2 connection: owns the HPACK tables, flow-control windows, the
//! active-stream map, and the reader/writer tasks that multiplex frames
//! across streams (spec §3 "Connection", §5 "Shared-resource policy").
//!
//! Grounded in the teacher's `Connection` (a request queue plus a
//! response-receiver thread over a shared `Socket`), generalized from a
//! single in-flight-request-at-a-time client into a full multiplexer with
//! one `DashMap`-backed stream table per spec §5 ("the active-stream map ...
//! MUST be protected by a mutex or be wait-free" — `DashMap` is wait-free).

use super::flow_control::Window;
use super::settings::Settings;
use super::state_machine::StreamState;
use super::stream::{Http2StreamHandle, StreamEntry};
use super::wire::{flags as wflags, WireFrame, WireType, PREFACE};
use super::AsyncDuplex;
use crate::error::{Error, Result};
use crate::hpack;
use crate::spi::{Connection, Stream};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{split, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Low-water mark, as a fraction of the window, at which a WINDOW_UPDATE is
/// sent to replenish the peer (spec §4.3 "issues WINDOW_UPDATE frames when a
/// configurable low-water threshold is reached").
const WINDOW_UPDATE_THRESHOLD_NUM: u32 = 1;
const WINDOW_UPDATE_THRESHOLD_DEN: u32 = 2;

pub(super) struct Shared {
    pub role: Role,
    pub writer_tx: mpsc::UnboundedSender<WireFrame>,
    pub hpack_encoder: Mutex<hpack::Encoder>,
    pub hpack_decoder: Mutex<hpack::Decoder>,
    pub our_settings: Settings,
    pub their_settings: Mutex<Settings>,
    pub conn_send_window: Window,
    pub conn_recv_window: Mutex<RecvWindowState>,
    pub streams: DashMap<u32, Arc<StreamEntry>>,
    pub next_stream_id: AtomicU32,
    pub last_peer_stream_id: AtomicU32,
    pub is_closing: AtomicBool,
    pub connected: AtomicBool,
    pub accept_rx: Mutex<mpsc::UnboundedReceiver<Box<dyn Stream>>>,
    pub accept_tx: mpsc::UnboundedSender<Box<dyn Stream>>,
    pub open_stream_permits: Arc<Semaphore>,
    pub pending_ping: Mutex<Option<oneshot::Sender<()>>>,
}

pub(super) struct RecvWindowState {
    pub capacity: u32,
    pub consumed_since_update: u32,
}

#[derive(Debug)]
pub struct Http2Connection {
    pub(super) shared: Arc<Shared>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http2ConnectionShared")
            .field("role", &self.role)
            .field("streams", &self.streams.len())
            .finish()
    }
}

impl Http2Connection {
    /// Performs the preface + SETTINGS exchange and spawns the reader and
    /// writer tasks. `io` must already be past any TLS handshake.
    pub async fn establish(mut io: Box<dyn AsyncDuplex>, role: Role) -> Result<Arc<dyn Connection>> {
        if role == Role::Client {
            io.write_all(PREFACE).await?;
        } else {
            let mut preface = [0u8; PREFACE.len()];
            tokio::io::AsyncReadExt::read_exact(&mut io, &mut preface).await?;
            if &preface != PREFACE {
                return Err(Error::Protocol("missing or invalid HTTP/2 client preface".into()));
            }
        }

        let (read_half, mut write_half) = split(io);
        let our_settings = Settings::ours();
        write_half
            .write_all(&{
                let frame = WireFrame::new(WireType::Settings, 0, 0, our_settings.encode());
                let mut buf = Vec::new();
                frame.write_into(&mut buf).await?;
                buf
            })
            .await?;

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            role,
            writer_tx,
            hpack_encoder: Mutex::new(hpack::Encoder::new()),
            hpack_decoder: Mutex::new(hpack::Decoder::new()),
            their_settings: Mutex::new(Settings::default()),
            conn_send_window: Window::new(Settings::default().initial_window_size),
            conn_recv_window: Mutex::new(RecvWindowState {
                capacity: our_settings.initial_window_size,
                consumed_since_update: 0,
            }),
            streams: DashMap::new(),
            next_stream_id: AtomicU32::new(if role == Role::Client { 1 } else { 2 }),
            last_peer_stream_id: AtomicU32::new(0),
            is_closing: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            accept_rx: Mutex::new(accept_rx),
            accept_tx,
            open_stream_permits: Arc::new(Semaphore::new(our_settings.max_concurrent_streams as usize)),
            pending_ping: Mutex::new(None),
            our_settings,
        });

        spawn_writer(shared.clone(), write_half, writer_rx);
        spawn_reader(shared.clone(), read_half);

        Ok(Arc::new(Http2Connection { shared }))
    }
}

fn spawn_writer(
    shared: Arc<Shared>,
    mut write_half: impl tokio::io::AsyncWrite + Unpin + Send + 'static,
    mut rx: mpsc::UnboundedReceiver<WireFrame>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if frame.write_into(&mut write_half).await.is_err() {
                shared.connected.store(false, Ordering::SeqCst);
                break;
            }
        }
    });
}

fn spawn_reader(shared: Arc<Shared>, mut read_half: impl tokio::io::AsyncRead + Unpin + Send + 'static) {
    tokio::spawn(async move {
        loop {
            let max_frame_size = shared.our_settings.max_frame_size;
            let frame = match WireFrame::read_from(&mut read_half, max_frame_size).await {
                Ok(frame) => frame,
                Err(_) => {
                    shared.connected.store(false, Ordering::SeqCst);
                    abort_all_streams(&shared, Error::ConnectionReset);
                    break;
                }
            };
            if let Err(err) = handle_frame(&shared, frame).await {
                log::warn!("connection-level HTTP/2 error: {err}");
                shared.connected.store(false, Ordering::SeqCst);
                abort_all_streams(&shared, Error::ConnectionReset);
                break;
            }
        }
    });
}

fn abort_all_streams(shared: &Arc<Shared>, err: Error) {
    for entry in shared.streams.iter() {
        let _ = entry.value().frame_tx.send(Err(clone_error(&err)));
    }
    shared.streams.clear();
}

/// Resets a single stream (spec §4.3 "Failure semantics": "Stream-level
/// errors ... reset only the affected stream with RST_STREAM and surface
/// ⟨Canceled⟩ or ⟨Protocol⟩ to the owner", §8 "A stream receiving DATA
/// after END_STREAM (rejected, RST_STREAM)"). Unlike [`abort_all_streams`]
/// this never touches the connection: the reader loop keeps running and
/// every other stream is unaffected.
fn reset_stream(shared: &Arc<Shared>, stream_id: u32, err: Error) {
    if let Some((_, entry)) = shared.streams.remove(&stream_id) {
        let _ = entry.frame_tx.send(Err(err));
    }
    const PROTOCOL_ERROR: u32 = 1;
    let _ = shared.writer_tx.send(WireFrame::new(
        WireType::RstStream,
        0,
        stream_id,
        bytes::Bytes::copy_from_slice(&PROTOCOL_ERROR.to_be_bytes()),
    ));
}

fn clone_error(err: &Error) -> Error {
    // `Error` isn't `Clone` (thiserror variants carry owned strings from
    // arbitrary sources); reconstruct the handful of variants used here.
    match err {
        Error::ConnectionReset => Error::ConnectionReset,
        Error::Closed => Error::Closed,
        Error::Canceled => Error::Canceled,
        other => Error::Protocol(other.to_string()),
    }
}

async fn handle_frame(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    match frame.ty {
        WireType::Settings => handle_settings(shared, frame).await,
        WireType::Ping => handle_ping(shared, frame).await,
        WireType::GoAway => {
            shared.is_closing.store(true, Ordering::SeqCst);
            log::info!("received GOAWAY");
            Ok(())
        }
        WireType::WindowUpdate => handle_window_update(shared, frame),
        WireType::RstStream => {
            if let Some((_, entry)) = shared.streams.remove(&frame.stream_id) {
                let _ = entry.frame_tx.send(Err(Error::Canceled));
            }
            Ok(())
        }
        WireType::Headers => handle_headers(shared, frame).await,
        WireType::Data => handle_data(shared, frame).await,
        WireType::Priority => Ok(()),
        WireType::PushPromise => Err(Error::Protocol("server push is disabled".into())),
        WireType::Continuation => Err(Error::Protocol(
            "CONTINUATION chaining is not supported; oversized header blocks are rejected".into(),
        )),
    }
}

async fn handle_settings(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    if frame.flags & wflags::ACK != 0 {
        return Ok(());
    }
    let mut their_settings = shared.their_settings.lock().await;
    let previous_window = their_settings.initial_window_size;
    their_settings.apply_update(&frame.payload)?;
    let delta = i64::from(their_settings.initial_window_size) - i64::from(previous_window);
    if delta != 0 {
        for entry in shared.streams.iter() {
            entry.value().send_window.increment(delta);
        }
    }
    drop(their_settings);
    let ack = WireFrame::new(WireType::Settings, wflags::ACK, 0, bytes::Bytes::new());
    shared
        .writer_tx
        .send(ack)
        .map_err(|_| Error::Closed)?;
    Ok(())
}

async fn handle_ping(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    if frame.flags & wflags::ACK != 0 {
        if let Some(tx) = shared.pending_ping.lock().await.take() {
            let _ = tx.send(());
        }
        return Ok(());
    }
    if frame.payload.len() != 8 {
        return Err(Error::Protocol("PING payload must be 8 bytes".into()));
    }
    let ack = WireFrame::new(WireType::Ping, wflags::ACK, 0, frame.payload);
    shared.writer_tx.send(ack).map_err(|_| Error::Closed)
}

fn handle_window_update(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    if frame.payload.len() != 4 {
        return Err(Error::Protocol("WINDOW_UPDATE payload must be 4 bytes".into()));
    }
    let increment = u32::from_be_bytes(frame.payload[..4].try_into().unwrap()) & 0x7fff_ffff;
    if increment == 0 {
        return Err(Error::Protocol("WINDOW_UPDATE increment of 0 is invalid".into()));
    }
    if frame.stream_id == 0 {
        shared.conn_send_window.increment(i64::from(increment));
    } else if let Some(entry) = shared.streams.get(&frame.stream_id) {
        entry.send_window.increment(i64::from(increment));
    }
    Ok(())
}

async fn handle_headers(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    if frame.flags & wflags::END_HEADERS == 0 {
        return Err(Error::Protocol(
            "HEADERS without END_HEADERS requires CONTINUATION, which is unsupported".into(),
        ));
    }
    let headers = {
        let mut decoder = shared.hpack_decoder.lock().await;
        decoder.decode(&frame.payload)?
    };

    let entry = match shared.streams.get(&frame.stream_id) {
        Some(entry) => entry.clone(),
        None => {
            if shared.role != Role::Server {
                return Err(Error::Protocol("peer opened a stream on a client connection".into()));
            }
            let admission = shared.open_stream_permits.clone().try_acquire_owned().ok();
            if admission.is_none() {
                return Err(Error::ResourceExhausted("max_concurrent_streams reached".into()));
            }
            let entry = Arc::new(StreamEntry::with_admission(
                frame.stream_id,
                shared.our_settings.initial_window_size,
                shared.their_settings.lock().await.initial_window_size,
                admission,
            ));
            shared.streams.insert(frame.stream_id, entry.clone());
            shared
                .last_peer_stream_id
                .fetch_max(frame.stream_id, Ordering::SeqCst);
            let handle = Http2StreamHandle::new(frame.stream_id, shared.clone(), entry.clone());
            let _ = shared.accept_tx.send(Box::new(handle));
            entry
        }
    };

    let end_stream = frame.flags & wflags::END_STREAM != 0;
    mark_end_stream_received(shared, frame.stream_id, &entry, end_stream).await;
    let mut out_flags = crate::frame::Flags::END_HEADERS;
    if end_stream {
        out_flags |= crate::frame::Flags::END_STREAM;
    }
    let out = crate::frame::Frame::new(crate::frame::FrameType::Headers, out_flags, headers.to_wire_bytes());
    let _ = entry.frame_tx.send(Ok(out));
    Ok(())
}

async fn handle_data(shared: &Arc<Shared>, frame: WireFrame) -> Result<()> {
    // Clone the `Arc` and drop DashMap's shard guard immediately — holding it
    // across the `.await`s below would deadlock against the `remove()` that
    // `mark_end_stream_received` issues once this stream closes.
    let entry = match shared.streams.get(&frame.stream_id).map(|e| e.clone()) {
        Some(entry) => entry,
        None => {
            // Stream-scoped, not connection-fatal (spec §4.3/§7): reset just
            // this stream id and let the reader loop keep serving the rest
            // of the connection's streams.
            reset_stream(
                shared,
                frame.stream_id,
                Error::Protocol(format!("DATA on unknown stream {}", frame.stream_id)),
            );
            return Ok(());
        }
    };

    {
        let state = *entry.state.lock().await;
        if !state.can_read() {
            reset_stream(
                shared,
                frame.stream_id,
                Error::Protocol(format!(
                    "DATA received after END_STREAM on stream {}",
                    frame.stream_id
                )),
            );
            return Ok(());
        }
    }

    let len = frame.payload.len() as u32;
    maybe_send_window_update(shared, Some(frame.stream_id), &entry, len).await;

    let end_stream = frame.flags & wflags::END_STREAM != 0;
    mark_end_stream_received(shared, frame.stream_id, &entry, end_stream).await;
    let mut out_flags = crate::frame::Flags::empty();
    if end_stream {
        out_flags |= crate::frame::Flags::END_STREAM;
    }
    let out = crate::frame::Frame::new(crate::frame::FrameType::Data, out_flags, frame.payload);
    let _ = entry.frame_tx.send(Ok(out));
    Ok(())
}

/// Applies the receive-side half of the state machine and, if both
/// directions are now closed, drops the entry out of the stream map so its
/// `max_concurrent_streams` admission permit is released.
async fn mark_end_stream_received(shared: &Arc<Shared>, stream_id: u32, entry: &Arc<StreamEntry>, end_stream: bool) {
    let closed = {
        let mut state = entry.state.lock().await;
        *state = match (*state, end_stream) {
            (StreamState::Idle, false) => StreamState::Open,
            (StreamState::Idle, true) => StreamState::HalfClosedRemote,
            (StreamState::Open, true) => StreamState::HalfClosedRemote,
            (StreamState::HalfClosedLocal, true) => StreamState::Closed,
            (other, _) => other,
        };
        *state == StreamState::Closed
    };
    if closed {
        shared.streams.remove(&stream_id);
    }
}

async fn maybe_send_window_update(
    shared: &Arc<Shared>,
    stream_id: Option<u32>,
    entry: &Arc<StreamEntry>,
    consumed: u32,
) {
    entry.recv_consumed.fetch_add(consumed, Ordering::SeqCst);
    let threshold = shared.our_settings.initial_window_size / WINDOW_UPDATE_THRESHOLD_DEN
        * WINDOW_UPDATE_THRESHOLD_NUM;
    let consumed_total = entry.recv_consumed.load(Ordering::SeqCst);
    if consumed_total >= threshold.max(1) {
        entry.recv_consumed.store(0, Ordering::SeqCst);
        if let Some(id) = stream_id {
            let _ = shared.writer_tx.send(WireFrame::new(
                WireType::WindowUpdate,
                0,
                id,
                bytes::Bytes::copy_from_slice(&consumed_total.to_be_bytes()),
            ));
        }
    }

    let mut conn_recv = shared.conn_recv_window.lock().await;
    conn_recv.consumed_since_update += consumed;
    let conn_threshold = conn_recv.capacity / WINDOW_UPDATE_THRESHOLD_DEN * WINDOW_UPDATE_THRESHOLD_NUM;
    if conn_recv.consumed_since_update >= conn_threshold.max(1) {
        let amount = conn_recv.consumed_since_update;
        conn_recv.consumed_since_update = 0;
        let _ = shared.writer_tx.send(WireFrame::new(
            WireType::WindowUpdate,
            0,
            0,
            bytes::Bytes::copy_from_slice(&amount.to_be_bytes()),
        ));
    }
}

#[async_trait]
impl Connection for Http2Connection {
    async fn open_stream(&self) -> Result<Box<dyn Stream>> {
        if self.shared.is_closing.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        let admission = self
            .shared
            .open_stream_permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| Error::ResourceExhausted("max_concurrent_streams reached".into()))?;

        let id = self.shared.next_stream_id.fetch_add(2, Ordering::SeqCst);
        let their_window = self.shared.their_settings.lock().await.initial_window_size;
        let entry = Arc::new(StreamEntry::with_admission(
            id,
            self.shared.our_settings.initial_window_size,
            their_window,
            Some(admission),
        ));
        self.shared.streams.insert(id, entry.clone());
        Ok(Box::new(Http2StreamHandle::new(id, self.shared.clone(), entry)))
    }

    async fn accept_stream(&self) -> Result<Option<Box<dyn Stream>>> {
        let mut rx = self.shared.accept_rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) {
        self.shared.is_closing.store(true, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
    }

    async fn ping(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        *self.shared.pending_ping.lock().await = Some(tx);
        self.shared
            .writer_tx
            .send(WireFrame::new(WireType::Ping, 0, 0, bytes::Bytes::from_static(&[0u8; 8])))
            .map_err(|_| Error::Closed)?;
        tokio::time::timeout(std::time::Duration::from_secs(10), rx)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|_| Error::Closed)
    }

    async fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn go_away(&self) {
        self.shared.is_closing.store(true, Ordering::SeqCst);
        let last = self.shared.last_peer_stream_id.load(Ordering::SeqCst);
        let mut payload = bytes::BytesMut::with_capacity(8);
        payload.extend_from_slice(&last.to_be_bytes());
        payload.extend_from_slice(&0u32.to_be_bytes()); // NO_ERROR
        let _ = self
            .shared
            .writer_tx
            .send(WireFrame::new(WireType::GoAway, 0, 0, payload.freeze()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared() -> Arc<Shared> {
        let (writer_tx, _writer_rx) = mpsc::unbounded_channel();
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let our_settings = Settings::ours();
        Arc::new(Shared {
            role: Role::Server,
            writer_tx,
            hpack_encoder: Mutex::new(hpack::Encoder::new()),
            hpack_decoder: Mutex::new(hpack::Decoder::new()),
            their_settings: Mutex::new(Settings::default()),
            conn_send_window: Window::new(Settings::default().initial_window_size),
            conn_recv_window: Mutex::new(RecvWindowState {
                capacity: our_settings.initial_window_size,
                consumed_since_update: 0,
            }),
            streams: DashMap::new(),
            next_stream_id: AtomicU32::new(2),
            last_peer_stream_id: AtomicU32::new(0),
            is_closing: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            accept_rx: Mutex::new(accept_rx),
            accept_tx,
            open_stream_permits: Arc::new(Semaphore::new(100)),
            pending_ping: Mutex::new(None),
            our_settings,
        })
    }

    /// Spec §8 boundary behavior: "A stream receiving DATA after END_STREAM
    /// (rejected, RST_STREAM)" — stream-scoped, not connection-fatal.
    #[tokio::test]
    async fn data_after_end_stream_resets_only_that_stream() {
        let shared = test_shared();

        let victim = Arc::new(StreamEntry::new(1, shared.our_settings.initial_window_size, 65_535));
        *victim.state.lock().await = StreamState::HalfClosedRemote;
        shared.streams.insert(1, victim);

        let other = Arc::new(StreamEntry::new(3, shared.our_settings.initial_window_size, 65_535));
        *other.state.lock().await = StreamState::Open;
        shared.streams.insert(3, other);

        let frame = WireFrame::new(WireType::Data, 0, 1, bytes::Bytes::from_static(b"late"));
        handle_data(&shared, frame).await.expect("stream-scoped violation must not bubble up as a connection error");

        assert!(
            !shared.streams.contains_key(&1),
            "the violating stream is reset and dropped"
        );
        assert!(
            shared.streams.contains_key(&3),
            "an unrelated concurrent stream on the same connection is unaffected"
        );
        assert!(
            shared.connected.load(Ordering::SeqCst),
            "the connection itself must stay up"
        );
    }

    /// Same spec clause, "DATA on unknown stream" variant — also
    /// stream-scoped per §4.3 "Failure semantics".
    #[tokio::test]
    async fn data_on_unknown_stream_resets_only_that_stream() {
        let shared = test_shared();

        let other = Arc::new(StreamEntry::new(3, shared.our_settings.initial_window_size, 65_535));
        *other.state.lock().await = StreamState::Open;
        shared.streams.insert(3, other);

        let frame = WireFrame::new(WireType::Data, 0, 99, bytes::Bytes::from_static(b"x"));
        handle_data(&shared, frame).await.expect("unknown-stream violation must not bubble up as a connection error");

        assert!(!shared.streams.contains_key(&99));
        assert!(
            shared.streams.contains_key(&3),
            "an unrelated concurrent stream on the same connection is unaffected"
        );
        assert!(shared.connected.load(Ordering::SeqCst));
    }
}
