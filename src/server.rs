//! RPC Server (C6, spec §4.6): accept loop, per-connection and per-stream
//! handling, admission control, rate limiting, graceful drain, request
//! dispatch. Grounded in the HTTP/2 adapter's own task-spawning style
//! (`http2::connection` — one reader task, atomics for shared flags,
//! `Notify`/`Semaphore` for backpressure) since no single teacher file
//! implements a transport-agnostic accept loop; generalized here to run
//! over any [`crate::spi::Transport`] rather than a concrete adapter.

pub mod admission;
pub mod config;
pub mod context;
pub mod deadline;
mod registry;

pub use config::ServerConfig;
pub use context::{RequestContext, ResponseContext};
pub use registry::{Handler, HandlerRegistry};

use crate::error::{Error, Result};
use crate::frame::{Flags, FrameType};
use crate::grpc_framing::{self, MessageReassembler};
use crate::headers::Headers;
use crate::spi::{Connection, Listener, Stream, Transport};
use crate::status::status_for_error;
use admission::{ConnectionAdmission, TokenBucket};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Tracks spawned handler tasks so `deinit()` can block until the count
/// reaches zero (spec §4.6 "Graceful shutdown" (d), §5 "wait-group").
#[derive(Debug, Default)]
struct WaitGroup {
    count: std::sync::atomic::AtomicUsize,
    notify: Notify,
}

impl WaitGroup {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    async fn wait_until_zero(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A transport-agnostic gRPC server (C6). Generic over nothing — adapters
/// are type-erased behind [`Transport`]/[`Connection`]/[`Stream`], so the
/// same `Server` runs over HTTP/2, HTTP/3, or [`crate::mock::MockTransport`]
/// unchanged.
pub struct Server {
    transport: Arc<dyn Transport>,
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
    admission: Arc<ConnectionAdmission>,
    rate_limiter: Option<Arc<TokenBucket>>,
    listener: Mutex<Option<Box<dyn Listener>>>,
    active_connections: Arc<DashMap<u64, Arc<dyn Connection>>>,
    next_connection_id: AtomicU64,
    is_running: Arc<AtomicBool>,
    wait_group: Arc<WaitGroup>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("methods", &self.registry.method_names().collect::<Vec<_>>())
            .field("is_running", &self.is_running.load(Ordering::SeqCst))
            .finish()
    }
}

impl Server {
    /// `init(config)` (spec §4.6 "Public contract"). Handlers are registered
    /// afterward via [`Server::register_handler`], before [`Server::serve`].
    pub fn new(transport: Arc<dyn Transport>, config: ServerConfig) -> Self {
        let rate_limiter = match (config.rate_limiter_burst, config.rate_limiter_rate) {
            (Some(burst), Some(rate)) => Some(Arc::new(TokenBucket::new(burst, rate))),
            _ => None,
        };
        Self {
            transport,
            admission: Arc::new(ConnectionAdmission::new(config.max_concurrent_connections)),
            rate_limiter,
            config,
            registry: Arc::new(HandlerRegistry::new()),
            listener: Mutex::new(None),
            active_connections: Arc::new(DashMap::new()),
            next_connection_id: AtomicU64::new(0),
            is_running: Arc::new(AtomicBool::new(false)),
            wait_group: Arc::new(WaitGroup::default()),
        }
    }

    /// `registerHandler(method_path, fn)`. Mutating after [`Server::serve`]
    /// has started is a caller error (spec §3 "never mutated once the
    /// server starts serving"); this panics rather than silently ignoring
    /// the call, since the registry is otherwise lock-free for lookups.
    pub fn register_handler(&mut self, method_path: impl Into<String>, handler: impl Handler + 'static) {
        Arc::get_mut(&mut self.registry)
            .expect("register_handler called after serve() started sharing the registry")
            .register(method_path, handler);
    }

    /// `bind(addr, tls?)`: creates the listener. Must be called before
    /// [`Server::serve`].
    pub async fn bind(&self) -> Result<()> {
        let listener = self
            .transport
            .listen(&self.config.bind_address, self.config.tls_config.clone())
            .await?;
        *self.listener.lock().await = Some(listener);
        Ok(())
    }

    /// `serve()`: runs the accept loop until [`Server::stop`] is called or
    /// the listener closes (spec §4.6 "Accept loop").
    pub async fn serve(&self) -> Result<()> {
        self.is_running.store(true, Ordering::SeqCst);
        loop {
            if !self.is_running.load(Ordering::SeqCst) {
                break;
            }
            let mut guard = self.listener.lock().await;
            let listener = guard.as_mut().ok_or(Error::InvalidState("bind() was not called".into()))?;
            match listener.accept().await {
                Ok(conn) => {
                    drop(guard);
                    self.admit_and_spawn(conn).await;
                }
                Err(Error::Timeout) => continue,
                Err(Error::Closed) => break,
                Err(err) => {
                    log::warn!("accept() failed: {err}");
                    continue;
                }
            }
        }
        self.is_running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn admit_and_spawn(&self, conn: Arc<dyn Connection>) {
        if !self.is_running.load(Ordering::SeqCst) {
            conn.close().await;
            return;
        }
        if let Some(bucket) = &self.rate_limiter {
            if !bucket.try_acquire() {
                log::debug!("rate limiter rejected an incoming connection");
                conn.close().await;
                return;
            }
        }
        let permit = match self.admission.try_admit() {
            Some(permit) => permit,
            None => {
                log::debug!("max_concurrent_connections reached, rejecting connection");
                conn.close().await;
                return;
            }
        };

        let conn_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        self.active_connections.insert(conn_id, conn.clone());

        let registry = self.registry.clone();
        let active_connections = self.active_connections.clone();
        let wait_group = self.wait_group.clone();
        let is_running = self.is_running.clone();
        let max_streams = self.config.max_concurrent_streams_per_connection;
        let request_timeout_ms = self.config.request_timeout_ms;

        tokio::spawn(async move {
            let _permit = permit;
            let stream_permits = Arc::new(tokio::sync::Semaphore::new(max_streams.max(1)));
            loop {
                match conn.accept_stream().await {
                    Ok(Some(stream)) => {
                        let registry = registry.clone();
                        let wait_group = wait_group.clone();
                        let request_timeout_ms = request_timeout_ms;
                        let stream_permits = stream_permits.clone();
                        wait_group.add();
                        tokio::spawn(async move {
                            let _stream_permit = stream_permits.acquire_owned().await.ok();
                            if let Err(err) = handle_stream(stream, &registry, request_timeout_ms).await {
                                log::warn!("stream handling ended with error: {err}");
                            }
                            wait_group.done();
                        });
                    }
                    Ok(None) => break,
                    Err(err) => {
                        log::debug!("connection demultiplexer ended: {err}");
                        break;
                    }
                }
                if !is_running.load(Ordering::SeqCst) {
                    conn.go_away().await;
                }
            }
            active_connections.remove(&conn_id);
        });
    }

    /// `stop()`: initiates graceful shutdown (spec §4.6 "Graceful
    /// shutdown" (a)-(b)) — stops admitting new connections and signals
    /// every live connection to GOAWAY. In-flight handlers are left to run
    /// to completion; wait for them with [`Server::deinit`].
    pub async fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(listener) = self.listener.lock().await.as_mut() {
            listener.close().await;
        }
        for entry in self.active_connections.iter() {
            entry.value().go_away().await;
        }
    }

    /// `deinit()`: blocks until every spawned handler task has completed
    /// (spec §4.6 "Graceful shutdown" (d)).
    pub async fn deinit(&self) {
        self.wait_group.wait_until_zero().await;
    }
}

/// Per-stream handling (spec §4.6 "Per-stream handling"): header gather,
/// body reassembly, dispatch, respond.
async fn handle_stream(
    mut stream: Box<dyn Stream>,
    registry: &HandlerRegistry,
    request_timeout_ms: Option<u64>,
) -> Result<()> {
    let gathered = gather_request(stream.as_mut()).await;
    let (method_path, headers, payload) = match gathered {
        Ok(parts) => parts,
        Err(err) => {
            respond_error(stream.as_mut(), &err).await?;
            return Ok(());
        }
    };

    let deadline = deadline::resolve_deadline(&headers, request_timeout_ms)?;
    let request = RequestContext {
        method_path: method_path.clone(),
        headers,
        payload,
        deadline,
    };

    let handler = match registry.get(&method_path) {
        Some(handler) => handler,
        None => {
            // A registry miss is UNIMPLEMENTED (spec §4.6 step 3, §8 scenario
            // 2), distinct from a handler-returned `Error::NotFound`, which
            // `status_for_error` maps to NOT_FOUND (spec §7). Built directly
            // rather than through that mapping so the two cases stay
            // separate gRPC status codes.
            let mut response = ResponseContext::new();
            response.status = crate::status::Status::Unimplemented;
            response.message = Some(format!("method not found: {method_path}"));
            respond_success(stream.as_mut(), &response).await?;
            return Ok(());
        }
    };

    let mut response = ResponseContext::new();
    match handler.handle(request, &mut response).await {
        Ok(()) => respond_success(stream.as_mut(), &response).await,
        Err(err) => respond_error(stream.as_mut(), &err).await,
    }
}

/// Header gather (step 1) + body reassembly (step 2). Returns the method
/// path (`:path` stripped of its leading `/`), the request headers, the
/// single reassembled gRPC message body, and whether END_STREAM has
/// already been observed.
async fn gather_request(
    stream: &mut dyn Stream,
) -> Result<(String, Headers, bytes::Bytes)> {
    let (headers, mut end_stream) = loop {
        match stream.read_frame().await? {
            Some(frame) if frame.frame_type == FrameType::Headers && frame.is_end_headers() => {
                let headers = Headers::from_wire_bytes(&frame.data)?;
                break (headers, frame.is_end_stream());
            }
            Some(_) => continue,
            None => return Err(Error::InvalidRequest("connection ended before headers arrived".into())),
        }
    };

    let path = headers
        .get(":path")
        .ok_or_else(|| Error::InvalidRequest("missing :path pseudo-header".into()))?;
    let method_path = path.strip_prefix('/').unwrap_or(path).to_string();

    let mut reassembler = MessageReassembler::new();
    while !end_stream {
        match stream.read_frame().await? {
            Some(frame) if frame.frame_type == FrameType::Data => {
                reassembler.push(&frame.data);
                if frame.is_end_stream() {
                    end_stream = true;
                }
            }
            Some(_) => continue,
            None => break,
        }
    }

    let payload = reassembler
        .next_message()
        .map(|(_, body)| body)
        .unwrap_or_default();
    Ok((method_path, headers, payload))
}

/// Respond (step 4): HEADERS(`:status 200`), DATA, trailer HEADERS carrying
/// `grpc-status`/`grpc-message`.
async fn respond_success(stream: &mut dyn Stream, response: &ResponseContext) -> Result<()> {
    let mut response_headers = Headers::new();
    response_headers.push(":status", "200");
    response_headers.push("content-type", "application/grpc");
    for (name, value) in response.headers.iter() {
        response_headers.push(name.clone(), value.clone());
    }
    stream
        .write_frame(FrameType::Headers, Flags::END_HEADERS, response_headers.to_wire_bytes())
        .await?;

    let framed = grpc_framing::encode_message(false, &response.payload);
    stream.write_frame(FrameType::Data, Flags::empty(), framed).await?;

    let mut trailer = Headers::new();
    trailer.push("grpc-status", response.status.code().to_string());
    if let Some(message) = &response.message {
        trailer.push("grpc-message", message.clone());
    }
    // `FrameType::Status` always closes the stream in every adapter (the
    // logical trailer is the true end of a gRPC response, not the DATA
    // frame before it, so the stream's half-closed-local transition lands
    // here and nowhere else).
    stream
        .write_frame(FrameType::Status, Flags::empty(), trailer.to_wire_bytes())
        .await?;
    Ok(())
}

/// Handler (or header-gather) failure path: translate to a gRPC status
/// trailer (spec §7) with no response body.
async fn respond_error(stream: &mut dyn Stream, err: &Error) -> Result<()> {
    let (status, message) = status_for_error(err);
    let mut response = ResponseContext::new();
    response.status = status;
    response.message = Some(message);
    respond_success(stream, &response).await
}
