//! Per-call contexts handed to a registered handler (spec §4.6 "Dispatch",
//! §6 "Consumer-supplied interfaces").

use crate::headers::Headers;
use crate::status::Status;
use bytes::Bytes;
use tokio::time::Instant;

/// Everything a handler needs to know about the inbound call. Built once
/// header gather and body reassembly (spec §4.6 steps 1-2) are complete.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method_path: String,
    pub headers: Headers,
    pub payload: Bytes,
    /// Absolute deadline, installed from `grpc-timeout` or the server's
    /// `request_timeout_ms` default (spec §4.6 "Deadline propagation").
    /// A handler SHOULD check this and abort with DEADLINE_EXCEEDED; the
    /// core does not forcibly cancel handlers that ignore it.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

/// Filled in by the handler, then turned into the HEADERS/DATA/trailer
/// sequence of spec §4.6 "Respond".
#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub status: Status,
    pub message: Option<String>,
    pub headers: Headers,
    pub payload: Bytes,
}

impl ResponseContext {
    /// A fresh response defaults to OK with an empty body; a handler only
    /// needs to set what diverges from success.
    pub fn new() -> Self {
        Self {
            status: Status::Ok,
            message: None,
            headers: Headers::new(),
            payload: Bytes::new(),
        }
    }
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}
