//! Shared error taxonomy (spec §4.1, §7).
//!
//! Every value that crosses an SPI boundary — [`crate::spi::Transport`],
//! [`crate::spi::Connection`], [`crate::spi::Stream`], [`crate::spi::Listener`],
//! and the server/client public APIs — uses this enum. Adapters translate
//! their native errors (`std::io::Error`, HPACK decode failures, ...) into
//! one of these variants at the boundary; nothing upstream of an adapter
//! ever sees a native error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("operation timed out")]
    Timeout,

    #[error("operation canceled")]
    Canceled,

    #[error("stream or connection is closed")]
    Closed,

    #[error("connection was reset by peer")]
    ConnectionReset,

    #[error("temporary failure: {0}")]
    Temporary(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not connected")]
    NotConnected,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("out of memory")]
    OutOfMemory,

    // --- RPC-layer errors surfaced by the server/client on top of the
    // transport taxonomy above (spec §4.6, §4.7, §7).
    #[error("malformed or incomplete request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    NotFound(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            TimedOut => Error::Timeout,
            ConnectionReset | ConnectionAborted | BrokenPipe => Error::ConnectionReset,
            NotConnected => Error::NotConnected,
            WouldBlock => Error::Temporary(err.to_string()),
            _ => Error::Protocol(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
