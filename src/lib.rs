#![warn(future_incompatible, nonstandard_style, rust_2018_idioms, unused)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::similar_names,
    clippy::cast_possible_truncation, // TODO
    clippy::too_many_lines, // TODO
)]

//! A transport-agnostic, gRPC-compatible RPC runtime core: HTTP/2 and
//! HTTP/3 wire adapters (`http2`, `http3`) sharing one SPI (`spi`), frame
//! model (`frame`), gRPC message framing (`grpc_framing`) and status
//! taxonomy (`status`), driving a generic [`server::Server`] and
//! [`client::Client`].

pub mod client;
pub mod error;
pub mod frame;
pub mod grpc_framing;
pub mod headers;
pub mod hpack;
pub mod http2;
pub mod http3;
pub mod mock;
pub mod server;
pub mod spi;
pub mod status;

pub use client::{Client, ClientConfig};
pub use error::{Error, Result};
pub use frame::{Flags, Frame, FrameType};
pub use server::{RequestContext, ResponseContext, Server, ServerConfig};
pub use spi::{ClientTlsConfig, Connection, Listener, ServerTlsConfig, Stream, Transport};
pub use status::Status;
