//! HTTP/1.1 directly on top of TCP.
//!
//! An incremental request parser that tolerates arbitrarily fragmented input,
//! a response encoder with chunked transfer-encoding and trailers, and a
//! one-request-per-connection server that ties them together.

pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::{serve, Handler, Request, ServerHandle, Writer};
pub use lifecycle::Shutdown;
