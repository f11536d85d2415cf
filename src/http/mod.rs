//! HTTP/1.1 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → buffer.rs (growable read buffer)
//!     → request.rs (request line, headers.rs, content-length body)
//!     → server.rs (dispatch to the application handler)
//!     → response.rs (status line, headers, fixed or chunked body, trailers)
//!     → Send to client, close
//! ```

pub mod buffer;
pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use error::{HandlerError, ParseError, RequestError};
pub use headers::Headers;
pub use request::{request_from_reader, ParseState, Request, RequestLine};
pub use response::{default_headers, StatusCode, Writer};
pub use server::{serve, Handler, ServerError, ServerHandle};
