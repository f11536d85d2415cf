//! Error types for request parsing and handling.

use thiserror::Error;

use crate::http::response::StatusCode;

/// A request violated the wire format. Always fatal for the connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("invalid method: {0:?}")]
    InvalidMethod(String),

    #[error("unsupported HTTP version: {0:?}")]
    UnsupportedVersion(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("whitespace before colon in header line: {0:?}")]
    WhitespaceBeforeColon(String),

    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("body length {received} exceeds content-length {declared}")]
    BodyOverrun { declared: usize, received: usize },

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("request already parsed")]
    AlreadyParsed,
}

/// Failure while reading a request off a byte stream.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("end of stream before a complete request")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by a handler. The server logs it and never retries.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct HandlerError {
    pub code: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self::internal(e.to_string())
    }
}
