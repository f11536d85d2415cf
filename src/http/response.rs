//! Response encoding.
//!
//! # Responsibilities
//! - Serialize status line, headers and body onto the connection
//! - Frame bodies of unknown length with chunked transfer-encoding
//! - Emit trailers after a chunked body
//!
//! # Design Decisions
//! - Calls append to the stream in the order they are made; the writer does
//!   not reorder or validate the sequence
//! - `finish` closes an unterminated trailer section so the wire format is
//!   always complete

use std::fmt;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{Headers, CRLF};

/// Numeric response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Reason phrase for the status line.
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            400 => "Bad Request",
            500 => "Internal Server Error",
            _ => "Unknown Status",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

/// Headers for a plain-text, fixed-length response on a closing connection.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Length", content_length.to_string());
    headers.insert("Content-Type", "text/plain");
    headers.insert("Connection", "close");
    headers
}

/// Response encoder bound to one output stream.
#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
    status: Option<StatusCode>,
    bytes_written: u64,
    /// Last-chunk marker written, trailer section not terminated yet.
    trailer_pending: bool,
}

impl<W> Writer<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: None,
            bytes_written: 0,
            trailer_pending: false,
        }
    }

    /// `HTTP/1.1 <code> <reason>\r\n`
    pub async fn write_status_line(&mut self, code: StatusCode) -> std::io::Result<()> {
        let line = format!("HTTP/1.1 {} {}\r\n", code.as_u16(), code.reason_phrase());
        self.write_raw(line.as_bytes()).await?;
        self.status = Some(code);
        Ok(())
    }

    /// Each entry as `<Key>: <Value>\r\n`, then the blank line.
    pub async fn write_headers(&mut self, headers: &Headers) -> std::io::Result<()> {
        self.write_field_lines(headers).await
    }

    /// Body bytes verbatim. Pair with a `Content-Length` header.
    pub async fn write_body(&mut self, body: &[u8]) -> std::io::Result<usize> {
        self.write_raw(body).await?;
        Ok(body.len())
    }

    /// One chunk: `<hex len>\r\n<bytes>\r\n`.
    ///
    /// An empty slice writes nothing, since a zero-length chunk ends the body.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> std::io::Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }
        let size_line = format!("{:x}\r\n", chunk.len());
        self.write_raw(size_line.as_bytes()).await?;
        self.write_raw(chunk).await?;
        self.write_raw(CRLF).await?;
        Ok(chunk.len())
    }

    /// The last-chunk marker `0\r\n`.
    ///
    /// Follow with [`write_trailers`](Self::write_trailers); [`finish`](Self::finish)
    /// terminates the trailer section if that never happens.
    pub async fn write_chunked_body_done(&mut self) -> std::io::Result<()> {
        self.write_raw(b"0\r\n").await?;
        self.trailer_pending = true;
        Ok(())
    }

    /// Trailer fields in header format, then the blank line ending the message.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> std::io::Result<()> {
        self.write_field_lines(trailers).await?;
        self.trailer_pending = false;
        Ok(())
    }

    /// Complete the message and flush it to the peer.
    pub async fn finish(&mut self) -> std::io::Result<()> {
        if self.trailer_pending {
            self.write_raw(CRLF).await?;
            self.trailer_pending = false;
        }
        self.inner.flush().await
    }

    /// Status of the last status line written, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    async fn write_field_lines(&mut self, fields: &Headers) -> std::io::Result<()> {
        let mut block = String::new();
        for (name, value) in fields.iter() {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str("\r\n");
        }
        block.push_str("\r\n");
        self.write_raw(block.as_bytes()).await
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(bytes).await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}
