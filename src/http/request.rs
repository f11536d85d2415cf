//! Incremental HTTP/1.1 request parser.
//!
//! # Responsibilities
//! - Parse the request line, header section and content-length body
//! - Accept input in fragments of any size, reporting zero progress when a
//!   fragment does not complete the current element
//! - Drive a byte stream through the parser until one request is complete
//!
//! # State Machine
//! ```text
//! Initialized ──request line──▶ ParsingHeaders ──blank line──▶ ParsingBody ──N bytes──▶ Done
//!                                              └──no content-length──────────────────────▶ Done
//! ```
//! States are never revisited; `Done` rejects further input.

use tokio::io::AsyncRead;

use crate::http::buffer::ReadBuffer;
use crate::http::error::{ParseError, RequestError};
use crate::http::headers::{find_crlf, Headers, CRLF};

/// The only version accepted on the request line.
const HTTP_VERSION: &str = "HTTP/1.1";
const VERSION_PREFIX: &str = "HTTP/";

/// First line of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    /// Version without the `HTTP/` prefix, always `1.1`.
    pub http_version: String,
}

impl RequestLine {
    /// Parse a request line from the front of `data`.
    ///
    /// `Ok(None)` means the line is not terminated yet.
    fn parse(data: &[u8]) -> Result<Option<(Self, usize)>, ParseError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok(None);
        };
        let line = std::str::from_utf8(&data[..line_end]).map_err(|_| ParseError::InvalidEncoding)?;

        let parts: Vec<&str> = line.split(' ').collect();
        let [method, target, version] = parts.as_slice() else {
            return Err(ParseError::MalformedRequestLine(line.to_string()));
        };

        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ParseError::InvalidMethod(method.to_string()));
        }
        if target.is_empty() {
            return Err(ParseError::MalformedRequestLine(line.to_string()));
        }
        if *version != HTTP_VERSION {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }
        let http_version = &version[VERSION_PREFIX.len()..];

        let request_line = Self {
            method: method.to_string(),
            target: target.to_string(),
            http_version: http_version.to_string(),
        };
        Ok(Some((request_line, line_end + CRLF.len())))
    }
}

/// Parser progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    Initialized,
    ParsingHeaders,
    /// Waiting for the rest of a body of `content_length` bytes.
    ParsingBody { content_length: usize },
    Done,
}

/// A request together with the parser state that builds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    state: ParseState,
}

impl Request {
    /// Create an empty request in the `Initialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// Advance the state machine by one step over `data`.
    ///
    /// Returns how many bytes of `data` were consumed. Zero with no state
    /// change means more input is needed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::Initialized => {
                let Some((request_line, consumed)) = RequestLine::parse(data)? else {
                    return Ok(0);
                };
                self.request_line = request_line;
                self.state = ParseState::ParsingHeaders;
                Ok(consumed)
            }
            ParseState::ParsingHeaders => self.parse_headers(data),
            ParseState::ParsingBody { content_length } => self.parse_body(data, content_length),
            ParseState::Done => Err(ParseError::AlreadyParsed),
        }
    }

    fn parse_headers(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;
        loop {
            let (n, done) = self.headers.parse(&data[consumed..])?;
            consumed += n;

            if done {
                consumed += CRLF.len();
                self.state = match self.headers.content_length()? {
                    Some(content_length) if content_length > 0 => ParseState::ParsingBody { content_length },
                    _ => ParseState::Done,
                };
                return Ok(consumed);
            }
            if n == 0 {
                return Ok(consumed);
            }
        }
    }

    fn parse_body(&mut self, data: &[u8], content_length: usize) -> Result<usize, ParseError> {
        let received = self.body.len() + data.len();
        if received > content_length {
            return Err(ParseError::BodyOverrun {
                declared: content_length,
                received,
            });
        }

        self.body.extend_from_slice(data);
        if self.body.len() == content_length {
            self.state = ParseState::Done;
        }
        Ok(data.len())
    }
}

/// Read one complete request from `reader`.
///
/// Reads into a [`ReadBuffer`] starting at `initial_capacity` bytes and feeds
/// the unconsumed region to the parser for as long as it makes progress.
///
/// Body bytes beyond `content-length` are only rejected when they arrive in
/// the same read as the end of the body; once the body is complete nothing
/// more is read from the stream.
pub async fn request_from_reader<R>(reader: &mut R, initial_capacity: usize) -> Result<Request, RequestError>
where
    R: AsyncRead + Unpin,
{
    let mut request = Request::new();
    let mut buffer = ReadBuffer::with_capacity(initial_capacity);

    while !request.is_done() {
        let read = buffer.read_from(reader).await?;

        loop {
            let before = request.state();
            let consumed = request.parse(buffer.unconsumed())?;
            buffer.consume(consumed);

            if request.is_done() || (consumed == 0 && request.state() == before) {
                break;
            }
        }

        if read == 0 && !request.is_done() {
            tracing::debug!(
                buffered = buffer.len(),
                state = ?request.state(),
                "Stream ended mid-request"
            );
            return Err(RequestError::UnexpectedEof);
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Hands out at most `chunk` bytes per read.
    struct ChunkReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ChunkReader {
        fn new(data: &[u8], chunk: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                chunk,
            }
        }
    }

    impl AsyncRead for ChunkReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            let end = (self.pos + self.chunk).min(self.data.len());
            let n = (end - self.pos).min(buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    /// Yields `data` once, then fails every read with `ConnectionReset`.
    struct ResetReader {
        data: Option<Vec<u8>>,
    }

    impl AsyncRead for ResetReader {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            match self.data.take() {
                Some(data) => {
                    buf.put_slice(&data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into())),
            }
        }
    }

    async fn parse_chunked(raw: &[u8], chunk: usize) -> Result<Request, RequestError> {
        let mut reader = ChunkReader::new(raw, chunk);
        request_from_reader(&mut reader, 8).await
    }

    #[tokio::test]
    async fn good_get_request_line() {
        let req = parse_chunked(
            b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n",
            3,
        )
        .await
        .unwrap();
        assert_eq!(req.request_line.method, "GET");
        assert_eq!(req.request_line.target, "/");
        assert_eq!(req.request_line.http_version, "1.1");
        assert!(req.is_done());
    }

    #[tokio::test]
    async fn good_get_request_line_with_path() {
        let req = parse_chunked(b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 1)
            .await
            .unwrap();
        assert_eq!(req.target(), "/coffee");
        assert_eq!(req.headers.get("host"), Some("localhost:42069"));
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn fragment_size_does_not_change_result() {
        let raw = b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nX-Tag: a\r\nx-tag: b\r\nContent-Length: 13\r\n\r\nhello world!\n";
        let whole = parse_chunked(raw, raw.len()).await.unwrap();
        for chunk in 1..=raw.len() {
            let fragmented = parse_chunked(raw, chunk).await.unwrap();
            assert_eq!(fragmented, whole, "chunk size {chunk}");
        }
        assert_eq!(whole.body, b"hello world!\n");
        assert_eq!(whole.headers.get("x-tag"), Some("a, b"));
    }

    #[tokio::test]
    async fn invalid_number_of_parts() {
        let err = parse_chunked(b"/coffee HTTP/1.1\r\nHost: localhost:42069\r\n\r\n", 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::MalformedRequestLine(_))));
    }

    #[tokio::test]
    async fn invalid_method_and_version() {
        let err = parse_chunked(b"get / HTTP/1.1\r\n\r\n", 64).await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::InvalidMethod(_))));

        let err = parse_chunked(b"GET / HTTP/1.0\r\n\r\n", 64).await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::UnsupportedVersion(_))));

        let err = parse_chunked(b"GET / HTTP/2\r\n\r\n", 64).await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::UnsupportedVersion(_))));
    }

    #[tokio::test]
    async fn double_space_is_malformed() {
        let err = parse_chunked(b"GET  / HTTP/1.1\r\n\r\n", 64).await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::MalformedRequestLine(_))));
    }

    #[tokio::test]
    async fn malformed_header() {
        let err = parse_chunked(b"GET / HTTP/1.1\r\nHost localhost:42069\r\n\r\n", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::MalformedHeader(_))));
    }

    #[tokio::test]
    async fn empty_headers() {
        let req = parse_chunked(b"GET / HTTP/1.1\r\n\r\n", 2).await.unwrap();
        assert!(req.headers.is_empty());
        assert!(req.is_done());
    }

    #[tokio::test]
    async fn missing_end_of_headers() {
        let err = parse_chunked(b"GET / HTTP/1.1\r\nHost: localhost:42069\r\n", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::UnexpectedEof));
    }

    #[tokio::test]
    async fn body_shorter_than_content_length() {
        let err = parse_chunked(
            b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 20\r\n\r\npartial content",
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RequestError::UnexpectedEof));
    }

    #[tokio::test]
    async fn body_longer_than_content_length() {
        let err = parse_chunked(
            b"POST /submit HTTP/1.1\r\nContent-Length: 4\r\n\r\nhello",
            1024,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            RequestError::Parse(ParseError::BodyOverrun { declared: 4, received: 5 })
        ));
    }

    #[tokio::test]
    async fn excess_body_after_completion_is_left_unread() {
        let req = parse_chunked(b"POST /submit HTTP/1.1\r\nContent-Length: 4\r\n\r\nhello", 1)
            .await
            .unwrap();
        assert!(req.is_done());
        assert_eq!(req.body, b"hell");
    }

    #[tokio::test]
    async fn read_error_is_propagated() {
        let mut reader = ResetReader {
            data: Some(b"GET / HTTP/1.1\r\nHo".to_vec()),
        };
        let err = request_from_reader(&mut reader, 64).await.unwrap_err();
        match err {
            RequestError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_content_length_completes_after_headers() {
        let req = parse_chunked(b"POST / HTTP/1.1\r\nContent-Length: 0\r\n\r\n", 7).await.unwrap();
        assert!(req.is_done());
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn invalid_content_length() {
        let err = parse_chunked(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n", 64)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Parse(ParseError::InvalidContentLength(_))));
    }

    #[test]
    fn steps_through_states() {
        let mut req = Request::new();
        assert_eq!(req.state(), ParseState::Initialized);

        assert_eq!(req.parse(b"GET / HTTP/1.1").unwrap(), 0);
        assert_eq!(req.state(), ParseState::Initialized);

        assert_eq!(req.parse(b"GET / HTTP/1.1\r\n").unwrap(), 16);
        assert_eq!(req.state(), ParseState::ParsingHeaders);

        assert_eq!(req.parse(b"Content-Length: 3\r\n").unwrap(), 19);
        assert_eq!(req.state(), ParseState::ParsingHeaders);

        assert_eq!(req.parse(b"\r\nab").unwrap(), 2);
        assert_eq!(req.state(), ParseState::ParsingBody { content_length: 3 });

        assert_eq!(req.parse(b"ab").unwrap(), 2);
        assert_eq!(req.state(), ParseState::ParsingBody { content_length: 3 });

        assert_eq!(req.parse(b"c").unwrap(), 1);
        assert_eq!(req.state(), ParseState::Done);
        assert_eq!(req.body, b"abc");

        assert_eq!(req.parse(b"x"), Err(ParseError::AlreadyParsed));
    }

    #[test]
    fn body_overrun_consumes_nothing() {
        let mut req = Request::new();
        req.parse(b"PUT /x HTTP/1.1\r\n").unwrap();
        req.parse(b"Content-Length: 2\r\n\r\n").unwrap();

        assert_eq!(
            req.parse(b"abc"),
            Err(ParseError::BodyOverrun { declared: 2, received: 3 })
        );
        assert!(req.body.is_empty());
        assert_eq!(req.parse(b"ab").unwrap(), 2);
        assert!(req.is_done());
    }
}
