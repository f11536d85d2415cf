//! Connection server.
//!
//! # Responsibilities
//! - Bind the listener and run the accept loop in its own task
//! - Give every connection its own task: parse one request, call the handler,
//!   finish the response, close
//! - Answer unparsable requests with `400 Bad Request`
//! - Stop accepting when the handle is closed
//!
//! # Design Decisions
//! - The closed flag lives in a [`Shutdown`] owned by this server instance
//! - Closing the handle never interrupts connections already accepted
//! - Handler errors are logged, never retried

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::{HttpConfig, ServerConfig};
use crate::http::error::{HandlerError, RequestError};
use crate::http::request::{request_from_reader, Request};
use crate::http::response::{default_headers, StatusCode, Writer};
use crate::lifecycle::Shutdown;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;

/// Upper bound on draining a connection after the response is sent.
const LINGER: Duration = Duration::from_millis(500);

/// Pause before retrying after a failed accept (e.g. out of descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Application callback invoked once per parsed request.
///
/// The writer is bound to the connection; anything written before the
/// handler returns reaches the peer. Return an error to have it logged and,
/// when nothing was written yet, sent as a plain-text response.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(&self, w: &mut Writer<W>, req: &Request) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// Error type for server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Control surface for a running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<Shutdown>,
    connections: ConnectionTracker,
    accept_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections. Idempotent.
    pub fn close(&self) {
        if self.shutdown.trigger() {
            tracing::info!(address = %self.local_addr, "Server closing");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Connections accepted and not yet finished.
    pub fn active_connections(&self) -> u64 {
        self.connections.active_count()
    }

    /// Wait for the accept loop to exit, then for accepted connections to finish.
    pub async fn wait(mut self) {
        if let Err(e) = (&mut self.accept_task).await {
            tracing::error!(error = %e, "Accept loop panicked");
        }
        self.connections.wait_idle().await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Bind `config.listener` and start serving `handler`.
pub async fn serve<H>(config: &ServerConfig, handler: H) -> Result<ServerHandle, ServerError>
where
    H: Handler,
{
    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr()?;

    let shutdown = Arc::new(Shutdown::new());
    let connections = ConnectionTracker::new();

    let accept_task = tokio::spawn(accept_loop(
        listener,
        Arc::new(handler),
        config.http.clone(),
        Arc::clone(&shutdown),
        connections.clone(),
    ));

    tracing::info!(address = %local_addr, "HTTP server started");

    Ok(ServerHandle {
        local_addr,
        shutdown,
        connections,
        accept_task,
    })
}

async fn accept_loop<H>(
    listener: Listener,
    handler: Arc<H>,
    http: HttpConfig,
    shutdown: Arc<Shutdown>,
    connections: ConnectionTracker,
) where
    H: Handler,
{
    loop {
        if shutdown.is_closed() {
            break;
        }

        let accepted = tokio::select! {
            _ = shutdown.closed() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                let guard = connections.track();
                metrics::record_connection();
                tracing::debug!(connection_id = %guard.id(), peer_addr = %peer_addr, "Serving connection");

                let handler = Arc::clone(&handler);
                let read_buffer_size = http.read_buffer_size;
                tokio::spawn(async move {
                    serve_connection(stream, handler.as_ref(), read_buffer_size, guard).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                if !backoff(&shutdown).await {
                    break;
                }
            }
        }
    }

    tracing::info!("Server is closed, stopping listener");
}

/// Sleep for [`ACCEPT_BACKOFF`]. Returns `false` if the server closed meanwhile.
async fn backoff(shutdown: &Shutdown) -> bool {
    tokio::select! {
        _ = shutdown.closed() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => !shutdown.is_closed(),
    }
}

async fn serve_connection<H>(mut stream: TcpStream, handler: &H, read_buffer_size: usize, guard: ConnectionGuard)
where
    H: Handler,
{
    let connection_id = guard.id();
    let (mut reader, writer) = stream.split();
    let mut writer = Writer::new(BufWriter::new(writer));

    if let Err(e) = handle_stream(&mut reader, &mut writer, handler, read_buffer_size).await {
        tracing::warn!(connection_id = %connection_id, error = %e, "Connection aborted");
    }
    drop(writer);

    if let Err(e) = stream.shutdown().await {
        tracing::trace!(connection_id = %connection_id, error = %e, "Socket shutdown failed");
        return;
    }
    linger(&mut stream).await;
}

/// Discard what the peer still sends until it closes or [`LINGER`] passes.
///
/// Closing a socket with unread input makes the kernel send RST, which can
/// destroy a response the peer has not read yet.
async fn linger(stream: &mut TcpStream) {
    let mut scratch = [0u8; 1024];
    let drain = async {
        loop {
            match stream.read(&mut scratch).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    let _ = tokio::time::timeout(LINGER, drain).await;
}

/// Read one request from `reader`, dispatch it, and finish the response.
///
/// Transport-independent so any byte stream pair can be served.
pub async fn handle_stream<R, W, H>(
    reader: &mut R,
    writer: &mut Writer<W>,
    handler: &H,
    read_buffer_size: usize,
) -> Result<(), std::io::Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
    H: Handler,
{
    let start = Instant::now();

    let request = match request_from_reader(reader, read_buffer_size).await {
        Ok(request) => request,
        Err(RequestError::Parse(e)) => {
            metrics::record_parse_error();
            tracing::warn!(error = %e, "Rejecting malformed request");
            write_error(writer, StatusCode::BAD_REQUEST, &e.to_string()).await?;
            return writer.finish().await;
        }
        Err(RequestError::UnexpectedEof) => {
            tracing::debug!("Peer closed before sending a complete request");
            return Ok(());
        }
        Err(RequestError::Io(e)) => return Err(e),
    };

    tracing::info!(
        method = %request.method(),
        target = %request.target(),
        body_len = request.body.len(),
        "Request parsed"
    );

    if let Err(e) = handler.handle(writer, &request).await {
        tracing::warn!(
            method = %request.method(),
            target = %request.target(),
            error = %e,
            "Handler returned an error"
        );
        if writer.bytes_written() == 0 {
            write_error(writer, e.code, &e.message).await?;
        }
    }

    writer.finish().await?;

    let status = writer.status().map_or(0, |s| s.as_u16());
    metrics::record_request(request.method(), status, start);
    Ok(())
}

async fn write_error<W>(writer: &mut Writer<W>, code: StatusCode, message: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_status_line(code).await?;
    writer.write_headers(&default_headers(message.len())).await?;
    writer.write_body(message.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::Headers;

    struct Hello;

    impl Handler for Hello {
        async fn handle<W>(&self, w: &mut Writer<W>, req: &Request) -> Result<(), HandlerError>
        where
            W: AsyncWrite + Unpin + Send,
        {
            let body = format!("{} {}", req.method(), req.target());
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&default_headers(body.len())).await?;
            w.write_body(body.as_bytes()).await?;
            Ok(())
        }
    }

    struct Failing;

    impl Handler for Failing {
        async fn handle<W>(&self, _w: &mut Writer<W>, _req: &Request) -> Result<(), HandlerError>
        where
            W: AsyncWrite + Unpin + Send,
        {
            Err(HandlerError::internal("boom"))
        }
    }

    struct Chunked;

    impl Handler for Chunked {
        async fn handle<W>(&self, w: &mut Writer<W>, _req: &Request) -> Result<(), HandlerError>
        where
            W: AsyncWrite + Unpin + Send,
        {
            let mut headers = Headers::new();
            headers.insert("Transfer-Encoding", "chunked");
            w.write_status_line(StatusCode::OK).await?;
            w.write_headers(&headers).await?;
            w.write_chunked_body(b"abc").await?;
            w.write_chunked_body_done().await?;
            Ok(())
        }
    }

    /// Fails every read with `ConnectionReset`.
    struct ResetReader;

    impl AsyncRead for ResetReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
    }

    async fn run<H: Handler>(handler: H, raw: &[u8]) -> String {
        let mut reader = raw;
        let mut writer = Writer::new(Vec::new());
        handle_stream(&mut reader, &mut writer, &handler, 8).await.unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn dispatches_parsed_request() {
        let wire = run(Hello, b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").await;
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.ends_with("\r\n\r\nGET /hello"));
    }

    #[tokio::test]
    async fn malformed_request_gets_400() {
        let wire = run(Hello, b"GET /hello HTTP/1.0\r\n\r\n").await;
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.contains("unsupported HTTP version"));
    }

    #[tokio::test]
    async fn incomplete_request_gets_no_response() {
        let wire = run(Hello, b"GET /hello HTTP/1.1\r\nHost").await;
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn handler_error_becomes_response() {
        let wire = run(Failing, b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(
            wire,
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\nboom"
        );
    }

    #[tokio::test]
    async fn chunked_body_is_terminated() {
        let wire = run(Chunked, b"GET / HTTP/1.1\r\n\r\n").await;
        assert!(wire.ends_with("\r\n\r\n3\r\nabc\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn read_error_aborts_without_response() {
        let mut writer = Writer::new(Vec::new());
        let err = handle_stream(&mut ResetReader, &mut writer, &Hello, 8).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(writer.bytes_written(), 0);
        assert!(writer.into_inner().is_empty());
    }

    #[tokio::test]
    async fn accept_backoff_pauses() {
        let shutdown = Shutdown::new();
        let start = Instant::now();
        assert!(backoff(&shutdown).await);
        assert!(start.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn accept_backoff_ends_on_close() {
        let shutdown = Arc::new(Shutdown::new());
        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move { backoff(&shutdown).await })
        };
        shutdown.trigger();
        let resumed = tokio::time::timeout(ACCEPT_BACKOFF * 5, waiter)
            .await
            .expect("backoff should end")
            .unwrap();
        assert!(!resumed);
    }
}
