//! Forwards `/httpbin/*` to an upstream and streams the answer back chunked.
//!
//! The total length and SHA-256 of the forwarded body are only known once the
//! upstream finishes, so they are sent as trailers.

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use crate::http::{default_headers, HandlerError, Headers, Request, StatusCode, Writer};

/// Target prefix routed to the proxy.
pub const PROXY_PREFIX: &str = "/httpbin/";

pub const TRAILER_SHA256: &str = "X-Content-Sha256";
pub const TRAILER_LENGTH: &str = "X-Content-Length";

/// Upstream URL for a proxied request target.
pub fn upstream_url(upstream: &str, target: &str) -> String {
    let rest = target.strip_prefix(PROXY_PREFIX).unwrap_or(target);
    format!("{}/{}", upstream.trim_end_matches('/'), rest)
}

fn proxy_headers() -> Headers {
    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.insert("Transfer-Encoding", "chunked");
    headers.insert("Trailer", format!("{TRAILER_SHA256}, {TRAILER_LENGTH}"));
    headers
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub async fn proxy<W>(
    w: &mut Writer<W>,
    req: &Request,
    client: &reqwest::Client,
    upstream: &str,
    chunk_size: usize,
) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let url = upstream_url(upstream, req.target());
    tracing::info!(url = %url, "Proxying request");

    let mut response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Upstream request failed");
            return Err(HandlerError::internal(format!("Error: {e}")));
        }
    };

    if response.status() != reqwest::StatusCode::OK {
        tracing::warn!(url = %url, status = %response.status(), "Upstream returned non-200");
        return Err(HandlerError::internal(format!("Error: {}", response.status())));
    }

    w.write_status_line(StatusCode::OK).await?;
    w.write_headers(&proxy_headers()).await?;

    let mut hasher = Sha256::new();
    let mut forwarded = 0usize;

    loop {
        let bytes = match response.chunk().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(url = %url, forwarded, error = %e, "Upstream body failed mid-stream");
                return Err(HandlerError::internal(format!("Error: {e}")));
            }
        };

        for piece in bytes.chunks(chunk_size.max(1)) {
            w.write_chunked_body(piece).await?;
        }
        hasher.update(&bytes);
        forwarded += bytes.len();
    }

    w.write_chunked_body_done().await?;

    let mut trailers = Headers::new();
    trailers.insert(TRAILER_SHA256, to_hex(&hasher.finalize()));
    trailers.insert(TRAILER_LENGTH, forwarded.to_string());
    w.write_trailers(&trailers).await?;

    tracing::debug!(url = %url, forwarded, "Proxy response complete");
    Ok(())
}
