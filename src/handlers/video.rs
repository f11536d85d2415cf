//! Serves a single file as `video/mp4`.

use std::path::Path;

use tokio::io::AsyncWrite;

use crate::http::{default_headers, HandlerError, StatusCode, Writer};

pub async fn serve_video<W>(w: &mut Writer<W>, path: &Path) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let body = match tokio::fs::read(path).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error reading video file");
            return Err(HandlerError::internal(format!("Error: {e}")));
        }
    };

    let mut headers = default_headers(body.len());
    headers.insert("Content-Type", "video/mp4");

    w.write_status_line(StatusCode::OK).await?;
    w.write_headers(&headers).await?;
    w.write_body(&body).await?;
    Ok(())
}
