//! Static HTML pages.

use tokio::io::AsyncWrite;

use crate::http::{default_headers, HandlerError, StatusCode, Writer};

const BAD_REQUEST_PAGE: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_ERROR_PAGE: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const SUCCESS_PAGE: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

/// Page body for a status code.
pub fn page_for(code: StatusCode) -> &'static str {
    match code {
        StatusCode::BAD_REQUEST => BAD_REQUEST_PAGE,
        StatusCode::INTERNAL_SERVER_ERROR => INTERNAL_ERROR_PAGE,
        _ => SUCCESS_PAGE,
    }
}

/// Write the page for `code` as a complete `text/html` response.
pub async fn serve_page<W>(w: &mut Writer<W>, code: StatusCode) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let body = page_for(code);
    let mut headers = default_headers(body.len());
    headers.insert("Content-Type", "text/html");

    w.write_status_line(code).await?;
    w.write_headers(&headers).await?;
    w.write_body(body.as_bytes()).await?;
    Ok(())
}
