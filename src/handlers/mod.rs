//! Demo request handlers.
//!
//! # Routes
//! ```text
//! /video         → video.rs (file as video/mp4)
//! /httpbin/*     → proxy.rs (chunked upstream relay with trailers)
//! /yourproblem   → 400 page
//! /myproblem     → 500 page
//! anything else  → 200 page
//! ```

pub mod pages;
pub mod proxy;
pub mod video;

use std::path::Path;

use tokio::io::AsyncWrite;

use crate::config::DemoConfig;
use crate::http::{Handler, HandlerError, Request, StatusCode, Writer};

/// Routes requests to the demo responders.
#[derive(Debug, Clone)]
pub struct DemoHandler {
    config: DemoConfig,
    client: reqwest::Client,
}

impl DemoHandler {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

impl Handler for DemoHandler {
    async fn handle<W>(&self, w: &mut Writer<W>, req: &Request) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match req.target() {
            "/video" => video::serve_video(w, Path::new(&self.config.video_path)).await,
            target if target.starts_with(proxy::PROXY_PREFIX) => {
                proxy::proxy(
                    w,
                    req,
                    &self.client,
                    &self.config.proxy_upstream,
                    self.config.proxy_chunk_size,
                )
                .await
            }
            "/yourproblem" => pages::serve_page(w, StatusCode::BAD_REQUEST).await,
            "/myproblem" => pages::serve_page(w, StatusCode::INTERNAL_SERVER_ERROR).await,
            _ => pages::serve_page(w, StatusCode::OK).await,
        }
    }
}
