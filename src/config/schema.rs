//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Request parsing settings.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Settings for the demo handlers.
    pub demo: DemoConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:42069").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:42069".to_string(),
        }
    }
}

/// Request parsing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Starting capacity of the per-connection read buffer, in bytes.
    /// The buffer doubles as needed.
    pub read_buffer_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: crate::http::buffer::DEFAULT_CAPACITY,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Demo handler configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// File served at `/video`.
    pub video_path: String,

    /// Base URL that `/httpbin/*` requests are forwarded to.
    pub proxy_upstream: String,

    /// Largest chunk written per upstream read, in bytes.
    pub proxy_chunk_size: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            video_path: "assets/vim.mp4".to_string(),
            proxy_upstream: "http://httpbin.org".to_string(),
            proxy_chunk_size: 1024,
        }
    }
}
