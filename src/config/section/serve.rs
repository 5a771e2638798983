//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 8443                 # HTTP port number
//! workers = 8                 # Request worker threads
//! scheme = "https"            # Scheme of the URIs clients use
//! max_body_bytes = 33554432   # Largest accepted request body
//! ```
//!
//! `scheme` is the scheme clients see. When a TLS-terminating proxy sits
//! in front, set it to `https` so resource URIs match what was signed.

use std::net::{IpAddr, Ipv4Addr};

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Size of the request worker pool.
    pub workers: usize,

    /// `http` or `https`.
    pub scheme: String,

    /// Requests with larger bodies are rejected with 413.
    pub max_body_bytes: u64,
}

impl ServeConfig {
    pub const WORKERS: FieldPath = FieldPath::new("serve.workers");
    pub const SCHEME: FieldPath = FieldPath::new("serve.scheme");
    pub const MAX_BODY_BYTES: FieldPath = FieldPath::new("serve.max_body_bytes");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error(Self::WORKERS, "must be at least 1");
        }
        if self.scheme != "http" && self.scheme != "https" {
            diag.error_with_hint(
                Self::SCHEME,
                format!("unsupported scheme `{}`", self.scheme),
                "use \"http\" or \"https\"",
            );
        }
        if self.max_body_bytes == 0 {
            diag.error(Self::MAX_BODY_BYTES, "must be greater than 0");
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8443,
            workers: 8,
            scheme: "http".to_string(),
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}
