//! `[auth]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [auth]
//! enforce_acl = true
//! session_key = "<64 hex chars>"      # omit for a per-process random key
//! cookie_name = "Session"
//! session_lifetime = 86400            # seconds
//! secure_cookies = true
//! trust_proxy = false                 # read client certs from a proxy header
//! client_cert_header = "X-SSL-Client-Cert"
//! key_cache_ttl = 0                   # seconds, 0 = keep verified keys forever
//! profile_timeout = 10                # seconds per profile fetch
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};

/// Identity and access control settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is allowed.
    pub enforce_acl: bool,

    /// Hex-encoded 32-byte key sealing session cookies.
    pub session_key: Option<String>,

    pub cookie_name: String,

    /// Seconds a session cookie stays valid.
    pub session_lifetime: u64,

    /// Mark cookies `Secure`.
    pub secure_cookies: bool,

    /// Accept a client certificate forwarded by a TLS-terminating proxy.
    pub trust_proxy: bool,

    /// Header carrying the URL-escaped PEM client certificate.
    pub client_cert_header: String,

    /// Seconds a verified (WebID, key) pair is remembered; 0 never expires.
    pub key_cache_ttl: u64,

    /// Seconds to wait for a WebID profile document.
    pub profile_timeout: u64,
}

impl AuthConfig {
    pub const SESSION_KEY: FieldPath = FieldPath::new("auth.session_key");
    pub const COOKIE_NAME: FieldPath = FieldPath::new("auth.cookie_name");
    pub const ENFORCE_ACL: FieldPath = FieldPath::new("auth.enforce_acl");
    pub const CLIENT_CERT_HEADER: FieldPath = FieldPath::new("auth.client_cert_header");
    pub const PROFILE_TIMEOUT: FieldPath = FieldPath::new("auth.profile_timeout");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(key) = &self.session_key
            && (key.len() != 64 || hex::decode(key).is_err())
        {
            diag.error_with_hint(
                Self::SESSION_KEY,
                "expected 64 hex characters",
                "generate one with `openssl rand -hex 32`",
            );
        }

        let valid_token = |s: &str| {
            !s.is_empty()
                && s.bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        };
        if !valid_token(&self.cookie_name) {
            diag.error(Self::COOKIE_NAME, format!("invalid cookie name `{}`", self.cookie_name));
        }
        if self.trust_proxy && !valid_token(&self.client_cert_header) {
            diag.error(
                Self::CLIENT_CERT_HEADER,
                format!("invalid header name `{}`", self.client_cert_header),
            );
        }
        if self.profile_timeout == 0 {
            diag.error(Self::PROFILE_TIMEOUT, "must be greater than 0");
        }

        if !self.enforce_acl {
            diag.warn(Self::ENFORCE_ACL, "access control is disabled, every request is allowed");
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce_acl: true,
            session_key: None,
            cookie_name: "Session".to_string(),
            session_lifetime: 24 * 60 * 60,
            secure_cookies: true,
            trust_proxy: false,
            client_cert_header: "X-SSL-Client-Cert".to_string(),
            key_cache_ttl: 0,
            profile_timeout: 10,
        }
    }
}
