//! Session cookies.
//!
//! A cookie value is `base64url(nonce || AES-256-GCM(json{webid, issued_at}))`.
//! The key comes from `auth.session_key`, or is drawn at startup so that
//! sessions die with the process.

use super::IdentityError;
use crate::config::AuthConfig;
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

const NONCE_LEN: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    webid: String,
    issued_at: u64,
}

pub struct SessionCodec {
    key: [u8; 32],
    cookie_name: String,
    lifetime: Duration,
    secure: bool,
}

impl SessionCodec {
    pub fn new(key: [u8; 32], cookie_name: &str, lifetime: Duration, secure: bool) -> Self {
        Self {
            key,
            cookie_name: cookie_name.to_string(),
            lifetime,
            secure,
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Result<Self, IdentityError> {
        let key = match &auth.session_key {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key)
                    .map_err(|e| IdentityError::Session(format!("bad session key: {e}")))?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| IdentityError::Session("session key must be 32 bytes".into()))?
            }
            None => {
                let mut key = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                key
            }
        };
        Ok(Self::new(
            key,
            &auth.cookie_name,
            Duration::from_secs(auth.session_lifetime),
            auth.secure_cookies,
        ))
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Seal `webid` into a cookie value issued now.
    pub fn seal(&self, webid: &str) -> Result<String, IdentityError> {
        self.seal_at(webid, unix_now())
    }

    fn seal_at(&self, webid: &str, issued_at: u64) -> Result<String, IdentityError> {
        let claims = SessionClaims {
            webid: webid.to_string(),
            issued_at,
        };
        let plaintext = serde_json::to_vec(&claims)
            .map_err(|e| IdentityError::Session(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| IdentityError::Session(format!("failed to create cipher: {e}")))?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| IdentityError::Session(format!("encryption failed: {e}")))?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Recover the WebID from a cookie value, rejecting tampered or expired ones.
    pub fn open(&self, value: &str) -> Result<String, IdentityError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(value.trim())
            .map_err(|e| IdentityError::Session(format!("bad encoding: {e}")))?;
        if sealed.len() <= NONCE_LEN {
            return Err(IdentityError::Session("cookie too short".into()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce_bytes: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| IdentityError::Session("invalid nonce length".into()))?;

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| IdentityError::Session(format!("failed to create cipher: {e}")))?;
        let plaintext = cipher
            .decrypt(&Nonce::from(nonce_bytes), ciphertext)
            .map_err(|_| IdentityError::Session("cookie failed authentication".into()))?;
        let claims: SessionClaims = serde_json::from_slice(&plaintext)
            .map_err(|e| IdentityError::Session(e.to_string()))?;

        let age = unix_now().saturating_sub(claims.issued_at);
        if age > self.lifetime.as_secs() {
            return Err(IdentityError::Session("session expired".into()));
        }
        Ok(claims.webid)
    }

    /// `Set-Cookie` header value for a fresh session of `webid`.
    pub fn set_cookie(&self, webid: &str) -> Result<String, IdentityError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name,
            self.seal(webid)?,
            self.lifetime.as_secs()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(cookie)
    }

    /// Pick this server's cookie out of a `Cookie` request header.
    pub fn find_cookie<'a>(&self, header: &'a str) -> Option<&'a str> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == self.cookie_name).then_some(value)
        })
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
