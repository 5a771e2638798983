//! WebID-RSA: signed-nonce authentication.
//!
//! The server hands out a nonce in a `WWW-Authenticate` challenge; the
//! client answers with
//!
//! ```text
//! Authorization: WebID-RSA source="https://example.org", username="<webid>",
//!                nonce="<nonce>", sig="<base64 signature>"
//! ```
//!
//! where `sig` is an RSA PKCS#1 v1.5 / SHA-1 signature over
//! `source + username + nonce`. The signature is checked against the RSA
//! keys the WebID profile declares. Nonces are stateless: an HMAC over the
//! issue time, valid for the session lifetime.

use super::session::unix_now;
use hmac::{Hmac, Mac};
use regex::Regex;
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::sync::LazyLock;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Scheme name in `Authorization` and `WWW-Authenticate`.
pub const SCHEME: &str = "WebID-RSA";

/// Parsed `Authorization: WebID-RSA ...` credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaCredentials {
    pub source: String,
    pub username: String,
    pub nonce: String,
    pub sig: String,
}

impl RsaCredentials {
    /// Parse an `Authorization` header; `None` for other schemes or missing fields.
    pub fn parse(header: &str) -> Option<Self> {
        static RE_PARAM: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"([A-Za-z0-9_]+)[ \t]*=[ \t]*"([^"]*)""#).unwrap());

        let (scheme, params) = header.trim().split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return None;
        }

        let (mut source, mut username, mut nonce, mut sig) = (None, None, None, None);
        for caps in RE_PARAM.captures_iter(params) {
            let value = caps[2].to_string();
            match &caps[1] {
                "source" => source = Some(value),
                "username" => username = Some(value),
                "nonce" => nonce = Some(value),
                "sig" => sig = Some(value),
                _ => {}
            }
        }

        Some(Self {
            source: source?,
            username: username?,
            nonce: nonce?,
            sig: sig?,
        })
    }

    /// The signed string.
    pub fn claim(&self) -> String {
        format!("{}{}{}", self.source, self.username, self.nonce)
    }

    /// Does the signature verify under the key given by profile literals?
    pub fn verify_with(&self, modulus_hex: &str, exponent: &str) -> bool {
        verify_signature(self.claim().as_bytes(), &self.sig, modulus_hex, exponent)
    }
}

/// Check a base64 PKCS#1 v1.5 / SHA-1 signature against an RSA key written
/// as a hex modulus and a decimal exponent.
pub fn verify_signature(message: &[u8], sig_b64: &str, modulus_hex: &str, exponent: &str) -> bool {
    use base64::{Engine, engine::general_purpose::STANDARD};

    let Ok(sig) = STANDARD.decode(sig_b64.trim()) else {
        return false;
    };
    let mut modulus: String = modulus_hex.chars().filter(|c| !c.is_whitespace()).collect();
    if modulus.len() % 2 == 1 {
        modulus.insert(0, '0');
    }
    let Ok(modulus) = hex::decode(&modulus) else {
        return false;
    };
    let Some(exponent) = BigUint::parse_bytes(exponent.trim().as_bytes(), 10) else {
        return false;
    };
    let Ok(key) = RsaPublicKey::new(BigUint::from_bytes_be(&modulus), exponent) else {
        return false;
    };

    let hashed = Sha1::digest(message);
    key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, &sig).is_ok()
}

/// Issues and checks stateless challenge nonces.
pub struct NonceIssuer {
    key: [u8; 32],
    lifetime: Duration,
}

impl NonceIssuer {
    pub fn new(key: [u8; 32], lifetime: Duration) -> Self {
        Self { key, lifetime }
    }

    pub fn issue(&self) -> String {
        self.issue_at(unix_now())
    }

    fn issue_at(&self, issued_at: u64) -> String {
        format!("{issued_at:x}-{}", hex::encode(self.tag(issued_at)))
    }

    /// Accept nonces this issuer produced that are not older than the lifetime.
    pub fn validate(&self, nonce: &str) -> bool {
        let Some((stamp, tag)) = nonce.split_once('-') else {
            return false;
        };
        let (Ok(issued_at), Ok(tag)) = (u64::from_str_radix(stamp, 16), hex::decode(tag)) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(&issued_at.to_be_bytes());
        if mac.verify_slice(&tag).is_err() {
            return false;
        }
        unix_now().saturating_sub(issued_at) <= self.lifetime.as_secs()
    }

    fn tag(&self, issued_at: u64) -> Vec<u8> {
        // HMAC accepts keys of any length
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => return Vec::new(),
        };
        mac.update(&issued_at.to_be_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// `WWW-Authenticate` value challenging a client to sign for `source`.
pub fn challenge(source: &str, nonce: &str) -> String {
    format!(r#"{SCHEME} source="{source}", nonce="{nonce}""#)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::cert::ClientCertificate;

    const ALICE: &str = "https://alice.example.org/profile#me";
    const ALICE_PEM: &str = include_str!("testdata/alice.pem");
    const ALICE_SIG: &str = include_str!("testdata/alice.sig");

    fn alice_header(nonce: &str) -> String {
        format!(
            r#"WebID-RSA source="https://example.org", username="{ALICE}", nonce="{nonce}", sig="{}""#,
            ALICE_SIG.trim()
        )
    }

    #[test]
    fn test_parse_authorization() {
        let creds = RsaCredentials::parse(&alice_header("test-nonce")).unwrap();
        assert_eq!(creds.source, "https://example.org");
        assert_eq!(creds.username, ALICE);
        assert_eq!(creds.nonce, "test-nonce");
        assert_eq!(
            creds.claim(),
            "https://example.orghttps://alice.example.org/profile#metest-nonce"
        );
    }

    #[test]
    fn test_parse_spaced_parameters() {
        let creds = RsaCredentials::parse(
            "WebID-RSA source = \"s\",username=\"u\",\tnonce =\"n\", sig= \"x\"",
        )
        .unwrap();
        assert_eq!(creds.claim(), "sun");
        assert_eq!(creds.sig, "x");
    }

    #[test]
    fn test_parse_rejects_other_schemes_and_missing_fields() {
        assert!(RsaCredentials::parse("Bearer abc").is_none());
        assert!(RsaCredentials::parse(r#"WebID-RSA source="a", username="b""#).is_none());
        assert!(RsaCredentials::parse("WebID-RSA").is_none());
    }

    #[test]
    fn test_signature_verifies_with_profile_key() {
        let key = ClientCertificate::from_pem(ALICE_PEM).unwrap().key;
        let creds = RsaCredentials::parse(&alice_header("test-nonce")).unwrap();
        assert!(creds.verify_with(&key.modulus.to_uppercase(), &key.exponent));
    }

    #[test]
    fn test_signature_bound_to_claim() {
        let key = ClientCertificate::from_pem(ALICE_PEM).unwrap().key;
        let creds = RsaCredentials::parse(&alice_header("other-nonce")).unwrap();
        assert!(!creds.verify_with(&key.modulus, &key.exponent));
    }

    #[test]
    fn test_garbage_keys_and_signatures() {
        assert!(!verify_signature(b"m", "not base64!", "abcd", "65537"));
        assert!(!verify_signature(b"m", "AAAA", "zz", "65537"));
        assert!(!verify_signature(b"m", "AAAA", "abcd", "e"));
    }

    #[test]
    fn test_nonce_round_trip() {
        let issuer = NonceIssuer::new([3; 32], Duration::from_secs(60));
        let nonce = issuer.issue();
        assert!(issuer.validate(&nonce));
        assert!(!NonceIssuer::new([4; 32], Duration::from_secs(60)).validate(&nonce));
        assert!(!issuer.validate("test-nonce"));
        assert!(!issuer.validate(""));
    }

    #[test]
    fn test_expired_nonce() {
        let issuer = NonceIssuer::new([3; 32], Duration::from_secs(60));
        let nonce = issuer.issue_at(unix_now() - 120);
        assert!(!issuer.validate(&nonce));
    }

    #[test]
    fn test_challenge_header() {
        assert_eq!(
            challenge("https://example.org", "n1"),
            r#"WebID-RSA source="https://example.org", nonce="n1""#
        );
    }
}
