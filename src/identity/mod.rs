//! Caller identity resolution.
//!
//! Precedence, first hit wins:
//!
//! 1. a valid session cookie
//! 2. WebID-TLS: the client certificate's claimed WebID, confirmed by the
//!    key cache or by the profile document
//! 3. WebID-RSA: a signed server nonce in `Authorization`
//! 4. `dns:<remote ip>`
//!
//! Steps 2 and 3 may fetch a profile over the network. Callers resolve the
//! identity before taking any resource lock.

pub mod cache;
pub mod cert;
pub mod rsa_auth;
pub mod session;
pub mod webid;

use crate::config::AuthConfig;
use crate::graph::GraphError;
use crate::{debug, log};
use cache::{KeyCache, KeyCachePolicy};
use cert::ClientCertificate;
use rand::RngCore;
use rsa_auth::{NonceIssuer, RsaCredentials};
use session::SessionCodec;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use webid::{HttpProfileFetcher, ProfileFetcher};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid client certificate: {0}")]
    Certificate(String),

    #[error("client certificate key is not RSA")]
    UnsupportedKey,

    #[error("failed to fetch profile `{uri}`: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("invalid profile document: {0}")]
    Profile(#[source] GraphError),

    #[error("session cookie rejected: {0}")]
    Session(String),
}

/// How the caller proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Session,
    WebIdTls,
    WebIdRsa,
    Anonymous,
}

/// The resolved caller: a WebID, or `dns:<ip>` for anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    uri: String,
    method: AuthMethod,
}

impl Identity {
    pub fn webid(uri: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            uri: uri.into(),
            method,
        }
    }

    pub fn anonymous(addr: IpAddr) -> Self {
        Self {
            uri: format!("dns:{addr}"),
            method: AuthMethod::Anonymous,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    #[cfg(test)]
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn is_anonymous(&self) -> bool {
        self.method == AuthMethod::Anonymous
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Everything in a request that can carry a credential.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    /// Raw `Cookie` header.
    pub cookie: Option<&'a str>,
    /// DER-encoded client certificate.
    pub peer_cert: Option<&'a [u8]>,
    /// Raw `Authorization` header.
    pub authorization: Option<&'a str>,
    pub remote_addr: IpAddr,
    /// `scheme://authority` of the request, the expected WebID-RSA `source`.
    pub base_uri: &'a str,
}

/// Result of resolution: the identity plus a cookie to hand out, if any.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub identity: Identity,
    pub set_cookie: Option<String>,
}

/// Owns the session codec, nonce issuer, key cache and profile fetcher.
pub struct IdentityResolver {
    sessions: SessionCodec,
    nonces: NonceIssuer,
    keys: KeyCache,
    fetcher: Box<dyn ProfileFetcher>,
}

impl IdentityResolver {
    pub fn new(auth: &AuthConfig) -> Result<Self, IdentityError> {
        let fetcher = HttpProfileFetcher::new(Duration::from_secs(auth.profile_timeout))?;
        Self::with_fetcher(auth, Box::new(fetcher))
    }

    pub fn with_fetcher(
        auth: &AuthConfig,
        fetcher: Box<dyn ProfileFetcher>,
    ) -> Result<Self, IdentityError> {
        let sessions = SessionCodec::from_config(auth)?;
        let mut nonce_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce_key);

        Ok(Self {
            nonces: NonceIssuer::new(nonce_key, sessions.lifetime()),
            sessions,
            keys: KeyCache::new(KeyCachePolicy::from_secs(auth.key_cache_ttl)),
            fetcher,
        })
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    #[cfg(test)]
    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    /// Resolve the caller. Never fails: every failed proof falls through to
    /// the next method and finally to the anonymous identity.
    pub fn resolve(&self, creds: &Credentials<'_>) -> Resolution {
        if let Some(identity) = self.from_cookie(creds) {
            return Resolution {
                identity,
                set_cookie: None,
            };
        }

        let proven = self
            .from_certificate(creds)
            .or_else(|| self.from_signature(creds));
        if let Some(identity) = proven {
            let set_cookie = match self.sessions.set_cookie(identity.as_str()) {
                Ok(cookie) => Some(cookie),
                Err(e) => {
                    log!("auth"; "could not issue session for {}: {}", identity, e);
                    None
                }
            };
            return Resolution {
                identity,
                set_cookie,
            };
        }

        Resolution {
            identity: Identity::anonymous(creds.remote_addr),
            set_cookie: None,
        }
    }

    /// `WWW-Authenticate` value for a 401 response.
    pub fn challenge(&self, base_uri: &str) -> String {
        rsa_auth::challenge(base_uri, &self.nonces.issue())
    }

    fn from_cookie(&self, creds: &Credentials<'_>) -> Option<Identity> {
        let value = self.sessions.find_cookie(creds.cookie?)?;
        match self.sessions.open(value) {
            Ok(webid) => Some(Identity::webid(webid, AuthMethod::Session)),
            Err(e) => {
                debug!("auth"; "{}", e);
                None
            }
        }
    }

    fn from_certificate(&self, creds: &Credentials<'_>) -> Option<Identity> {
        let cert = match ClientCertificate::from_der(creds.peer_cert?) {
            Ok(cert) => cert,
            Err(e) => {
                debug!("webid"; "{}", e);
                return None;
            }
        };
        let claimed = cert.claimed_webid()?;

        if let Some(webid) = self.keys.get(&cert.key)
            && webid == claimed
        {
            debug!("webid"; "key cache hit for {}", webid);
            return Some(Identity::webid(webid, AuthMethod::WebIdTls));
        }

        let profile = match self.fetcher.fetch(claimed) {
            Ok(profile) => profile,
            Err(e) => {
                log!("webid"; "{}", e);
                return None;
            }
        };
        if !webid::profile_has_key(&profile, claimed, &cert.key) {
            debug!("webid"; "profile of {} does not hold the certificate key", claimed);
            return None;
        }

        self.keys.insert(cert.key.clone(), claimed);
        debug!("webid"; "verified {}", claimed);
        Some(Identity::webid(claimed, AuthMethod::WebIdTls))
    }

    fn from_signature(&self, creds: &Credentials<'_>) -> Option<Identity> {
        let rsa = RsaCredentials::parse(creds.authorization?)?;
        if rsa.source.trim_end_matches('/') != creds.base_uri.trim_end_matches('/') {
            debug!("auth"; "WebID-RSA source {} does not match {}", rsa.source, creds.base_uri);
            return None;
        }
        if !self.nonces.validate(&rsa.nonce) {
            debug!("auth"; "stale or foreign WebID-RSA nonce from {}", rsa.username);
            return None;
        }

        let profile = match self.fetcher.fetch(&rsa.username) {
            Ok(profile) => profile,
            Err(e) => {
                log!("webid"; "{}", e);
                return None;
            }
        };
        let verified = webid::profile_keys(&profile, &rsa.username)
            .iter()
            .any(|(modulus, exponent)| rsa.verify_with(modulus, exponent));
        if !verified {
            debug!("auth"; "WebID-RSA signature from {} did not verify", rsa.username);
            return None;
        }
        Some(Identity::webid(rsa.username, AuthMethod::WebIdRsa))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::Graph;
    use parking_lot::Mutex;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use x509_parser::pem::parse_x509_pem;

    pub const ALICE: &str = "https://alice.example.org/profile#me";
    pub const ALICE_PEM: &str = include_str!("testdata/alice.pem");
    const ALICE_PROFILE: &str = include_str!("testdata/alice-profile.ttl");
    const ALICE_SIG: &str = include_str!("testdata/alice.sig");

    /// Serves canned profiles and counts fetches.
    #[derive(Clone, Default)]
    pub struct StaticFetcher {
        profiles: Vec<(String, String)>,
        pub fetches: Arc<Mutex<Vec<String>>>,
    }

    impl StaticFetcher {
        pub fn alice() -> Self {
            Self {
                profiles: vec![(
                    "https://alice.example.org/profile".to_string(),
                    ALICE_PROFILE.to_string(),
                )],
                fetches: Arc::default(),
            }
        }
    }

    impl ProfileFetcher for StaticFetcher {
        fn fetch(&self, webid: &str) -> Result<Graph, IdentityError> {
            let document = webid::document_uri(webid);
            self.fetches.lock().push(document.to_string());
            let (_, body) = self
                .profiles
                .iter()
                .find(|(uri, _)| uri == document)
                .ok_or_else(|| IdentityError::Fetch {
                    uri: document.to_string(),
                    reason: "HTTP 404 Not Found".to_string(),
                })?;
            Graph::parse(body.as_bytes(), "text/turtle", document).map_err(IdentityError::Profile)
        }
    }

    pub fn alice_der() -> Vec<u8> {
        parse_x509_pem(ALICE_PEM.as_bytes()).unwrap().1.contents
    }

    fn resolver(fetcher: StaticFetcher) -> IdentityResolver {
        IdentityResolver::with_fetcher(&AuthConfig::default(), Box::new(fetcher)).unwrap()
    }

    fn creds<'a>() -> Credentials<'a> {
        Credentials {
            cookie: None,
            peer_cert: None,
            authorization: None,
            remote_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)),
            base_uri: "https://example.org",
        }
    }

    #[test]
    fn test_anonymous_fallback() {
        let resolution = resolver(StaticFetcher::default()).resolve(&creds());
        assert_eq!(resolution.identity.as_str(), "dns:10.0.0.7");
        assert!(resolution.identity.is_anonymous());
        assert!(resolution.set_cookie.is_none());
    }

    #[test]
    fn test_webid_tls_issues_cookie_and_caches_key() {
        let fetcher = StaticFetcher::alice();
        let fetches = Arc::clone(&fetcher.fetches);
        let resolver = resolver(fetcher);
        let der = alice_der();
        let creds = Credentials {
            peer_cert: Some(&der),
            ..creds()
        };

        let first = resolver.resolve(&creds);
        assert_eq!(first.identity.as_str(), ALICE);
        assert_eq!(first.identity.method(), AuthMethod::WebIdTls);
        assert!(first.set_cookie.is_some());
        assert_eq!(resolver.key_cache().len(), 1);

        let second = resolver.resolve(&creds);
        assert_eq!(second.identity.as_str(), ALICE);
        assert_eq!(fetches.lock().len(), 1);
    }

    #[test]
    fn test_session_cookie_wins() {
        let resolver = resolver(StaticFetcher::default());
        let value = resolver.sessions().seal(ALICE).unwrap();
        let header = format!("theme=dark; Session={value}");
        let resolution = resolver.resolve(&Credentials {
            cookie: Some(&header),
            ..creds()
        });
        assert_eq!(resolution.identity.as_str(), ALICE);
        assert_eq!(resolution.identity.method(), AuthMethod::Session);
        assert!(resolution.set_cookie.is_none());
    }

    #[test]
    fn test_bad_cookie_falls_through() {
        let resolver = resolver(StaticFetcher::default());
        let resolution = resolver.resolve(&Credentials {
            cookie: Some("Session=forged"),
            ..creds()
        });
        assert!(resolution.identity.is_anonymous());
    }

    #[test]
    fn test_unreachable_profile_is_anonymous() {
        let resolver = resolver(StaticFetcher::default());
        let der = alice_der();
        let resolution = resolver.resolve(&Credentials {
            peer_cert: Some(&der),
            ..creds()
        });
        assert!(resolution.identity.is_anonymous());
        assert!(resolver.key_cache().is_empty());
    }

    #[test]
    fn test_webid_rsa_requires_issued_nonce() {
        let resolver = resolver(StaticFetcher::alice());
        let header = format!(
            r#"WebID-RSA source="https://example.org", username="{ALICE}", nonce="test-nonce", sig="{}""#,
            ALICE_SIG.trim()
        );
        let resolution = resolver.resolve(&Credentials {
            authorization: Some(&header),
            ..creds()
        });
        assert!(resolution.identity.is_anonymous());
    }

    #[test]
    fn test_challenge_carries_fresh_nonce() {
        let resolver = resolver(StaticFetcher::default());
        let challenge = resolver.challenge("https://example.org");
        assert!(challenge.starts_with(r#"WebID-RSA source="https://example.org", nonce=""#));
        let nonce = challenge
            .rsplit("nonce=\"")
            .next()
            .unwrap()
            .trim_end_matches('"');
        assert!(resolver.nonces.validate(nonce));
    }
}
