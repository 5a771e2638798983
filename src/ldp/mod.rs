//! Linked Data Platform request dispatcher.
//!
//! Every request goes through the same steps:
//!
//! ```text
//! identity -> address -> Accept -> lock(path) -> WAC -> verb -> unlock
//! ```
//!
//! Identity resolution may fetch a WebID profile over the network, so it
//! always happens before the resource lock is taken. Every error becomes a
//! single status with a short plain-text body.

mod error;
mod etag;
mod headers;
mod message;
mod patch;
mod post;
mod read;
mod store;
mod write;


pub use error::LdpError;
pub use message::{HttpRequest, Reply};

use crate::address::{self, ResourceAddress};
use crate::config::{ServerConfig, StorageConfig};
use crate::gate::LockRegistry;
use crate::identity::{Credentials, Identity, IdentityError, IdentityResolver};
use crate::log;
use crate::negotiate;
use crate::wac::{Authorizer, Mode};
use url::Url;

/// HTTP verbs the server implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Head,
    Put,
    Post,
    Patch,
    Delete,
    Mkcol,
    Options,
}

impl Verb {
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "PUT" => Some(Self::Put),
            "POST" => Some(Self::Post),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "MKCOL" => Some(Self::Mkcol),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Access mode the verb needs; `None` for verbs that skip access control.
    ///
    /// PATCH is refined by the update's content.
    pub fn mode(self) -> Option<Mode> {
        match self {
            Self::Get | Self::Head => Some(Mode::Read),
            Self::Put | Self::Delete | Self::Mkcol | Self::Patch => Some(Mode::Write),
            Self::Post => Some(Mode::Append),
            Self::Options => None,
        }
    }
}

/// Serves one storage tree. Owns the lock registry, identity resolver and
/// authorizer, so independent instances share nothing.
pub struct Dispatcher {
    storage: StorageConfig,
    locks: LockRegistry,
    identities: IdentityResolver,
    authorizer: Authorizer,
}

impl Dispatcher {
    pub fn new(config: &ServerConfig) -> Result<Self, IdentityError> {
        Ok(Self::with_resolver(config, IdentityResolver::new(&config.auth)?))
    }

    pub fn with_resolver(config: &ServerConfig, identities: IdentityResolver) -> Self {
        Self {
            storage: config.storage.clone(),
            locks: LockRegistry::new(),
            identities,
            authorizer: Authorizer::new(config.auth.enforce_acl, &config.storage.default_type),
        }
    }

    #[cfg(test)]
    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    pub fn handle(&self, req: &HttpRequest) -> Reply {
        let base_uri = base_uri(&req.url);
        let resolution = self.identities.resolve(&Credentials {
            cookie: req.header("Cookie"),
            peer_cert: req.peer_cert.as_deref(),
            authorization: req.header("Authorization"),
            remote_addr: req.remote_addr,
            base_uri: &base_uri,
        });
        let identity = &resolution.identity;

        let address = address::resolve(&req.url, &self.storage);
        let result = match &address {
            Ok(address) => self.dispatch(req, identity, address),
            Err(e) => Err(LdpError::from(e.clone())),
        };
        let mut reply = result.unwrap_or_else(|err| self.error_reply(&err, &base_uri));

        headers::decorate(&mut reply, req, identity.as_str());
        if let Ok(address) = &address {
            headers::link_resource(&mut reply, address);
        }
        if let Some(cookie) = resolution.set_cookie {
            reply.push_header("Set-Cookie", cookie);
        }

        log!("ldp"; "{} {} -> {} ({})", req.method, req.url, reply.status, identity);
        reply
    }

    fn dispatch(
        &self,
        req: &HttpRequest,
        identity: &Identity,
        address: &ResourceAddress,
    ) -> Result<Reply, LdpError> {
        let verb = Verb::parse(&req.method)
            .ok_or_else(|| LdpError::MethodNotAllowed(req.method.clone()))?;
        let Some(mut mode) = verb.mode() else {
            return Ok(options(req));
        };

        let accept = negotiate::clauses(req.header("Accept"))?;
        let update = (verb == Verb::Patch).then(|| patch::prepare(req, address));
        if let Some(Ok(ops)) = &update {
            mode = patch::mode(ops);
        }

        let _guard = self.locks.acquire(&address.file);
        if !self.authorizer.authorize(identity, address, mode)? {
            return Err(if identity.is_anonymous() {
                LdpError::Unauthenticated
            } else {
                LdpError::Forbidden
            });
        }

        match verb {
            Verb::Get => read::get(req, address, &self.storage, &accept, false),
            Verb::Head => read::get(req, address, &self.storage, &accept, true),
            Verb::Put => write::put(req, address, &self.storage),
            Verb::Post => post::post(req, address, &self.storage),
            Verb::Patch => {
                let ops = update.transpose()?.unwrap_or_default();
                patch::patch(req, address, &self.storage, ops)
            }
            Verb::Delete => write::delete(req, address, &self.storage),
            Verb::Mkcol => write::mkcol(address),
            Verb::Options => Ok(options(req)),
        }
    }

    fn error_reply(&self, err: &LdpError, base_uri: &str) -> Reply {
        let mut reply = Reply::from(err);
        match err {
            LdpError::Unauthenticated => {
                reply.push_header("WWW-Authenticate", self.identities.challenge(base_uri));
            }
            LdpError::Internal(_) => log!("error"; "{}", err),
            _ => {}
        }
        reply
    }
}

fn options(req: &HttpRequest) -> Reply {
    let mut reply = Reply::new(200);
    headers::preflight(&mut reply, req);
    reply
}

/// `scheme://authority` of a request URI; empty when it does not parse.
fn base_uri(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}
