//! WebID profile retrieval and key lookup.

use super::IdentityError;
use super::cert::{PublicKeyId, RSA_KEY_TYPE};
use crate::debug;
use crate::graph::Graph;
use crate::graph::vocab::{cert, rdf};
use crate::utils::mime;
use oxrdf::{NamedNode, SubjectRef, TermRef, TripleRef};
use std::time::Duration;

/// Source of WebID profile documents.
pub trait ProfileFetcher: Send + Sync {
    /// Retrieve and parse the profile document `webid` points into.
    fn fetch(&self, webid: &str) -> Result<Graph, IdentityError>;
}

const PROFILE_ACCEPT: &str =
    "text/turtle, application/n-triples;q=0.9, application/rdf+xml;q=0.8, text/n3;q=0.7";

/// Fetches profiles over HTTP(S).
pub struct HttpProfileFetcher {
    client: reqwest::blocking::Client,
}

impl HttpProfileFetcher {
    pub fn new(timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ldpd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdentityError::Fetch {
                uri: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl ProfileFetcher for HttpProfileFetcher {
    fn fetch(&self, webid: &str) -> Result<Graph, IdentityError> {
        let document = document_uri(webid);
        let fetch_err = |reason: String| IdentityError::Fetch {
            uri: document.to_string(),
            reason,
        };

        debug!("webid"; "fetching profile {}", document);
        let response = self
            .client
            .get(document)
            .header(reqwest::header::ACCEPT, PROFILE_ACCEPT)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| mime::essence(v).to_string())
            .unwrap_or_else(|| mime::types::TURTLE.to_string());
        let body = response.bytes().map_err(|e| fetch_err(e.to_string()))?;

        Graph::parse(&body, &content_type, document).map_err(IdentityError::Profile)
    }
}

/// The profile document URI: the WebID without its fragment.
pub fn document_uri(webid: &str) -> &str {
    webid.split_once('#').map_or(webid, |(doc, _)| doc)
}

/// RSA keys `webid` declares in `profile`, as (modulus, exponent) literals.
pub fn profile_keys(profile: &Graph, webid: &str) -> Vec<(String, String)> {
    let Ok(agent) = NamedNode::new(webid) else {
        return Vec::new();
    };
    let rsa_type = TermRef::from(cert::RSA_PUBLIC_KEY);

    let mut keys = Vec::new();
    for key in profile.objects(agent.as_ref().into(), cert::KEY) {
        let key = match key {
            TermRef::NamedNode(node) => SubjectRef::NamedNode(node),
            TermRef::BlankNode(node) => SubjectRef::BlankNode(node),
            _ => continue,
        };
        if !profile.contains(TripleRef::new(key, rdf::TYPE, rsa_type)) {
            continue;
        }
        for modulus in literal_values(profile, key, cert::MODULUS) {
            for exponent in literal_values(profile, key, cert::EXPONENT) {
                keys.push((modulus.clone(), exponent));
            }
        }
    }
    keys
}

/// Does `profile` bind `key` to `webid`?
pub fn profile_has_key(profile: &Graph, webid: &str, key: &PublicKeyId) -> bool {
    key.key_type == RSA_KEY_TYPE
        && profile_keys(profile, webid)
            .iter()
            .any(|(modulus, exponent)| key.matches_literals(modulus, exponent))
}

fn literal_values(
    profile: &Graph,
    subject: SubjectRef<'_>,
    predicate: oxrdf::NamedNodeRef<'_>,
) -> Vec<String> {
    profile
        .objects(subject, predicate)
        .filter_map(|term| match term {
            TermRef::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        })
        .collect()
}
