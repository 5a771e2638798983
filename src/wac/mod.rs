//! Web Access Control decisions.
//!
//! A resource is governed by its ACL document only; when that document
//! does not exist the resource is unrestricted. Entries are flat
//! `acl:Authorization` nodes read straight from the graph indexes.
//!
//! An entry applies to a resource when its `acl:accessTo` lists the
//! resource URI or the resource's ACL URI. It admits:
//!
//! - agents named by `acl:agent` or `acl:owner`
//! - everyone when it names no agent, or has `acl:agentClass foaf:Agent`
//! - any WebID holder when it has `acl:agentClass acl:AuthenticatedAgent`
//!
//! `acl:Control` (and ownership) implies every mode, `acl:Write` implies
//! `acl:Append`.

use crate::address::ResourceAddress;
use crate::debug;
use crate::graph::vocab::{acl, foaf, rdf};
use crate::graph::{Graph, GraphError};
use crate::identity::Identity;
use oxrdf::{NamedNodeRef, SubjectRef, TermRef};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WacError {
    #[error("failed to read ACL `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid ACL `{uri}`: {source}")]
    Acl {
        uri: String,
        #[source]
        source: GraphError,
    },
}

/// Access modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Read,
    Write,
    Append,
    Control,
}

impl Mode {
    pub fn iri(self) -> NamedNodeRef<'static> {
        match self {
            Self::Read => acl::READ,
            Self::Write => acl::WRITE,
            Self::Append => acl::APPEND,
            Self::Control => acl::CONTROL,
        }
    }

    fn from_iri(iri: NamedNodeRef<'_>) -> Option<Self> {
        [Self::Read, Self::Write, Self::Append, Self::Control]
            .into_iter()
            .find(|mode| mode.iri() == iri)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Append => "Append",
            Self::Control => "Control",
        };
        f.write_str(name)
    }
}

/// One `acl:Authorization`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlEntry {
    /// `acl:agent` values; empty with no agent class means public.
    pub agents: Vec<String>,
    /// `acl:owner` values, granted every mode.
    pub owners: Vec<String>,
    pub public: bool,
    pub authenticated: bool,
    pub access_to: Vec<String>,
    pub modes: Vec<Mode>,
}

impl AccessControlEntry {
    fn applies_to(&self, address: &ResourceAddress) -> bool {
        self.access_to
            .iter()
            .any(|uri| *uri == address.uri || *uri == address.acl_uri)
    }

    fn grants(&self, identity: &Identity, mode: Mode) -> bool {
        let agent = identity.as_str();
        if self.owners.iter().any(|owner| owner == agent) {
            return true;
        }

        let admitted = self.public
            || (self.authenticated && !identity.is_anonymous())
            || self.agents.iter().any(|a| a == agent);
        admitted && self.has_mode(mode)
    }

    fn has_mode(&self, mode: Mode) -> bool {
        self.modes.iter().any(|&granted| {
            granted == mode
                || granted == Mode::Control
                || (granted == Mode::Write && mode == Mode::Append)
        })
    }
}

/// Read every authorization in an ACL graph.
///
/// A node counts as an authorization when it is typed `acl:Authorization`
/// or carries an `acl:accessTo`.
pub fn parse_entries(graph: &Graph) -> Vec<AccessControlEntry> {
    let mut subjects: Vec<SubjectRef<'_>> = graph
        .subjects(rdf::TYPE, acl::AUTHORIZATION.into())
        .collect();
    for triple in graph.iter() {
        if triple.predicate == acl::ACCESS_TO && !subjects.contains(&triple.subject) {
            subjects.push(triple.subject);
        }
    }

    subjects
        .into_iter()
        .map(|subject| {
            let agents = iris(graph, subject, acl::AGENT);
            let classes = iris(graph, subject, acl::AGENT_CLASS);
            let owners = iris(graph, subject, acl::OWNER);
            AccessControlEntry {
                public: classes.iter().any(|c| c == foaf::AGENT.as_str())
                    || (agents.is_empty() && owners.is_empty() && classes.is_empty()),
                authenticated: classes
                    .iter()
                    .any(|c| c == acl::AUTHENTICATED_AGENT.as_str()),
                agents,
                owners,
                access_to: iris(graph, subject, acl::ACCESS_TO),
                modes: graph
                    .objects(subject, acl::MODE)
                    .filter_map(|term| match term {
                        TermRef::NamedNode(node) => Mode::from_iri(node),
                        _ => None,
                    })
                    .collect(),
            }
        })
        .collect()
}

fn iris(graph: &Graph, subject: SubjectRef<'_>, predicate: NamedNodeRef<'_>) -> Vec<String> {
    graph
        .objects(subject, predicate)
        .filter_map(|term| match term {
            TermRef::NamedNode(node) => Some(node.as_str().to_string()),
            _ => None,
        })
        .collect()
}

/// Answers "may this identity do this to that resource?".
#[derive(Debug, Clone)]
pub struct Authorizer {
    enforce: bool,
    acl_type: String,
}

impl Authorizer {
    /// `enforce = false` is the bypass mode: everything is allowed.
    /// ACL documents are parsed as `acl_type`.
    pub fn new(enforce: bool, acl_type: &str) -> Self {
        Self {
            enforce,
            acl_type: acl_type.to_string(),
        }
    }

    pub fn is_enforcing(&self) -> bool {
        self.enforce
    }

    pub fn authorize(
        &self,
        identity: &Identity,
        address: &ResourceAddress,
        mode: Mode,
    ) -> Result<bool, WacError> {
        if !self.enforce {
            return Ok(true);
        }

        let data = match std::fs::read(&address.acl_file) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("wac"; "{} has no ACL, allowing {}", address.uri, mode);
                return Ok(true);
            }
            Err(e) => return Err(WacError::Io(address.acl_file.clone(), e)),
        };
        let graph = Graph::parse(&data, &self.acl_type, &address.acl_uri).map_err(|source| {
            WacError::Acl {
                uri: address.acl_uri.clone(),
                source,
            }
        })?;

        let allowed = parse_entries(&graph)
            .iter()
            .filter(|entry| entry.applies_to(address))
            .any(|entry| entry.grants(identity, mode));
        debug!(
            "wac";
            "{} {} {} on {}",
            identity,
            if allowed { "granted" } else { "denied" },
            mode,
            address.uri
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;
    use crate::config::StorageConfig;
    use crate::identity::AuthMethod;
    use std::fs;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    const U1: &str = "https://u1.example/profile#me";
    const U2: &str = "https://u2.example/profile#me";

    struct Fixture {
        _temp: TempDir,
        storage: StorageConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let storage = StorageConfig {
                root: temp.path().to_path_buf(),
                ..StorageConfig::default()
            };
            Self {
                _temp: temp,
                storage,
            }
        }

        fn address(&self, path: &str) -> ResourceAddress {
            address::resolve(&format!("http://example.org{path}"), &self.storage).unwrap()
        }

        fn write_acl(&self, path: &str, turtle: &str) {
            let addr = self.address(path);
            fs::write(addr.acl_file, turtle).unwrap();
        }
    }

    fn user(uri: &str) -> Identity {
        Identity::webid(uri, AuthMethod::WebIdTls)
    }

    fn anonymous() -> Identity {
        Identity::anonymous(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn authorizer() -> Authorizer {
        Authorizer::new(true, "text/turtle")
    }

    const U1_U2_ACL: &str = r#"
        @prefix acl: <http://www.w3.org/ns/auth/acl#> .
        <#u1> a acl:Authorization ;
            acl:accessTo <x> ;
            acl:agent <https://u1.example/profile#me> ;
            acl:mode acl:Read, acl:Write .
        <#u2> a acl:Authorization ;
            acl:accessTo <x.acl> ;
            acl:agent <https://u2.example/profile#me> ;
            acl:mode acl:Read, acl:Write .
    "#;

    #[test]
    fn test_missing_acl_is_unrestricted() {
        let fx = Fixture::new();
        let addr = fx.address("/x");
        assert!(authorizer().authorize(&anonymous(), &addr, Mode::Write).unwrap());
    }

    #[test]
    fn test_agent_entry_allows_only_listed_agent() {
        let fx = Fixture::new();
        fx.write_acl("/x", U1_U2_ACL);
        let addr = fx.address("/x");
        let wac = authorizer();

        assert!(wac.authorize(&user(U1), &addr, Mode::Read).unwrap());
        assert!(wac.authorize(&user(U1), &addr, Mode::Write).unwrap());
        assert!(!wac.authorize(&anonymous(), &addr, Mode::Read).unwrap());
        assert!(!wac.authorize(&user("https://eve.example/#me"), &addr, Mode::Read).unwrap());
    }

    #[test]
    fn test_acl_document_governs_itself() {
        let fx = Fixture::new();
        fx.write_acl("/x", U1_U2_ACL);
        let acl_addr = fx.address("/x.acl");
        let wac = authorizer();

        assert!(wac.authorize(&user(U2), &acl_addr, Mode::Write).unwrap());
        assert!(!wac.authorize(&user(U1), &acl_addr, Mode::Write).unwrap());
        assert!(!wac.authorize(&anonymous(), &acl_addr, Mode::Read).unwrap());
    }

    #[test]
    fn test_public_entry() {
        let fx = Fixture::new();
        fx.write_acl(
            "/x",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               @prefix foaf: <http://xmlns.com/foaf/0.1/> .
               [] acl:accessTo <x> ; acl:agentClass foaf:Agent ; acl:mode acl:Read ."#,
        );
        let addr = fx.address("/x");
        let wac = authorizer();
        assert!(wac.authorize(&anonymous(), &addr, Mode::Read).unwrap());
        assert!(!wac.authorize(&anonymous(), &addr, Mode::Write).unwrap());
    }

    #[test]
    fn test_entry_without_agents_is_public() {
        let fx = Fixture::new();
        fx.write_acl(
            "/x",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               [] acl:accessTo <x> ; acl:mode acl:Append ."#,
        );
        let addr = fx.address("/x");
        assert!(authorizer().authorize(&anonymous(), &addr, Mode::Append).unwrap());
        assert!(!authorizer().authorize(&anonymous(), &addr, Mode::Write).unwrap());
    }

    #[test]
    fn test_authenticated_agent_class() {
        let fx = Fixture::new();
        fx.write_acl(
            "/x",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               [] acl:accessTo <x> ; acl:agentClass acl:AuthenticatedAgent ; acl:mode acl:Read ."#,
        );
        let addr = fx.address("/x");
        assert!(authorizer().authorize(&user(U2), &addr, Mode::Read).unwrap());
        assert!(!authorizer().authorize(&anonymous(), &addr, Mode::Read).unwrap());
    }

    #[test]
    fn test_mode_implications() {
        let fx = Fixture::new();
        fx.write_acl(
            "/x",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               [] acl:accessTo <x> ; acl:agent <https://u1.example/profile#me> ; acl:mode acl:Control .
               [] acl:accessTo <x> ; acl:agent <https://u2.example/profile#me> ; acl:mode acl:Write ."#,
        );
        let addr = fx.address("/x");
        let wac = authorizer();
        for mode in [Mode::Read, Mode::Write, Mode::Append, Mode::Control] {
            assert!(wac.authorize(&user(U1), &addr, mode).unwrap());
        }
        assert!(wac.authorize(&user(U2), &addr, Mode::Append).unwrap());
        assert!(!wac.authorize(&user(U2), &addr, Mode::Read).unwrap());
    }

    #[test]
    fn test_owner_has_every_mode() {
        let fx = Fixture::new();
        fx.write_acl(
            "/",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               <#owner> acl:accessTo <./>, <.acl> ; acl:owner <https://u1.example/profile#me> ."#,
        );
        let wac = authorizer();
        let root = fx.address("/");
        assert!(wac.authorize(&user(U1), &root, Mode::Write).unwrap());
        assert!(!wac.authorize(&user(U2), &root, Mode::Read).unwrap());
        assert!(wac.authorize(&user(U1), &fx.address("/.acl"), Mode::Control).unwrap());
    }

    #[test]
    fn test_entry_for_other_resource_does_not_apply() {
        let fx = Fixture::new();
        fx.write_acl(
            "/x",
            r#"@prefix acl: <http://www.w3.org/ns/auth/acl#> .
               [] acl:accessTo <y> ; acl:agentClass <http://xmlns.com/foaf/0.1/Agent> ; acl:mode acl:Read ."#,
        );
        assert!(!authorizer().authorize(&anonymous(), &fx.address("/x"), Mode::Read).unwrap());
    }

    #[test]
    fn test_bypass_mode() {
        let fx = Fixture::new();
        fx.write_acl("/x", U1_U2_ACL);
        let wac = Authorizer::new(false, "text/turtle");
        assert!(!wac.is_enforcing());
        assert!(wac.authorize(&anonymous(), &fx.address("/x"), Mode::Write).unwrap());
    }

    #[test]
    fn test_broken_acl_is_an_error() {
        let fx = Fixture::new();
        fx.write_acl("/x", "this is not turtle");
        assert!(matches!(
            authorizer().authorize(&anonymous(), &fx.address("/x"), Mode::Read),
            Err(WacError::Acl { .. })
        ));
    }

    #[test]
    fn test_parse_entries() {
        let graph = Graph::parse(U1_U2_ACL.as_bytes(), "text/turtle", "http://example.org/x.acl")
            .unwrap();
        let mut entries = parse_entries(&graph);
        entries.sort_by(|a, b| a.agents.cmp(&b.agents));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agents, vec![U1.to_string()]);
        assert_eq!(entries[0].access_to, vec!["http://example.org/x".to_string()]);
        assert!(!entries[0].public);
        assert_eq!(entries[1].access_to, vec!["http://example.org/x.acl".to_string()]);
    }
}
