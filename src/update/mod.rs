//! `INSERT`/`DELETE` update documents.
//!
//! Only literal blocks are supported: each operation carries its triples
//! inline. `PREFIX` and `BASE` declarations apply to every later block.
//!
//! ```text
//! PREFIX foaf: <http://xmlns.com/foaf/0.1/>
//! DELETE DATA { <#me> foaf:nick "al" . };
//! INSERT DATA { <#me> foaf:nick "alice" . }
//! ```
//!
//! Blank nodes are fresh in every parse, so a block can never delete a
//! blank node stored by an earlier request.

mod lexer;

use crate::graph::{Graph, GraphError};
use crate::utils::mime;
use oxrdf::Triple;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("update syntax error: {0}")]
    Lexical(String),

    #[error("unsupported update operation `{0}`")]
    UnknownVerb(String),

    #[error("`{0}` has no data block")]
    MissingBody(String),

    #[error("invalid data in {verb} block: {source}")]
    Body {
        verb: UpdateVerb,
        #[source]
        source: GraphError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateVerb {
    Insert,
    InsertData,
    Delete,
    DeleteData,
}

impl UpdateVerb {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "INSERT" => Some(Self::Insert),
            "INSERT DATA" => Some(Self::InsertData),
            "DELETE" => Some(Self::Delete),
            "DELETE DATA" => Some(Self::DeleteData),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::InsertData => "INSERT DATA",
            Self::Delete => "DELETE",
            Self::DeleteData => "DELETE DATA",
        }
    }

    pub fn is_delete(self) -> bool {
        matches!(self, Self::Delete | Self::DeleteData)
    }
}

impl fmt::Display for UpdateVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of an update document.
#[derive(Debug, Clone)]
pub struct UpdateOperation {
    pub verb: UpdateVerb,
    /// Block text between the braces, trimmed.
    pub body: String,
    pub delta: Graph,
}

/// Result of applying a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// A delete block named a triple the graph does not hold.
    Conflict { missing: Triple },
}

impl UpdateOutcome {
    pub fn status(&self) -> u16 {
        match self {
            Self::Applied => 200,
            Self::Conflict { .. } => 409,
        }
    }
}

/// Parse `document`, resolving relative IRIs in every block against `base`.
///
/// Any error means nothing in the document may be applied.
pub fn parse(document: &str, base: &str) -> Result<Vec<UpdateOperation>, UpdateError> {
    let mut prologue = String::new();
    let mut ops = Vec::new();

    for raw in lexer::scan(document)? {
        let verb_text = take_prologue(&raw.head, &mut prologue);
        let Some(body) = raw.body else {
            if verb_text.is_empty() {
                continue;
            }
            return Err(match UpdateVerb::parse(&verb_text) {
                Some(_) => UpdateError::MissingBody(verb_text),
                None => UpdateError::UnknownVerb(verb_text),
            });
        };

        let verb = UpdateVerb::parse(&verb_text).ok_or(UpdateError::UnknownVerb(verb_text))?;
        let source = format!("{prologue}{body}");
        let delta = Graph::parse(source.as_bytes(), mime::types::TURTLE, base)
            .map_err(|source| UpdateError::Body { verb, source })?;
        ops.push(UpdateOperation { verb, body, delta });
    }
    Ok(ops)
}

/// Move `PREFIX`/`BASE` declarations from `head` into `prologue` (as Turtle
/// directives) and return what is left, normalised to an upper-case verb.
fn take_prologue(head: &str, prologue: &mut String) -> String {
    static RE_DECL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(concat!(
            r"(?:(?i-u:PREFIX)[ \t\r\n]+([A-Za-z][A-Za-z0-9_.-]*)?[ \t\r\n]*:[ \t\r\n]*<([^>]*)>",
            r"|(?i-u:BASE)[ \t\r\n]*<([^>]*)>)",
        ))
        .unwrap()
    });

    for caps in RE_DECL.captures_iter(head) {
        match (caps.get(2), caps.get(3)) {
            (Some(iri), _) => {
                let name = caps.get(1).map_or("", |m| m.as_str());
                prologue.push_str(&format!("@prefix {name}: <{}> .\n", iri.as_str()));
            }
            (None, Some(iri)) => prologue.push_str(&format!("@base <{}> .\n", iri.as_str())),
            (None, None) => {}
        }
    }

    RE_DECL
        .replace_all(head, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Apply `ops` to `graph` in document order.
///
/// A delete block is checked in full before any of its triples are
/// removed; on the first miss the outcome is a conflict and later blocks
/// are skipped. Blocks before the failing one stay applied to `graph`, so
/// callers persist only on [`UpdateOutcome::Applied`].
pub fn apply(graph: &mut Graph, ops: &[UpdateOperation]) -> UpdateOutcome {
    for op in ops {
        if op.verb.is_delete() {
            if let Some(missing) = op.delta.iter().find(|t| !graph.contains(*t)) {
                return UpdateOutcome::Conflict {
                    missing: missing.into_owned(),
                };
            }
            for triple in op.delta.iter() {
                graph.remove_triple(triple);
            }
        } else {
            graph.merge(&op.delta);
        }
    }
    UpdateOutcome::Applied
}
