//! In-memory RDF graph.
//!
//! Thin layer over `oxrdf::Graph` that adds the pattern queries the access
//! control and update code need, plus parsing and serialization by content
//! type through `oxrdfio`.
//!
//! Blank nodes get fresh identities on every parse, so two documents parsed
//! separately never share a blank node.

pub mod vocab;

use crate::utils::mime;
use oxrdf::{NamedNodeRef, SubjectRef, TermRef, Triple, TripleRef};
use oxrdfio::{RdfFormat, RdfParser, RdfSerializer};
use thiserror::Error;

/// Errors raised by the RDF codec.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no RDF syntax registered for `{0}`")]
    UnsupportedSyntax(String),

    #[error("invalid base IRI `{0}`")]
    BaseIri(String),

    #[error("RDF syntax error: {0}")]
    Parse(#[from] oxrdfio::RdfParseError),

    #[error("RDF serialization failed: {0}")]
    Serialize(#[from] std::io::Error),
}

/// A set of RDF triples.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: oxrdf::Graph,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `data` written in `content_type`, resolving relative IRIs against `base`.
    pub fn parse(data: &[u8], content_type: &str, base: &str) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        graph.parse_into(data, content_type, base)?;
        Ok(graph)
    }

    /// Parse `data` and add its triples to this graph.
    ///
    /// Statements in named graphs (TriG, N-Quads) are folded into the
    /// default graph.
    pub fn parse_into(
        &mut self,
        data: &[u8],
        content_type: &str,
        base: &str,
    ) -> Result<(), GraphError> {
        let format = mime::rdf_format(content_type)
            .ok_or_else(|| GraphError::UnsupportedSyntax(content_type.to_string()))?;
        let parser = RdfParser::from_format(format)
            .with_base_iri(base)
            .map_err(|_| GraphError::BaseIri(base.to_string()))?;

        for quad in parser.for_reader(data) {
            let quad = quad?;
            self.inner
                .insert(&Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(())
    }

    /// Serialize the graph into `content_type`.
    ///
    /// N3 output is written in its Turtle subset.
    pub fn serialize(&self, content_type: &str) -> Result<Vec<u8>, GraphError> {
        let format = match mime::rdf_format(content_type) {
            Some(RdfFormat::N3) => RdfFormat::Turtle,
            Some(format) => format,
            None => return Err(GraphError::UnsupportedSyntax(content_type.to_string())),
        };

        let mut writer = RdfSerializer::from_format(format).for_writer(Vec::new());
        for triple in self.inner.iter() {
            writer.serialize_triple(triple)?;
        }
        Ok(writer.finish()?)
    }

    /// Add a triple. Returns `false` if it was already present.
    pub fn add_triple<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.inner.insert(triple)
    }

    /// Remove a triple. Returns `false` if it was absent.
    pub fn remove_triple<'a>(&mut self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.inner.remove(triple)
    }

    pub fn contains<'a>(&self, triple: impl Into<TripleRef<'a>>) -> bool {
        self.inner.contains(triple)
    }

    /// All triples matching a pattern; `None` is a wildcard.
    pub fn matches(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<TermRef<'_>>,
    ) -> Vec<Triple> {
        let accept = |t: &TripleRef<'_>| {
            predicate.is_none_or(|p| t.predicate == p) && object.is_none_or(|o| t.object == o)
        };
        match subject {
            Some(s) => self
                .inner
                .triples_for_subject(s)
                .filter(|t| accept(t))
                .map(TripleRef::into_owned)
                .collect(),
            None => self
                .inner
                .iter()
                .filter(|t| accept(t))
                .map(TripleRef::into_owned)
                .collect(),
        }
    }

    /// Objects of `(subject, predicate, ?)`.
    pub fn objects<'a>(
        &'a self,
        subject: SubjectRef<'a>,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = TermRef<'a>> + 'a {
        self.inner.objects_for_subject_predicate(subject, predicate)
    }

    /// Subjects of `(?, predicate, object)`.
    pub fn subjects<'a>(
        &'a self,
        predicate: NamedNodeRef<'a>,
        object: TermRef<'a>,
    ) -> impl Iterator<Item = SubjectRef<'a>> + 'a {
        self.inner.subjects_for_predicate_object(predicate, object)
    }

    pub fn iter(&self) -> impl Iterator<Item = TripleRef<'_>> {
        self.inner.iter()
    }

    /// Add every triple of `other`.
    pub fn merge(&mut self, other: &Graph) {
        for triple in other.iter() {
            self.inner.insert(triple);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
