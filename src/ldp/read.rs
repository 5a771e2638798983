//! GET and HEAD.

use super::headers::omits_containment;
use super::{HttpRequest, LdpError, Reply, etag, store};
use crate::address::ResourceAddress;
use crate::config::StorageConfig;
use crate::graph::Graph;
use crate::graph::vocab::{ldp, rdf, stat};
use crate::negotiate::{self, Clause};
use crate::utils::mime::{self, types};
use oxrdf::vocab::xsd;
use oxrdf::{Literal, NamedNode, TripleRef};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fs;
use std::time::UNIX_EPOCH;

/// Characters escaped when a file name becomes a URI path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Container index page served to HTML clients.
const INDEX_PAGE: &str = "index.html";

pub(super) fn get(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
    accept: &[Clause],
    head: bool,
) -> Result<Reply, LdpError> {
    if !address.exists() {
        return Err(LdpError::NotFound);
    }

    let mut reply = if address.is_container {
        container(req, address, storage, accept)?
    } else {
        resource(address, storage, accept)?
    };

    if let Some(wanted) = req.header("If-None-Match")
        && let Some(tag) = reply.header("ETag")
        && etag::matches(wanted, tag)
    {
        return Ok(Reply::new(304).with_header("ETag", tag));
    }

    if head {
        reply.body.clear();
    }
    Ok(reply)
}

fn resource(
    address: &ResourceAddress,
    storage: &StorageConfig,
    accept: &[Clause],
) -> Result<Reply, LdpError> {
    let stored = mime::from_path(&address.file, &storage.default_type);
    let tag = etag::compute(&address.file)?;

    if !mime::is_rdf(stored) {
        let chosen = negotiate::choose(accept, &[stored])?;
        let body = fs::read(&address.file)?;
        return Ok(Reply::new(200).with_header("ETag", tag).with_body(chosen, body));
    }

    // The stored syntax comes first so `*/*` gets the file as written.
    let mut candidates = vec![stored];
    candidates.extend(mime::RDF_SERIALIZERS.iter().filter(|t| **t != stored));
    let chosen = negotiate::choose(accept, &candidates)?;

    let data = fs::read(&address.file)?;
    let body = if chosen == stored {
        data
    } else {
        Graph::parse(&data, stored, &address.uri)
            .and_then(|graph| graph.serialize(chosen))
            .map_err(LdpError::internal)?
    };
    Ok(Reply::new(200).with_header("ETag", tag).with_body(chosen, body))
}

fn container(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
    accept: &[Clause],
) -> Result<Reply, LdpError> {
    let index = address.file.join(INDEX_PAGE);
    let mut candidates = mime::RDF_SERIALIZERS.to_vec();
    if index.is_file() {
        candidates.push(types::HTML);
    }

    let chosen = negotiate::choose(accept, &candidates)?;
    if chosen == types::HTML {
        let tag = etag::compute(&index)?;
        return Ok(Reply::new(200)
            .with_header("ETag", tag)
            .with_body(types::HTML, fs::read(&index)?));
    }

    let graph = listing(address, storage, omits_containment(req.header("Prefer")))?;
    let body = graph.serialize(chosen).map_err(LdpError::internal)?;
    Ok(Reply::new(200)
        .with_header("ETag", etag::compute(&address.file)?)
        .with_body(chosen, body))
}

/// Describe a container: its LDP types, its children and their sizes and
/// modification times, merged with the container's metadata document.
///
/// Companion documents and in-flight temp files are not listed.
pub(super) fn listing(
    address: &ResourceAddress,
    storage: &StorageConfig,
    omit_containment: bool,
) -> Result<Graph, LdpError> {
    let mut graph = Graph::new();
    let container = NamedNode::new(address.uri.as_str()).map_err(LdpError::internal)?;
    graph.add_triple(TripleRef::new(container.as_ref(), rdf::TYPE, ldp::BASIC_CONTAINER));
    graph.add_triple(TripleRef::new(container.as_ref(), rdf::TYPE, ldp::CONTAINER));

    let mut entries: Vec<_> = fs::read_dir(&address.file)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if storage.is_companion(&name) || (name.starts_with('.') && name.ends_with(".tmp")) {
            continue;
        }

        let meta = entry.metadata()?;
        let mut uri = format!("{}{}", address.uri, utf8_percent_encode(&name, SEGMENT));
        if meta.is_dir() {
            uri.push('/');
        }
        let child = NamedNode::new(uri).map_err(LdpError::internal)?;

        if !omit_containment {
            graph.add_triple(TripleRef::new(container.as_ref(), ldp::CONTAINS, child.as_ref()));
        }
        let kind = if meta.is_dir() {
            ldp::BASIC_CONTAINER
        } else {
            ldp::RESOURCE
        };
        graph.add_triple(TripleRef::new(child.as_ref(), rdf::TYPE, kind));

        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let size = Literal::new_typed_literal(meta.len().to_string(), xsd::INTEGER);
        let mtime = Literal::new_typed_literal(mtime.to_string(), xsd::INTEGER);
        graph.add_triple(TripleRef::new(child.as_ref(), stat::SIZE, size.as_ref()));
        graph.add_triple(TripleRef::new(child.as_ref(), stat::MTIME, mtime.as_ref()));
    }

    let meta = store::load_graph(&address.meta_file, &storage.default_type, &address.uri)?;
    graph.merge(&meta);
    Ok(graph)
}
