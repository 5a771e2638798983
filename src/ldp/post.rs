//! POST: create a child of a container, or append to an RDF resource.

use super::headers::link_targets;
use super::write::path_conflict;
use super::{HttpRequest, LdpError, Reply, store};
use crate::address::ResourceAddress;
use crate::config::StorageConfig;
use crate::graph::Graph;
use crate::graph::vocab::ldp;
use crate::utils::mime::{self, types};
use std::fs;

/// Name used when the client sends no usable `Slug`.
const DEFAULT_SLUG: &str = "res";

pub(super) fn post(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
) -> Result<Reply, LdpError> {
    if !address.exists() {
        return Err(LdpError::NotFound);
    }
    let content_type = req.header("Content-Type").map(mime::essence);
    if !address.is_container {
        return append(req, address, storage, content_type);
    }

    let name = child_name(req.header("Slug"));
    if wants_container(req) {
        fs::create_dir(address.file.join(&name)).map_err(path_conflict)?;
        return Ok(created(format!("{}{}/", address.uri, name)));
    }

    let content_type = content_type
        .ok_or_else(|| LdpError::UnsupportedMediaType("(none)".to_string()))?;
    let (file_name, data) = if mime::is_rdf(content_type) {
        let file_name = format!("{name}.ttl");
        let base = format!("{}{}", address.uri, file_name);
        let graph = Graph::parse(&req.body, content_type, &base).map_err(LdpError::internal)?;
        let data = graph.serialize(types::TURTLE).map_err(LdpError::internal)?;
        (file_name, data)
    } else {
        let ext = mime::extension_for(content_type)
            .ok_or_else(|| LdpError::UnsupportedMediaType(content_type.to_string()))?;
        (format!("{name}.{ext}"), req.body.clone())
    };

    store::write_atomic(&address.file.join(&file_name), &data)?;
    Ok(created(format!("{}{}", address.uri, file_name)))
}

/// Merge the posted triples into an existing RDF resource.
fn append(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
    content_type: Option<&str>,
) -> Result<Reply, LdpError> {
    let stored = mime::from_path(&address.file, &storage.default_type);
    if !mime::is_rdf(stored) {
        return Err(LdpError::MethodNotAllowed(
            "POST to a non-RDF resource".to_string(),
        ));
    }
    let content_type = content_type
        .filter(|ct| mime::is_rdf(ct))
        .ok_or_else(|| LdpError::UnsupportedMediaType(content_type.unwrap_or("(none)").to_string()))?;

    let delta = Graph::parse(&req.body, content_type, &address.uri).map_err(LdpError::internal)?;
    let mut graph = store::load_graph(&address.file, stored, &address.uri)?;
    graph.merge(&delta);
    store::store_graph(&address.file, &graph, stored)?;
    Ok(Reply::text(200, "OK"))
}

/// `<slug>-<6 hex>`, so concurrent posts with one slug never collide.
fn child_name(slug: Option<&str>) -> String {
    let slug = slug.map(store::slugify).unwrap_or_default();
    let slug = if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    };
    format!("{slug}-{}", store::random_hex(3))
}

/// Does the `Link` header ask for a container?
fn wants_container(req: &HttpRequest) -> bool {
    req.header_joined("Link").is_some_and(|link| {
        link_targets(&link, "type")
            .iter()
            .any(|t| t == ldp::BASIC_CONTAINER.as_str() || t == ldp::CONTAINER.as_str())
    })
}

fn created(location: String) -> Reply {
    Reply::text(201, "Created").with_header("Location", location)
}
