//! PATCH with an `INSERT`/`DELETE` update document.

use super::write::check_preconditions;
use super::{HttpRequest, LdpError, Reply, store};
use crate::address::ResourceAddress;
use crate::config::StorageConfig;
use crate::debug;
use crate::update::{self, UpdateOperation, UpdateOutcome};
use crate::utils::mime::{self, types};
use crate::wac::Mode;

/// Check the media type and parse the update. Needs no lock.
pub(super) fn prepare(
    req: &HttpRequest,
    address: &ResourceAddress,
) -> Result<Vec<UpdateOperation>, LdpError> {
    let content_type = req.header("Content-Type").map(mime::essence).unwrap_or("");
    if !content_type.eq_ignore_ascii_case(types::SPARQL_UPDATE) {
        return Err(LdpError::UnsupportedMediaType(content_type.to_string()));
    }
    let document = std::str::from_utf8(&req.body)
        .map_err(|_| LdpError::BadRequest("update is not UTF-8".to_string()))?;
    Ok(update::parse(document, &address.uri)?)
}

/// Insert-only updates need Append, anything that deletes needs Write.
pub(super) fn mode(ops: &[UpdateOperation]) -> Mode {
    if ops.iter().any(|op| op.verb.is_delete()) {
        Mode::Write
    } else {
        Mode::Append
    }
}

pub(super) fn patch(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
    ops: Vec<UpdateOperation>,
) -> Result<Reply, LdpError> {
    if address.is_container {
        return Err(LdpError::MethodNotAllowed(
            "PATCH on a container".to_string(),
        ));
    }
    check_preconditions(req, address)?;

    let stored = mime::from_path(&address.file, &storage.default_type);
    if !mime::is_rdf(stored) {
        return Err(LdpError::UnsupportedMediaType(stored.to_string()));
    }

    let mut graph = store::load_graph(&address.file, stored, &address.uri)?;
    match update::apply(&mut graph, &ops) {
        UpdateOutcome::Conflict { missing } => {
            debug!("ldp"; "update of {} conflicts on {}", address.uri, missing);
            Err(LdpError::Conflict(format!("no statement matches {missing}")))
        }
        UpdateOutcome::Applied => {
            store::store_graph(&address.file, &graph, stored)?;
            debug!("ldp"; "applied {} operation(s) to {}", ops.len(), address.uri);
            Ok(Reply::text(200, "OK").with_header("Triples", graph.len().to_string()))
        }
    }
}
