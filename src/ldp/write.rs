//! PUT, DELETE and MKCOL, plus the write preconditions they share.

use super::{HttpRequest, LdpError, Reply, etag, store};
use crate::address::ResourceAddress;
use crate::config::StorageConfig;
use crate::graph::Graph;
use std::fs;
use std::io::{self, ErrorKind};

/// Enforce `If-Match` and `If-None-Match` against the current state.
///
/// `If-Match` fails when the resource is absent or its tag differs;
/// `If-None-Match` fails when the resource exists with a listed tag
/// (`*` lists every tag).
pub(super) fn check_preconditions(
    req: &HttpRequest,
    address: &ResourceAddress,
) -> Result<(), LdpError> {
    let if_match = req.header("If-Match");
    let if_none_match = req.header("If-None-Match");
    if if_match.is_none() && if_none_match.is_none() {
        return Ok(());
    }

    let current = match etag::compute(&address.file) {
        Ok(tag) => Some(tag),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(wanted) = if_match
        && !current.as_deref().is_some_and(|tag| etag::matches(wanted, tag))
    {
        return Err(LdpError::PreconditionFailed);
    }
    if let Some(wanted) = if_none_match
        && current.as_deref().is_some_and(|tag| etag::matches(wanted, tag))
    {
        return Err(LdpError::PreconditionFailed);
    }
    Ok(())
}

/// Map errors caused by the shape of the tree to 409.
pub(super) fn path_conflict(err: io::Error) -> LdpError {
    match err.kind() {
        ErrorKind::AlreadyExists
        | ErrorKind::NotADirectory
        | ErrorKind::IsADirectory
        | ErrorKind::DirectoryNotEmpty => LdpError::Conflict(err.to_string()),
        _ => err.into(),
    }
}

pub(super) fn put(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
) -> Result<Reply, LdpError> {
    check_preconditions(req, address)?;

    // Stored companions always parse
    if !address.is_container
        && (address.is_acl() || address.is_meta())
        && let Err(e) = Graph::parse(&req.body, &storage.default_type, &address.uri)
    {
        return Err(LdpError::BadRequest(format!("{}: {e}", address.uri)));
    }

    if address.is_container {
        fs::create_dir_all(&address.file).map_err(path_conflict)?;
    } else {
        store::write_atomic(&address.file, &req.body).map_err(path_conflict)?;
    }
    Ok(Reply::text(201, "Created"))
}

pub(super) fn delete(
    req: &HttpRequest,
    address: &ResourceAddress,
    storage: &StorageConfig,
) -> Result<Reply, LdpError> {
    if address.is_root() {
        return Err(LdpError::MethodNotAllowed(
            "DELETE on the root container".to_string(),
        ));
    }
    if !address.exists() {
        return Err(LdpError::NotFound);
    }
    check_preconditions(req, address)?;

    if address.is_container {
        let occupied = fs::read_dir(&address.file)?
            .filter_map(Result::ok)
            .any(|entry| !storage.is_companion(&entry.file_name().to_string_lossy()));
        if occupied {
            return Err(LdpError::Conflict("container is not empty".to_string()));
        }
        fs::remove_dir_all(&address.file)?;
    } else {
        fs::remove_file(&address.file)?;
    }

    if address.exists() {
        return Err(LdpError::Conflict("resource still present".to_string()));
    }
    Ok(Reply::text(200, "Deleted"))
}

pub(super) fn mkcol(address: &ResourceAddress) -> Result<Reply, LdpError> {
    if address.exists() {
        return Err(LdpError::Conflict("resource already exists".to_string()));
    }
    fs::create_dir(&address.file).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LdpError::Conflict("parent container does not exist".to_string()),
        _ => path_conflict(e),
    })?;
    Ok(Reply::text(201, "Created"))
}
