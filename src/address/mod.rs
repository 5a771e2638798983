//! Request URI to resource address mapping.
//!
//! Every resource has two companions living next to it on disk: an access
//! control document (`<path><acl_suffix>`) and a metadata document
//! (`<path><meta_suffix>`). A container's companions live inside it
//! (`dir/.acl`). Companion documents are their own ACL target; a metadata
//! document is protected by its own `.acl`.
//!
//! # Example
//!
//! ```text
//! root = /srv/, uri = http://h/_test/abc
//!   file     = /srv/_test/abc
//!   acl file = /srv/_test/abc.acl
//!   meta     = /srv/_test/abc.meta
//! ```

use crate::config::StorageConfig;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("malformed request URI `{0}`")]
    MalformedUri(String),
}

/// Canonical addresses of one resource and its companions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddress {
    /// Absolute URI of the resource, trailing slash for containers.
    pub uri: String,
    /// `scheme://authority` the request was addressed to.
    pub base_uri: String,
    /// Decoded path relative to the storage root, always starting with `/`.
    pub relative_path: String,
    /// Location of the resource on disk.
    pub file: PathBuf,
    pub acl_uri: String,
    pub acl_file: PathBuf,
    pub meta_uri: String,
    pub meta_file: PathBuf,
    /// URI of the enclosing container; `None` for the root container.
    pub parent_uri: Option<String>,
    pub is_container: bool,
}

impl ResourceAddress {
    /// Does the resource exist on disk?
    pub fn exists(&self) -> bool {
        self.file.exists()
    }

    /// Is this one of the companion documents?
    pub fn is_acl(&self) -> bool {
        self.acl_uri == self.uri
    }

    pub fn is_meta(&self) -> bool {
        self.meta_uri == self.uri && !self.is_acl()
    }

    pub fn is_root(&self) -> bool {
        self.parent_uri.is_none()
    }
}

/// Derive the address bundle for `request_uri`.
///
/// The only disk access is a directory check deciding whether a path
/// without a trailing slash names a container.
pub fn resolve(request_uri: &str, storage: &StorageConfig) -> Result<ResourceAddress, AddressError> {
    let malformed = || AddressError::MalformedUri(request_uri.to_string());

    let url = Url::parse(request_uri).map_err(|_| malformed())?;
    let host = url.host_str().ok_or_else(malformed)?;
    // The authority becomes a directory name in vhost mode
    if matches!(host, "" | "." | "..") || host.contains(['/', '\\', '\0']) {
        return Err(malformed());
    }
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let base_uri = format!("{}://{}", url.scheme(), authority);

    let mut uri_path = url.path().to_string();
    if !uri_path.starts_with('/') {
        uri_path.insert(0, '/');
    }
    let mut relative_path = percent_decode_str(&uri_path)
        .decode_utf8()
        .map_err(|_| malformed())?
        .into_owned();
    if relative_path
        .split('/')
        .any(|segment| segment == ".." || segment.contains('\0'))
    {
        return Err(malformed());
    }

    let root = storage_root(storage, &authority);
    let mut file = format!("{}{}", root, &relative_path[1..]);

    if !relative_path.ends_with('/') && Path::new(&file).is_dir() {
        relative_path.push('/');
        uri_path.push('/');
        file.push('/');
    }

    let uri = format!("{base_uri}{uri_path}");
    let is_container = relative_path.ends_with('/');

    let acl = storage.acl_suffix.as_str();
    let meta = storage.meta_suffix.as_str();
    let (acl_uri, acl_file, meta_uri, meta_file) = if relative_path.ends_with(acl) {
        (uri.clone(), file.clone(), uri.clone(), file.clone())
    } else if relative_path.ends_with(meta) {
        (format!("{uri}{acl}"), format!("{file}{acl}"), uri.clone(), file.clone())
    } else {
        (
            format!("{uri}{acl}"),
            format!("{file}{acl}"),
            format!("{uri}{meta}"),
            format!("{file}{meta}"),
        )
    };

    Ok(ResourceAddress {
        parent_uri: parent_of(&base_uri, &uri_path),
        uri,
        base_uri,
        relative_path,
        file: PathBuf::from(file),
        acl_uri,
        acl_file: PathBuf::from(acl_file),
        meta_uri,
        meta_file: PathBuf::from(meta_file),
        is_container,
    })
}

/// Storage root for a request, with a trailing separator.
fn storage_root(storage: &StorageConfig, authority: &str) -> String {
    let mut root = storage.root.to_string_lossy().into_owned();
    if !root.ends_with('/') {
        root.push('/');
    }
    if storage.vhosts {
        root.push_str(authority);
        root.push('/');
    }
    root
}

fn parent_of(base_uri: &str, uri_path: &str) -> Option<String> {
    let trimmed = uri_path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let cut = trimmed.rfind('/').map_or(0, |i| i + 1);
    Some(format!("{base_uri}{}", &trimmed[..cut.max(1)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage(root: &Path) -> StorageConfig {
        StorageConfig {
            root: root.to_path_buf(),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn test_acl_file_follows_relative_path() {
        let cfg = storage(Path::new("/srv/"));
        let addr = resolve("http://example.org/_test/abc", &cfg).unwrap();
        assert_eq!(addr.file, PathBuf::from("/srv/_test/abc"));
        assert_eq!(addr.acl_file, PathBuf::from("/srv/_test/abc.acl"));
        assert_eq!(addr.meta_file, PathBuf::from("/srv/_test/abc.meta"));
        assert_eq!(addr.acl_uri, "http://example.org/_test/abc.acl");
        assert_eq!(addr.meta_uri, "http://example.org/_test/abc.meta");
        assert_eq!(addr.parent_uri.as_deref(), Some("http://example.org/_test/"));
        assert!(!addr.is_container);
    }

    #[test]
    fn test_root_without_trailing_slash() {
        let cfg = storage(Path::new("/srv"));
        let addr = resolve("http://example.org/a", &cfg).unwrap();
        assert_eq!(addr.file, PathBuf::from("/srv/a"));
        assert_eq!(addr.parent_uri.as_deref(), Some("http://example.org/"));
    }

    #[test]
    fn test_acl_resource_is_its_own_acl() {
        let cfg = storage(Path::new("/srv/"));
        let addr = resolve("http://example.org/abc.acl", &cfg).unwrap();
        assert_eq!(addr.acl_uri, addr.uri);
        assert_eq!(addr.meta_uri, addr.uri);
        assert_eq!(addr.acl_file, PathBuf::from("/srv/abc.acl"));
        assert!(addr.is_acl());
        assert!(!addr.is_meta());
    }

    #[test]
    fn test_meta_resource_has_own_acl() {
        let cfg = storage(Path::new("/srv/"));
        let addr = resolve("http://example.org/abc.meta", &cfg).unwrap();
        assert_eq!(addr.meta_uri, addr.uri);
        assert_eq!(addr.acl_uri, "http://example.org/abc.meta.acl");
        assert_eq!(addr.acl_file, PathBuf::from("/srv/abc.meta.acl"));
        assert!(addr.is_meta());
    }

    #[test]
    fn test_legacy_comma_suffixes() {
        let cfg = StorageConfig {
            root: PathBuf::from("/srv/"),
            acl_suffix: ",acl".to_string(),
            meta_suffix: ",meta".to_string(),
            ..StorageConfig::default()
        };
        let addr = resolve("http://example.org/x", &cfg).unwrap();
        assert_eq!(addr.acl_file, PathBuf::from("/srv/x,acl"));
        assert_eq!(addr.meta_uri, "http://example.org/x,meta");
    }

    #[test]
    fn test_existing_directory_becomes_container() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("docs")).unwrap();
        let cfg = storage(temp.path());

        let addr = resolve("http://example.org/docs", &cfg).unwrap();
        assert!(addr.is_container);
        assert_eq!(addr.uri, "http://example.org/docs/");
        assert_eq!(addr.relative_path, "/docs/");
        assert_eq!(addr.acl_uri, "http://example.org/docs/.acl");
        assert!(addr.acl_file.ends_with("docs/.acl"));
    }

    #[test]
    fn test_root_container() {
        let cfg = storage(Path::new("/srv/"));
        let addr = resolve("http://example.org/", &cfg).unwrap();
        assert!(addr.is_container);
        assert!(addr.is_root());
        assert_eq!(addr.acl_file, PathBuf::from("/srv/.acl"));
    }

    #[test]
    fn test_vhost_root() {
        let cfg = StorageConfig {
            root: PathBuf::from("/srv/"),
            vhosts: true,
            ..StorageConfig::default()
        };
        let addr = resolve("https://alice.example.org:8443/card", &cfg).unwrap();
        assert_eq!(addr.file, PathBuf::from("/srv/alice.example.org:8443/card"));
        assert_eq!(addr.base_uri, "https://alice.example.org:8443");
    }

    #[test]
    fn test_vhost_cannot_leave_root() {
        let cfg = StorageConfig {
            root: PathBuf::from("/srv/data/"),
            vhosts: true,
            ..StorageConfig::default()
        };
        for uri in ["http://../etc/passwd", "http://./x", "http://%2e%2e/x"] {
            assert!(
                matches!(resolve(uri, &cfg), Err(AddressError::MalformedUri(_))),
                "{uri}"
            );
        }
    }

    #[test]
    fn test_percent_decoding() {
        let cfg = storage(Path::new("/srv/"));
        let addr = resolve("http://example.org/my%20notes", &cfg).unwrap();
        assert_eq!(addr.file, PathBuf::from("/srv/my notes"));
        assert_eq!(addr.uri, "http://example.org/my%20notes");
    }

    #[test]
    fn test_malformed_uri() {
        let cfg = storage(Path::new("/srv/"));
        assert!(resolve("not a uri", &cfg).is_err());
        assert!(resolve("http://example.org/a/%2e%2e%2f/etc", &cfg).is_err());
    }
}
