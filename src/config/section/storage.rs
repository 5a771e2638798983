//! `[storage]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! root = "~/ldp-data"         # Directory holding all resources
//! vhosts = false              # One subdirectory per request host
//! acl_suffix = ".acl"         # Access control companion suffix
//! meta_suffix = ".meta"       # Metadata companion suffix
//! default_type = "text/turtle"
//! ```
//!
//! With `vhosts = true`, `http://alice.example.org/card` is stored at
//! `<root>/alice.example.org/card`.

use std::path::PathBuf;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::mime;
use serde::{Deserialize, Serialize};

/// On-disk layout of the resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage root; relative paths resolve against the config file.
    pub root: PathBuf,

    /// Prefix every path with the request authority.
    pub vhosts: bool,

    pub acl_suffix: String,

    pub meta_suffix: String,

    /// Content type assumed for files whose extension says nothing.
    pub default_type: String,
}

impl StorageConfig {
    pub const ROOT: FieldPath = FieldPath::new("storage.root");
    pub const ACL_SUFFIX: FieldPath = FieldPath::new("storage.acl_suffix");
    pub const META_SUFFIX: FieldPath = FieldPath::new("storage.meta_suffix");
    pub const DEFAULT_TYPE: FieldPath = FieldPath::new("storage.default_type");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.root.as_os_str().is_empty() {
            diag.error(Self::ROOT, "must not be empty");
        } else if self.root.exists() && !self.root.is_dir() {
            diag.error(Self::ROOT, format!("`{}` is not a directory", self.root.display()));
        }

        for (field, suffix) in [
            (Self::ACL_SUFFIX, &self.acl_suffix),
            (Self::META_SUFFIX, &self.meta_suffix),
        ] {
            if suffix.is_empty() {
                diag.error(field, "must not be empty");
            } else if suffix.contains('/') {
                diag.error(field, format!("`{suffix}` must not contain `/`"));
            }
        }
        if !self.acl_suffix.is_empty() && self.acl_suffix == self.meta_suffix {
            diag.error(Self::META_SUFFIX, "must differ from `storage.acl_suffix`");
        }

        if !mime::is_rdf(&self.default_type) {
            diag.error_with_hint(
                Self::DEFAULT_TYPE,
                format!("`{}` is not an RDF syntax", self.default_type),
                "use \"text/turtle\"",
            );
        }
    }

    /// Is `name` (a bare file name) one of the companion documents?
    pub fn is_companion(&self, name: &str) -> bool {
        name.ends_with(&self.acl_suffix) || name.ends_with(&self.meta_suffix)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            vhosts: false,
            acl_suffix: ".acl".to_string(),
            meta_suffix: ".meta".to_string(),
            default_type: mime::types::TURTLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_storage_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.storage.acl_suffix, ".acl");
        assert_eq!(config.storage.meta_suffix, ".meta");
        assert_eq!(config.storage.default_type, "text/turtle");
        assert!(!config.storage.vhosts);
    }

    #[test]
    fn test_storage_config_legacy_suffixes() {
        let config =
            test_parse_config("[storage]\nacl_suffix = \",acl\"\nmeta_suffix = \",meta\"");
        let mut diag = ConfigDiagnostics::new();
        config.storage.validate(&mut diag);
        assert!(diag.is_empty());
        assert!(config.storage.is_companion("card,acl"));
        assert!(!config.storage.is_companion("card"));
    }

    #[test]
    fn test_storage_config_validation() {
        let config = StorageConfig {
            acl_suffix: ".x".to_string(),
            meta_suffix: ".x".to_string(),
            default_type: "image/png".to_string(),
            ..StorageConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert_eq!(diag.len(), 2);

        let config = StorageConfig {
            acl_suffix: String::new(),
            meta_suffix: "a/b".to_string(),
            ..StorageConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
