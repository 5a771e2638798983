//! Server configuration management for `ldpd.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── auth       # [auth]
//! │   ├── serve      # [serve]
//! │   └── storage    # [storage]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # ServerConfig (this file)
//! ```
//!
//! A missing config file is not an error: every field has a default and
//! the CLI can override the common ones.

pub mod section;
pub mod types;

pub use section::{AuthConfig, ServeConfig, StorageConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing ldpd.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// HTTP listener settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Resource tree layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Identity and access control
    #[serde(default)]
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// `init` never reads an existing file; it starts from defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let config_path = cwd.join(&cli.config);
        let exists = config_path.is_file();

        let mut config = if exists && !cli.is_init() {
            Self::from_path(&config_path)?
        } else {
            if !cli.is_init() {
                log!("config"; "{} not found, using defaults", cli.config.display());
            }
            Self::default()
        };

        config.config_path = normalize_path(&config_path);
        config.apply_command_options(cli);
        config.normalize_paths();

        if !cli.is_init() {
            config.align_cookie_security();
            config.validate()?;
        }
        Ok(config)
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Directory containing the config file.
    pub fn config_dir(&self) -> &Path {
        self.config_path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Render as TOML, used by `init`.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        Self::update_option(&mut self.storage.root, cli.root.as_ref());

        if let Commands::Serve {
            interface,
            port,
            vhosts,
            acl,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.storage.vhosts, vhosts.as_ref());
            Self::update_option(&mut self.auth.enforce_acl, acl.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Expand `~` and resolve the storage root against the config directory.
    fn normalize_paths(&mut self) {
        let raw = self.storage.root.to_string_lossy().into_owned();
        let expanded = PathBuf::from(shellexpand::tilde(&raw).into_owned());
        let root = if expanded.is_relative() {
            self.config_dir().join(expanded)
        } else {
            expanded
        };
        self.storage.root = normalize_path(&root);
    }

    /// Browsers drop `Secure` cookies received over plain HTTP, so the flag
    /// only stays on when TLS ends at the listener or a trusted proxy.
    fn align_cookie_security(&mut self) {
        if self.auth.secure_cookies
            && !self.serve.scheme.eq_ignore_ascii_case("https")
            && !self.auth.trust_proxy
        {
            log!(
                "warning";
                "{} = \"{}\", sending session cookies without `Secure`",
                ServeConfig::SCHEME, self.serve.scheme
            );
            self.auth.secure_cookies = false;
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section, collecting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        self.storage.validate(&mut diag);
        self.auth.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ServerConfig {
    let (parsed, ignored) = ServerConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = ServerConfig::from_str("[serve\nport = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        let mut config = ServerConfig::default();
        config.align_cookie_security();
        assert!(!config.auth.secure_cookies);

        let mut config = test_parse_config("[serve]\nscheme = \"https\"");
        config.align_cookie_security();
        assert!(config.auth.secure_cookies);

        let mut config = test_parse_config("[auth]\ntrust_proxy = true");
        config.align_cookie_security();
        assert!(config.auth.secure_cookies);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nport = 9000\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = ServerConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.serve.port, 9000);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_default_config_validates() {
        let temp = TempDir::new().unwrap();
        let mut config = ServerConfig::default();
        config.storage.root = temp.path().to_path_buf();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_every_section() {
        let config = test_parse_config(
            "[serve]\nworkers = 0\n[storage]\nacl_suffix = \"\"\n[auth]\nprofile_timeout = 0",
        );
        let err = config.validate().unwrap_err();
        let diag = match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Diagnostics(diag)) => diag,
            other => panic!("unexpected error: {other:?}"),
        };
        assert_eq!(diag.len(), 3);
    }

    #[test]
    fn test_cli_overrides() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("ldpd.toml");
        fs::write(&config_path, "[serve]\nport = 9000\n[storage]\nroot = \"store\"").unwrap();
        fs::create_dir(temp.path().join("store")).unwrap();

        let cli = Cli::parse_from([
            "ldpd",
            "-C",
            config_path.to_str().unwrap(),
            "serve",
            "--port",
            "9100",
            "--acl=false",
        ]);
        let config = ServerConfig::load(&cli).unwrap();

        assert_eq!(config.serve.port, 9100);
        assert!(!config.auth.enforce_acl);
        assert_eq!(
            config.storage.root,
            normalize_path(&temp.path().join("store"))
        );
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let rendered = ServerConfig::default().to_toml().unwrap();
        let parsed = test_parse_config(&rendered);
        assert_eq!(parsed.storage, StorageConfig::default());
        assert_eq!(parsed.auth, AuthConfig::default());
    }
}
