//! Storage initialization.
//!
//! Writes `ldpd.toml`, creates the storage root and, when an owner WebID
//! is given, a root ACL granting that owner full control.

mod template;

use crate::{config::ServerConfig, log};
use anyhow::{Context, Result, bail};
use std::fs;
use url::Url;

/// Initialize a new storage.
///
/// If `dry_run` is true, only prints the files that would be written.
pub fn new_storage(config: &ServerConfig, owner: Option<&str>, dry_run: bool) -> Result<()> {
    if let Some(owner) = owner
        && Url::parse(owner).is_err()
    {
        bail!("owner `{owner}` is not an absolute URI");
    }

    let content = template::config_file(config)?;
    let acl = owner.map(|owner| template::owner_acl(owner, &config.storage.acl_suffix));

    if dry_run {
        print!("{content}");
        if let Some(acl) = &acl {
            println!("\n# {}", template::root_acl_path(config).display());
            print!("{acl}");
        }
        return Ok(());
    }

    let config_path = &config.config_path;
    if config_path.exists() {
        bail!(
            "'{}' already exists.\n\
             Remove it or pass a different path with --config.",
            config_path.display()
        );
    }
    fs::write(config_path, content)
        .with_context(|| format!("Failed to write config file '{}'", config_path.display()))?;

    let root = &config.storage.root;
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create storage root '{}'", root.display()))?;

    if let Some(acl) = acl {
        let path = template::root_acl_path(config);
        // An existing root ACL is the operator's, leave it alone
        if path.exists() {
            log!("init"; "{} exists, not replacing it", path.display());
        } else {
            fs::write(&path, acl)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
        }
    }

    log!("init"; "storage initialized at {}", root.display());
    Ok(())
}
