//! Files written by `ldpd init`.

use crate::config::ServerConfig;
use anyhow::Result;
use std::path::PathBuf;

/// `ldpd.toml` content: a comment header and the full config.
///
/// The storage root is written relative to the config file when it lives
/// beneath it.
pub fn config_file(config: &ServerConfig) -> Result<String> {
    let mut config = config.clone();
    let relative = config
        .storage
        .root
        .strip_prefix(config.config_dir())
        .map(|p| p.to_path_buf());
    if let Ok(relative) = relative
        && !relative.as_os_str().is_empty()
    {
        config.storage.root = relative;
    }

    let mut out = format!(
        "# ldpd configuration file (v{})\n\
         # Every key is optional; missing keys take the values shown here.\n\n",
        env!("CARGO_PKG_VERSION")
    );
    out.push_str(&config.to_toml()?);
    Ok(out)
}

/// Root ACL granting `owner` full control of the root container and of
/// the ACL itself.
pub fn owner_acl(owner: &str, acl_suffix: &str) -> String {
    format!(
        "@prefix acl: <http://www.w3.org/ns/auth/acl#> .\n\
         \n\
         <#owner>\n    \
             a acl:Authorization ;\n    \
             acl:agent <{owner}> ;\n    \
             acl:accessTo <./>, <./{acl_suffix}> ;\n    \
             acl:mode acl:Read, acl:Write, acl:Control .\n"
    )
}

/// Where the root ACL lives.
pub fn root_acl_path(config: &ServerConfig) -> PathBuf {
    config.storage.root.join(&config.storage.acl_suffix)
}
