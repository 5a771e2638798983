//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Linked Data Platform resource server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: ldpd.toml)
    #[arg(short = 'C', long, global = true, default_value = "ldpd.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Storage root directory (overrides `storage.root`)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write a config file and create the storage root
    #[command(visible_alias = "i")]
    Init {
        /// WebID granted full control over the root container
        #[arg(short, long, value_hint = clap::ValueHint::Url)]
        owner: Option<String>,

        /// Print what would be written without touching the disk
        #[arg(long)]
        dry: bool,
    },

    /// Serve the storage root over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Store each virtual host under its own directory
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        vhosts: Option<bool>,

        /// Enforce access control lists
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        acl: Option<bool>,
    },
}

impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from(["ldpd", "serve", "--port", "9000", "--acl=false", "-v"]);
        assert!(cli.verbose);
        let Commands::Serve { port, acl, vhosts, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(9000));
        assert_eq!(acl, Some(false));
        assert_eq!(vhosts, None);
    }

    #[test]
    fn test_init_flags() {
        let cli = Cli::parse_from(["ldpd", "i", "--owner", "https://alice.example.org/#me", "--dry"]);
        assert!(cli.is_init());
        assert_eq!(cli.config, PathBuf::from("ldpd.toml"));
    }
}
