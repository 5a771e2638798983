//! ldpd - a Linked Data Platform server with WebID authentication and
//! Web Access Control.

mod address;
mod cli;
mod config;
mod core;
mod gate;
mod graph;
mod identity;
mod ldp;
mod logger;
mod negotiate;
mod update;
mod utils;
mod wac;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ServerConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ServerConfig::load(&cli)?;

    match &cli.command {
        Commands::Init { owner, dry } => cli::init::new_storage(&config, owner.as_deref(), *dry),
        Commands::Serve { .. } => cli::serve::serve(&config),
    }
}
