//! Gale CLI - share a directory tree with peers on your local network
//!
//! Gale serves a configured directory over HTTP on the LAN and announces
//! itself to peers via UDP broadcast, so devices find each other without
//! typing addresses.
//!
//! ## Quick Start
//!
//! ```bash
//! # Expose a directory
//! gale serve --root ~/Public
//!
//! # See who else is sharing (on another device)
//! gale scan
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Scan(args) => commands::scan::run(args).await,
        Command::Config(args) => commands::config::run(args),
        Command::Completions(args) => commands::completions::run(args),
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gale=info,gale_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
