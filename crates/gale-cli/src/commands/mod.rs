//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

pub mod completions;
pub mod config;
pub mod scan;
pub mod serve;

/// Load configuration with graceful fallback to defaults.
///
/// If the config file doesn't exist or can't be parsed, it falls back to
/// defaults.
pub fn load_config() -> gale_core::config::Config {
    gale_core::config::Config::load().unwrap_or_default()
}

/// Parse a duration like `5s` or `2m`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if let Some(secs) = input.strip_suffix('s') {
        return secs.parse().ok().map(Duration::from_secs);
    }
    if let Some(mins) = input.strip_suffix('m') {
        return mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    input.parse().ok().map(Duration::from_secs)
}

/// Gale - share a directory tree with peers on your local network
#[derive(Parser)]
#[command(name = "gale")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Serve the share root and announce this device to the network
    Serve(ServeArgs),

    /// Scan the network for announcing devices
    Scan(ScanArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    /// Directory tree to expose (overrides the configured root)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// HTTP port for the file API
    #[arg(short, long)]
    pub port: Option<u16>,

    /// UDP port for discovery
    #[arg(long)]
    pub discovery_port: Option<u16>,

    /// Device name announced to the network
    #[arg(long)]
    pub name: Option<String>,

    /// Shared secret required from callers (overrides config)
    #[arg(long)]
    pub secret: Option<String>,

    /// Bind the HTTP server to localhost only
    #[arg(long)]
    pub localhost_only: bool,

    /// Serve files without broadcasting or listening for peers
    #[arg(long)]
    pub no_discovery: bool,
}

/// Arguments for the scan command
#[derive(Parser)]
pub struct ScanArgs {
    /// Duration to scan (e.g., 5s, 10s)
    #[arg(short, long, default_value = "5s")]
    pub duration: String,

    /// UDP port for discovery
    #[arg(long)]
    pub discovery_port: Option<u16>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (device-name, root, port, discovery-port, secret)
        key: String,

        /// Value to set
        value: String,
    },

    /// Add an IP address to the allow list
    Allow {
        /// IP address to admit without a secret
        ip: String,
    },

    /// Remove an IP address from the allow list
    Disallow {
        /// IP address to remove
        ip: String,
    },

    /// Generate and persist a random access secret
    GenSecret,
}

/// Arguments for the completions command
#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
