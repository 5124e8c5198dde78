//! # Gale Core Library
//!
//! `gale-core` provides the core functionality for Gale, a tool for sharing
//! a directory tree with peers on the local network.
//!
//! ## Features
//!
//! - **Confined sharing**: every request is resolved against a single share
//!   root; nothing outside it is ever touched
//! - **Range downloads**: partial-content downloads with exact byte accounting
//! - **On-demand archives**: multi-file selections packaged as a zip stream
//! - **Broadcast discovery**: peers find each other via UDP presence beacons
//!
//! ## Modules
//!
//! - [`access`] - Allow-list / shared-secret request policy
//! - [`archive`] - On-demand zip packaging and streaming
//! - [`config`] - Configuration management
//! - [`discovery`] - Presence broadcasting and the peer listener
//! - [`error`] - Error types
//! - [`registry`] - Liveness-filtered table of discovered peers
//! - [`share`] - Share root confinement, listing, and range streaming
//! - [`web`] - HTTP API served to peers
//!
//! ## Example
//!
//! ```rust,ignore
//! use gale_core::share::ShareRoot;
//!
//! let root = ShareRoot::open("/srv/public")?;
//! let resolved = root.resolve("photos/trip")?;
//! for entry in root.list(&resolved)? {
//!     println!("{} ({:?})", entry.name, entry.kind);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unused_async)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]

pub mod access;
pub mod archive;
pub mod config;
pub mod discovery;
pub mod error;
pub mod registry;
pub mod share;
pub mod web;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port for the file API
pub const DEFAULT_SHARE_PORT: u16 = 8010;

/// Default discovery port (UDP)
pub const DEFAULT_DISCOVERY_PORT: u16 = 17257;

/// Default interval between presence broadcasts
pub const DEFAULT_BROADCAST_INTERVAL: std::time::Duration =
    std::time::Duration::from_secs(5);

/// How long a peer stays visible after its last beacon
pub const LIVENESS_WINDOW: std::time::Duration = std::time::Duration::from_secs(15);

/// Receive timeout for the discovery listener; bounds shutdown latency
pub const DISCOVERY_RECV_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

/// Chunk size for streaming file and archive bodies (64 KiB)
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
