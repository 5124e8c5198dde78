//! Error types for Gale.
//!
//! This module provides a unified error type for all Gale operations,
//! with specific error variants for different failure modes so callers
//! can distinguish a policy rejection from a missing file from a
//! transient I/O fault.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Gale operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Gale.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested path escapes the share root.
    ///
    /// The message carries only the caller-supplied relative path, never
    /// the resolved filesystem location.
    #[error("path '{0}' is outside the shared directory")]
    PathOutsideRoot(String),

    /// File or directory does not exist under the share root
    #[error("not found: {0}")]
    NotFound(String),

    /// Listing was requested on something that is not a directory
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Byte range is malformed or starts at or past end of file
    #[error("range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    /// An archive request resolved to no usable paths
    #[error("no valid paths to archive")]
    EmptyArchive,

    /// Archive construction failed partway
    #[error("failed to build archive: {0}")]
    Archive(String),

    /// Request denied by the access policy
    #[error("access denied: {reason}")]
    AccessDenied {
        /// Why the request was rejected
        reason: String,
    },

    /// Could not bind the discovery port
    #[error("unable to bind discovery port {port}: {source}")]
    BindFailed {
        /// The UDP port that could not be bound
        port: u16,
        /// Underlying socket error
        source: io::Error,
    },

    /// Unable to broadcast on the network
    #[error("unable to broadcast on network: {0}")]
    BroadcastFailed(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during an otherwise valid operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an access-denied error with the given reason.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Whether this error is a client-side rejection rather than a
    /// server-side fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::PathOutsideRoot(_)
                | Self::NotFound(_)
                | Self::NotADirectory(_)
                | Self::RangeNotSatisfiable(_)
                | Self::EmptyArchive
                | Self::AccessDenied { .. }
        )
    }
}
