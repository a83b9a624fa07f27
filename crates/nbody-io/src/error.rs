//! Error types for grid and halo catalog reading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading gbpCode output files.
#[derive(Error, Debug)]
pub enum NbodyIoError {
    /// The requested grid name is not one of the known grids.
    #[error("unknown grid name '{0}' (expected one of: density, vx, vy, vz)")]
    UnknownGridName(String),

    /// The file is well formed but does not contain the requested grid.
    #[error("grid '{identifier}' not found after scanning {scanned} grids")]
    GridNotFound {
        identifier: &'static str,
        scanned: usize,
    },

    /// A read returned fewer bytes than the layout requires.
    #[error("truncated input while reading {context}: expected {expected_bytes} bytes")]
    Truncated {
        context: String,
        expected_bytes: u64,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No catalog shards were found.
    #[error("no catalog files found in {0}")]
    EmptyInput(String),

    /// Header values that cannot describe a valid file.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A directory entry without a numeric shard suffix.
    #[error("catalog file name has no numeric suffix: {0}")]
    InvalidShardName(PathBuf),

    /// The per-shard halo counts disagree with the catalog total.
    #[error("halo count mismatch: header total is {expected}, shards hold {actual}")]
    HaloCountMismatch { expected: usize, actual: usize },

    /// Reader configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
}

impl NbodyIoError {
    /// Create a Truncated error.
    pub fn truncated(context: impl Into<String>, expected_bytes: u64) -> Self {
        Self::Truncated {
            context: context.into(),
            expected_bytes,
        }
    }

    /// Create an InvalidHeader error.
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// Create an EmptyInput error.
    pub fn empty_input(source: impl Into<String>) -> Self {
        Self::EmptyInput(source.into())
    }

    /// Convert an I/O error raised while filling a fixed-size buffer.
    ///
    /// `UnexpectedEof` becomes [`NbodyIoError::Truncated`]; anything else is
    /// passed through as [`NbodyIoError::Io`].
    pub fn from_read(err: std::io::Error, context: impl Into<String>, expected_bytes: u64) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::truncated(context, expected_bytes)
        } else {
            Self::Io(err)
        }
    }

    /// Whether retrying with different caller input could succeed.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownGridName(_) | Self::GridNotFound { .. } | Self::InvalidConfig(_)
        )
    }
}

/// Result type for nbody-io operations.
pub type Result<T> = std::result::Result<T, NbodyIoError>;
