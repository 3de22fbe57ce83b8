//! Error type for the tools crate.

use std::path::PathBuf;

use bastion_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Anything a tool command can fail with.
#[derive(Debug, Error)]
pub enum ToolError {
    /// File system access failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The core rejected some data.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A scenario file could not be parsed.
    #[error("Failed to parse scenario '{path}': {message}")]
    ScenarioParse {
        /// Scenario file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Report rendering failed.
    #[error("Failed to render report: {0}")]
    Report(#[from] serde_json::Error),

    /// Data directory holds nothing to validate.
    #[error("No data files found in '{0}'")]
    NoDataFiles(PathBuf),
}

impl ToolError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
