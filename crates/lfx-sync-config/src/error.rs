//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was absent or empty.
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// The signing key file could not be read.
    #[error("cannot read signing key file {path}: {source}")]
    UnreadableKeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
