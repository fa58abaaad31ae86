//! Controller Error Hierarchy
//!
//! Errors only surface at the edges of the controller: configuration
//! loading, process bootstrap and event source transport. The reconciliation
//! path itself absorbs every fault and logs it.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source or deserialization failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration values that parsed but violate a rule
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Event source transport failures
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Process level I/O (signals, log files)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures while deriving a [`ResourceKey`](crate::ResourceKey)
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("object has no name")]
    MissingName,

    #[error("malformed resource key: {0:?}")]
    InvalidKey(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A notification payload did not match the expected shape
    #[error("Failed to decode event at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Reading from the underlying transport failed
    #[error("Event stream read failed: {0}")]
    Read(#[source] std::io::Error),

    /// The source was already consumed by an earlier run
    #[error("Event source already running or consumed")]
    AlreadyRunning,
}
