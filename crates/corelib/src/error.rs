//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Error)]
pub enum Error {
    /// Lookup against a balancer with no configured addresses.
    #[error("no upstreams configured")]
    NoUpstreams,
    /// Weighted balancer handed a pool whose weights sum to zero.
    #[error("invalid weight configuration: total weight is zero")]
    InvalidWeightConfiguration,
    /// Address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// Routing request for a group that is not configured
    #[error("unknown upstream group: {0}")]
    UnknownGroup(String),
    /// Semantically invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Malformed configuration document
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// Configuration file could not be read
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
