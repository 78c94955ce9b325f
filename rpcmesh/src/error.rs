//! Application-level error type for the `rpcmesh` CLI and demo service.

use thiserror::Error;

/// Top-level error type for `rpcmesh` binary operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration file failed to load or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Binding or serving the HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The underlying RPC core reported a codec/dispatch/session error.
    #[error(transparent)]
    Rpc(#[from] rpcmesh_core::RpcError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for `rpcmesh` binary operations.
pub type Result<T> = std::result::Result<T, Error>;
