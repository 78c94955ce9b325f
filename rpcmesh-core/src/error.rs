//! Error taxonomy for the core serialization/RPC/HTTP stack.
//!
//! Mirrors the abstract error kinds of the wire protocol one variant per
//! kind, so dispatcher and framer code can match on kind rather than on
//! string content.

use thiserror::Error;

/// Standard JSON-RPC 2.0 wire error codes.
pub mod wire_codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Error type shared by the codecs, the RPC object tree, and the HTTP/JSON-RPC
/// plumbing.
#[derive(Debug, Error, Clone)]
pub enum RpcError {
    /// A codec saw bytes it could not make sense of.
    #[error("parse error: {0}")]
    Parse(String),

    /// A dotted path did not resolve to a callable.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A client received a non-2xx HTTP status or a JSON-RPC `error` member.
    #[error("remote error {code}: {message}")]
    Remote {
        /// The JSON-RPC error code reported by the peer.
        code: i64,
        /// The error message reported by the peer.
        message: String,
        /// Optional structured error data reported by the peer.
        data: Option<serde_json::Value>,
    },

    /// A user procedure rejected its arguments.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Programmer misuse of a collaborator (e.g. seeking in the binary
    /// codec, or nesting in the URL-form codec). Fatal for the session.
    #[error("logic error: {0}")]
    Logic(String),

    /// The underlying transport failed. The session ends; any outstanding
    /// request tokens are abandoned.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RpcError {
    /// The JSON-RPC wire code this error kind maps to, where one applies.
    ///
    /// `Logic` and `Transport` have no wire representation: both end the
    /// session rather than producing a JSON-RPC error response.
    #[must_use]
    pub const fn wire_code(&self) -> Option<i64> {
        match self {
            Self::Parse(_) => Some(wire_codes::PARSE_ERROR),
            Self::MethodNotFound(_) => Some(wire_codes::METHOD_NOT_FOUND),
            Self::InvalidParams(_) => Some(wire_codes::INVALID_PARAMS),
            Self::Remote { code, .. } => Some(*code),
            Self::Logic(_) | Self::Transport(_) => None,
        }
    }

    /// Whether this error is fatal for the session (no error response is
    /// produced; the connection is expected to close).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Logic(_) | Self::Transport(_))
    }
}

/// Result alias used throughout `rpcmesh-core`.
pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_code_mapping() {
        assert_eq!(
            RpcError::Parse("bad".into()).wire_code(),
            Some(wire_codes::PARSE_ERROR)
        );
        assert_eq!(
            RpcError::MethodNotFound("x".into()).wire_code(),
            Some(wire_codes::METHOD_NOT_FOUND)
        );
        assert_eq!(
            RpcError::InvalidParams("x".into()).wire_code(),
            Some(wire_codes::INVALID_PARAMS)
        );
        assert_eq!(RpcError::Logic("x".into()).wire_code(), None);
        assert_eq!(RpcError::Transport("x".into()).wire_code(), None);
    }

    #[test]
    fn fatal_kinds() {
        assert!(RpcError::Logic("x".into()).is_fatal());
        assert!(RpcError::Transport("x".into()).is_fatal());
        assert!(!RpcError::Parse("x".into()).is_fatal());
        assert!(!RpcError::MethodNotFound("x".into()).is_fatal());
    }
}
