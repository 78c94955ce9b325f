//! Observability: structured logging for the `rpcmesh` CLI and server.

pub mod logging;

pub use logging::{init_logging, LogFormat};
