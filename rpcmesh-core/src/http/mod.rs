//! Hand-rolled HTTP framing, server, and client — the transport layer
//! JSON-RPC requests travel over. Built directly on `tokio::net` (server
//! side) and `std::net` (client side) rather than a web framework: the
//! framing state machine itself is the subject here, not routing or
//! middleware.

pub mod client;
pub mod framing;
pub mod server;

pub use client::HttpClient;
pub use framing::{HttpParseState, ServerReaction};
pub use server::{bind, GetResponder, HttpSession, PostResponder};
