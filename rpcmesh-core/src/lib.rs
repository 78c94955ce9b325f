//! `rpcmesh` core — the format-agnostic serialization engine and RPC
//! object model that every wire codec and transport in this workspace is
//! built on.
//!
//! A type becomes wire-visible by implementing [`typed::TypedSerialiser`]
//! (for scalars/containers) or [`object::Serialisable`] (for declared
//! structs, normally via `#[derive(rpcmesh_derive::Serialisable)]`).
//! [`rpc::Callable`] does the same for procedures. Codecs under [`codec`]
//! and the HTTP/JSON-RPC plumbing under [`http`]/[`jsonrpc`] depend only
//! on these traits, never on each other.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod flags;
pub mod http;
pub mod io;
pub mod jsonrpc;
pub mod object;
pub mod rpc;
pub mod typed;

pub use error::{Result, RpcError};
pub use flags::Flags;
