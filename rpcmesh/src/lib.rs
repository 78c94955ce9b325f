//! `rpcmesh` — a demo service, CLI, and configuration layer built on top
//! of `rpcmesh-core`'s JSON-RPC object model.
//!
//! This crate does not add any wire-protocol behavior of its own: it
//! wires a [`service`] callable tree into `rpcmesh-core::http::bind` and
//! `rpcmesh-wsp::describe`, and gives that a command-line front end.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod service;

pub use error::{Error, Result};
