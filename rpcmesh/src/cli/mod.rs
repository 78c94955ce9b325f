//! Command-line interface: argument definitions and per-subcommand
//! handlers.

pub mod args;
pub mod commands;

pub use args::Cli;
