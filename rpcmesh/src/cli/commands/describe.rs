//! `rpcmesh describe`: prints the JSON-WSP service description for the
//! demo callable tree to stdout, without binding a listener.

use crate::cli::args::DescribeArgs;
use crate::error::Result;
use crate::service;

/// Runs the `describe` subcommand.
///
/// # Errors
///
/// Returns an error if the description document fails to render as JSON
/// (never happens in practice, since it is built from a `serde_json::Value`).
pub fn run(args: &DescribeArgs) -> Result<()> {
    let root = service::build();
    let doc = rpcmesh_wsp::describe(root.as_ref(), &args.servicename, &args.url);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
