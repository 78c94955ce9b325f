//! `rpcmesh serve`: binds the demo callable tree to an HTTP listener,
//! dispatching JSON-RPC POSTs and serving the JSON-WSP description on GET.

use std::sync::Arc;

use rpcmesh_core::http::{bind, GetResponder};
use rpcmesh_core::jsonrpc::JsonRpcService;
use rpcmesh_core::rpc::Callable;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::args::ServeArgs;
use crate::config::{ConfigLoader, ServerConfig};
use crate::error::Result;
use crate::service;

/// The path the JSON-WSP description document is served from.
const DESCRIBE_PATH: &str = "/describe";

/// A [`GetResponder`] serving exactly one static document: the JSON-WSP
/// description of `root`, rendered once at construction since the
/// callable tree never changes after startup.
struct DescriptionResponder {
    body: Vec<u8>,
}

impl DescriptionResponder {
    fn new(root: &dyn Callable, servicename: &str, url: &str) -> Self {
        let doc = rpcmesh_wsp::describe(root, servicename, url);
        Self {
            body: serde_json::to_vec(&doc).expect("a serde_json::Value always serializes"),
        }
    }
}

impl GetResponder for DescriptionResponder {
    fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
        if path == DESCRIBE_PATH {
            Some(("application/json".to_string(), self.body.clone()))
        } else {
            None
        }
    }
}

/// Runs the `serve` subcommand: loads configuration (or a built-in
/// default), binds the HTTP listener, and blocks until `cancel` fires.
///
/// # Errors
///
/// Returns an error if the configuration fails to load or the listener
/// cannot bind.
pub async fn run(args: &ServeArgs, cancel: CancellationToken) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => (*ConfigLoader::new().load(path)?.config).clone(),
        None => ServerConfig::default(),
    };
    if let Some(bind_addr) = &args.bind {
        config.bind = bind_addr.clone();
    }

    let root = service::build();
    let get_responder = Arc::new(DescriptionResponder::new(root.as_ref(), &config.servicename, &config.url));
    let post_responder = Arc::new(JsonRpcService::new(Arc::clone(&root)));

    let addr = bind(&config.bind, get_responder, post_responder, cancel.clone())
        .await
        .map_err(|err| crate::error::Error::Transport(err.to_string()))?;
    info!(%addr, describe_path = DESCRIBE_PATH, "rpcmesh listening");

    cancel.cancelled().await;
    Ok(())
}
