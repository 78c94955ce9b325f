//! `rpcmesh` — JSON-RPC 2.0 over HTTP server, client, and service
//! description CLI.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use rpcmesh::cli::args::Cli;
use rpcmesh::cli::commands::dispatch;
use rpcmesh::observability::{init_logging, LogFormat};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.quiet { 0 } else { cli.verbose };
    init_logging(LogFormat::Human, verbosity);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        shutdown.cancel();
    });

    match dispatch(cli, cancel).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
