//! `rpcmesh call`: issues a single ad hoc JSON-RPC request over a plain
//! blocking TCP connection and prints the raw response body.
//!
//! A dynamically-typed call from the command line has no compile-time
//! `Args`/`R` to hand `rpcmesh_core::jsonrpc::call_remote`, so this talks
//! to the wire directly with `rpcmesh_core::http::framing::HttpParseState`
//! rather than going through the typed `Responder`/`Future` pair the
//! generated `rpc_method!` call sites use.

use std::io::{Read, Write};
use std::net::TcpStream;

use rpcmesh_core::http::framing::{HttpParseState, ServerReaction};

use crate::cli::args::CallArgs;
use crate::error::{Error, Result};

/// Runs the `call` subcommand.
///
/// # Errors
///
/// Returns an error if `params` is not valid JSON, the connection fails,
/// or the peer's response never completes.
pub async fn run(args: &CallArgs) -> Result<()> {
    let params: serde_json::Value = serde_json::from_str(&args.params)?;
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": args.method,
        "params": params,
    });
    let body = serde_json::to_vec(&request)?;
    let addr = args.addr.clone();

    let response = tokio::task::spawn_blocking(move || send_request(&addr, &body))
        .await
        .map_err(|err| Error::Transport(err.to_string()))??;

    println!("{}", String::from_utf8_lossy(&response));
    Ok(())
}

fn send_request(addr: &str, body: &[u8]) -> Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr)?;

    let mut request = Vec::new();
    request.extend_from_slice(b"POST / HTTP/1.1\r\nContent-Length: ");
    request.extend_from_slice(body.len().to_string().as_bytes());
    request.extend_from_slice(b"\r\nHost: ");
    request.extend_from_slice(addr.as_bytes());
    request.extend_from_slice(b"\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n");
    request.extend_from_slice(body);
    stream.write_all(&request)?;

    let mut buffer = Vec::new();
    let mut scratch = [0_u8; 8192];
    let mut parse_state = HttpParseState::new();
    loop {
        let (reaction, header_end) = parse_state.parse(&buffer, |_| true, |_, _| {});
        match reaction {
            ServerReaction::Ok => {
                let body_size = parse_state.body_size().max(0) as usize;
                if buffer.len() >= header_end + body_size {
                    return Ok(buffer[header_end..header_end + body_size].to_vec());
                }
            }
            ServerReaction::ReadOn => {}
            ServerReaction::WrongReply | ServerReaction::Disconnect => {
                return Err(Error::Transport("malformed HTTP response".to_string()));
            }
        }

        let read = stream.read(&mut scratch)?;
        if read == 0 {
            return Err(Error::Transport("connection closed before a full response arrived".to_string()));
        }
        buffer.extend_from_slice(&scratch[..read]);
    }
}
