//! Integration tests for the six literal end-to-end JSON-RPC scenarios,
//! driven against a real `rpcmesh serve`-equivalent HTTP listener bound
//! to the demo `service::build()` callable tree.

use std::sync::Arc;

use rpcmesh_core::http::framing::{HttpParseState, ServerReaction};
use rpcmesh_core::http::{bind, GetResponder};
use rpcmesh_core::jsonrpc::JsonRpcService;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

struct NoGetResponder;

impl GetResponder for NoGetResponder {
    fn get(&self, _path: &str) -> Option<(String, Vec<u8>)> {
        None
    }
}

struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

async fn start_server() -> (std::net::SocketAddr, CancellationToken) {
    let cancel = CancellationToken::new();
    let root = rpcmesh::service::build();
    let get_responder = Arc::new(NoGetResponder);
    let post_responder = Arc::new(JsonRpcService::new(root));
    let addr = bind("127.0.0.1:0", get_responder, post_responder, cancel.clone())
        .await
        .expect("bind succeeds");
    (addr, cancel)
}

async fn post(addr: std::net::SocketAddr, body: &[u8]) -> HttpResponse {
    send(addr, "POST", "/", Some(("application/json", body))).await
}

async fn get(addr: std::net::SocketAddr, path: &str) -> HttpResponse {
    send(addr, "GET", path, None).await
}

async fn send(addr: std::net::SocketAddr, method: &str, path: &str, body: Option<(&str, &[u8])>) -> HttpResponse {
    let mut stream = TcpStream::connect(addr).await.expect("connect succeeds");

    let mut request = Vec::new();
    request.extend_from_slice(format!("{method} {path} HTTP/1.1\r\n").as_bytes());
    request.extend_from_slice(b"Host: localhost\r\nConnection: close\r\n");
    if let Some((content_type, body)) = body {
        request.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        request.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        request.extend_from_slice(body);
    } else {
        request.extend_from_slice(b"\r\n");
    }
    stream.write_all(&request).await.expect("write succeeds");

    let mut buffer = Vec::new();
    let mut scratch = [0_u8; 8192];
    let mut parse_state = HttpParseState::new();
    let mut status = 0_u16;
    loop {
        let (reaction, header_end) = parse_state.parse(
            &buffer,
            |line| {
                let mut parts = line.splitn(3, |&b| b == b' ');
                let _protocol = parts.next();
                if let Some(code) = parts.next() {
                    status = std::str::from_utf8(code).ok().and_then(|c| c.parse().ok()).unwrap_or(0);
                }
                true
            },
            |_, _| {},
        );
        match reaction {
            ServerReaction::Ok => {
                let body_size = parse_state.body_size().max(0) as usize;
                if buffer.len() >= header_end + body_size {
                    return HttpResponse {
                        status,
                        body: buffer[header_end..header_end + body_size].to_vec(),
                    };
                }
            }
            ServerReaction::ReadOn => {}
            ServerReaction::WrongReply | ServerReaction::Disconnect => break,
        }
        let read = stream.read(&mut scratch).await.expect("read succeeds");
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&scratch[..read]);
    }
    HttpResponse { status, body: buffer }
}

#[tokio::test]
async fn notification_without_id_yields_204_with_no_body() {
    let (addr, cancel) = start_server().await;
    let response = post(addr, br#"{"jsonrpc":"2.0","method":"math.sum","params":{"left":1,"right":2}}"#).await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
    cancel.cancel();
}

#[tokio::test]
async fn integer_id_call_yields_200_with_result() {
    let (addr, cancel) = start_server().await;
    let response = post(addr, br#"{"jsonrpc":"2.0","id":7,"method":"math.sum","params":{"left":2,"right":3}}"#).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["result"], 5);
    assert_eq!(body["id"], 7);
    cancel.cancel();
}

#[tokio::test]
async fn unknown_method_yields_method_not_found() {
    let (addr, cancel) = start_server().await;
    let response = post(addr, br#"{"jsonrpc":"2.0","id":1,"method":"no.such.method","params":[]}"#).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"]["code"], -32601);
    cancel.cancel();
}

#[tokio::test]
async fn malformed_json_yields_parse_error_with_null_id() {
    let (addr, cancel) = start_server().await;
    let response = post(addr, b"{ this is not json").await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
    cancel.cancel();
}

#[tokio::test]
async fn batch_of_three_preserves_order_and_isolates_errors() {
    let (addr, cancel) = start_server().await;
    let batch = br#"[
        {"jsonrpc":"2.0","id":1,"method":"math.sum","params":{"left":1,"right":1}},
        {"jsonrpc":"2.0","id":2,"method":"no.such.method","params":{}},
        {"jsonrpc":"2.0","id":3,"method":"math.multiply","params":{"left":3,"right":3}}
    ]"#;
    let response = post(addr, batch).await;
    assert_eq!(response.status, 200);
    let text = String::from_utf8(response.body).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    let array = parsed.as_array().expect("batch response is an array");
    assert_eq!(array.len(), 3);
    assert_eq!(array[0]["id"], 1);
    assert_eq!(array[0]["result"], 2);
    assert_eq!(array[1]["id"], 2);
    assert_eq!(array[1]["error"]["code"], -32601);
    assert_eq!(array[2]["id"], 3);
    assert_eq!(array[2]["result"], 9);
    cancel.cancel();
}

#[tokio::test]
async fn get_on_an_unknown_path_yields_404() {
    let (addr, cancel) = start_server().await;
    let response = get(addr, "/../etc/passwd").await;
    assert_eq!(response.status, 404);
    cancel.cancel();
}
