//! HTTP server: a per-connection session state machine (`Uninvestigated →
//! {Get, Post, Weird}`) driven over raw bytes, plus a `tokio`-based
//! listener that feeds it from a socket.
//!
//! The session logic is deliberately independent of any particular async
//! runtime — [`HttpSession::respond`] is a synchronous function over byte
//! slices, so the framing behavior (status lines, back-patched
//! `Content-Length`, the canned 4xx/5xx bodies) is unit-testable without a
//! socket. [`bind`] is the thin `tokio::net` shim around it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::framing::{HttpParseState, ServerReaction};

/// Handles `GET` requests for a static/dynamic resource by path.
pub trait GetResponder: Send + Sync {
    /// Returns `(content_type, body)` on success; `None` yields a 404.
    fn get(&self, path: &str) -> Option<(String, Vec<u8>)>;
}

/// Handles `POST` requests carrying a body.
pub trait PostResponder: Send + Sync {
    /// Returns `None` to yield a 400. `Some(PostOutcome::Fatal)` ends the
    /// connection instead of producing a normal response.
    fn post(&self, path: &str, content_type: &str, body: &[u8]) -> Option<PostOutcome>;
}

/// What handling one POST body produced.
pub enum PostOutcome {
    /// `(content_type, body)` for an ordinary 200 (or 204 if both are
    /// empty) response.
    Response(String, Vec<u8>),
    /// The request triggered an unrecoverable error (a fatal
    /// [`crate::error::RpcError`] — `Logic` or `Transport`). A 500 is sent
    /// and the connection is closed rather than kept alive.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestType {
    Uninvestigated,
    Get,
    Post,
    Weird,
}

/// Per-connection parsing/dispatch state. Own one per accepted socket;
/// `respond` consumes exactly the bytes of one request per call and can
/// be called again immediately for the next request on a keep-alive
/// connection.
pub struct HttpSession<G, P> {
    get_responder: Arc<G>,
    post_responder: Arc<P>,
    request_type: RequestType,
    path: (usize, usize),
    content_type: (usize, usize),
    close_after: bool,
    state: HttpParseState,
}

impl<G: GetResponder, P: PostResponder> HttpSession<G, P> {
    #[must_use]
    pub fn new(get_responder: Arc<G>, post_responder: Arc<P>) -> Self {
        Self {
            get_responder,
            post_responder,
            request_type: RequestType::Uninvestigated,
            path: (0, 0),
            content_type: (0, 0),
            close_after: false,
            state: HttpParseState::new(),
        }
    }

    fn restore(&mut self) {
        self.state.reset();
        self.request_type = RequestType::Uninvestigated;
        self.close_after = false;
    }

    /// Feeds `input` (everything read so far on this connection) to the
    /// session. Returns the reaction, how many leading bytes of `input`
    /// were consumed, and the response bytes to write (empty unless the
    /// reaction is `Ok`).
    pub fn respond(&mut self, input: &[u8]) -> (ServerReaction, usize, Vec<u8>) {
        if self.state.body_size() == -1 {
            let mut request_type = self.request_type;
            let mut path = self.path;
            let (reaction, position) = self.state.parse(
                input,
                |line| {
                    let mut parts = line.splitn(3, |&b| b == b' ');
                    let method = parts.next().unwrap_or(b"");
                    let path_bytes = parts.next().unwrap_or(b"");
                    let protocol = parts.next().unwrap_or(b"");
                    request_type = match method {
                        b"GET" => RequestType::Get,
                        b"POST" => RequestType::Post,
                        _ => RequestType::Weird,
                    };
                    if protocol != b"HTTP/1.1" && protocol != b"HTTP/1.0" {
                        request_type = RequestType::Weird;
                    }
                    let offset = method.len() + 1;
                    path = (offset, offset + path_bytes.len());
                    true
                },
                |name, value| {
                    if name == b"Connection" && value == b"close" {
                        self.close_after = true;
                    }
                },
            );
            self.request_type = request_type;
            self.path = path;
            if reaction != ServerReaction::Ok {
                return (reaction, position, Vec::new());
            }
        }

        if self.request_type != RequestType::Post {
            self.state.set_body_size(0);
        }
        let header_end = self.state.header_end();
        let body_size = self.state.body_size();
        let consuming = (header_end as i64 + body_size.max(0)) as usize;

        match self.request_type {
            RequestType::Get | RequestType::Post => {
                if self.request_type == RequestType::Post
                    && (body_size == -1 || input.len() < header_end + body_size as usize)
                {
                    return (ServerReaction::ReadOn, input.len(), Vec::new());
                }

                let path = String::from_utf8_lossy(&input[self.path.0..self.path.1]).into_owned();
                let (response, fatal) = if self.request_type == RequestType::Get {
                    let response = match self.get_responder.get(&path) {
                        Some((content_type, body)) => build_ok_response(&content_type, &body),
                        None => not_found_response(),
                    };
                    (response, false)
                } else {
                    let body = &input[header_end..header_end + body_size as usize];
                    let content_type =
                        String::from_utf8_lossy(&input[self.content_type.0..self.content_type.1]).into_owned();
                    match self.post_responder.post(&path, &content_type, body) {
                        Some(PostOutcome::Response(content_type, body)) => (build_ok_response(&content_type, &body), false),
                        Some(PostOutcome::Fatal) => (internal_error_response(), true),
                        None => (bad_request_response(), false),
                    }
                };

                let ending = if fatal || self.close_after {
                    ServerReaction::Disconnect
                } else {
                    ServerReaction::Ok
                };
                self.restore();
                (ending, consuming, response)
            }
            RequestType::Weird | RequestType::Uninvestigated => {
                let response = not_implemented_response();
                self.restore();
                (ServerReaction::Disconnect, input.len(), response)
            }
        }
    }
}

fn build_ok_response(content_type: &str, body: &[u8]) -> Vec<u8> {
    if body.is_empty() && content_type.is_empty() {
        return b"HTTP/1.1 204 No Content\r\n\r\n".to_vec();
    }
    let mut response = Vec::new();
    response.extend_from_slice(b"HTTP/1.1 200 OK\r\nContent-Length: ");
    response.extend_from_slice(body.len().to_string().as_bytes());
    response.extend_from_slice(b"\r\nContent-Type: ");
    response.extend_from_slice(content_type.as_bytes());
    response.extend_from_slice(b"\r\n\r\n");
    response.extend_from_slice(body);
    response
}

fn not_found_response() -> Vec<u8> {
    const BODY: &[u8] = b"<!doctype html><html lang=en><title>Error 404: Resource not found</title>";
    canned_response(404, "Not Found", BODY)
}

fn bad_request_response() -> Vec<u8> {
    const BODY: &[u8] = b"<!doctype html><html lang=en><title>Error 400: Bad request</title>";
    canned_response(400, "Bad Request", BODY)
}

fn internal_error_response() -> Vec<u8> {
    const BODY: &[u8] = b"<!doctype html><html lang=en><title>Error 500: Internal server error</title>";
    canned_response(500, "Internal Server Error", BODY)
}

fn not_implemented_response() -> Vec<u8> {
    const BODY: &[u8] = b"<!doctype html><html lang=en><title>Error 501: Method not implemented</title>";
    canned_response(501, "Method Not Implemented", BODY)
}

fn canned_response(code: u16, reason: &str, body: &[u8]) -> Vec<u8> {
    let mut response = Vec::new();
    response.extend_from_slice(format!("HTTP/1.1 {code} {reason}\r\nContent-Length: {}\r\n\r\n", body.len()).as_bytes());
    response.extend_from_slice(body);
    response
}

/// Accepts connections on `bind_addr` until `shutdown` is cancelled,
/// serving each with a fresh [`HttpSession`]. Every accepted connection
/// is handled on its own spawned task; no state is shared between
/// sessions beyond the read-only responders.
pub async fn bind<G, P>(
    bind_addr: &str,
    get_responder: Arc<G>,
    post_responder: Arc<P>,
    shutdown: CancellationToken,
) -> std::io::Result<SocketAddr>
where
    G: GetResponder + 'static,
    P: PostResponder + 'static,
{
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "HTTP server listening");

    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("HTTP server shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    let Ok((socket, peer)) = accepted else { continue };
                    let get_responder = Arc::clone(&get_responder);
                    let post_responder = Arc::clone(&post_responder);
                    let connection_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(error) = serve_connection(socket, get_responder, post_responder, connection_shutdown).await {
                            warn!(%peer, %error, "HTTP connection ended with an error");
                        }
                    });
                }
            }
        }
    });

    Ok(local_addr)
}

async fn serve_connection<G, P>(
    mut socket: TcpStream,
    get_responder: Arc<G>,
    post_responder: Arc<P>,
    shutdown: CancellationToken,
) -> std::io::Result<()>
where
    G: GetResponder,
    P: PostResponder,
{
    let mut session = HttpSession::new(get_responder, post_responder);
    let mut buffer = Vec::new();
    let mut scratch = [0_u8; 8192];

    loop {
        let read = tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            read = socket.read(&mut scratch) => read?,
        };
        if read == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&scratch[..read]);

        loop {
            let (reaction, consumed, response) = session.respond(&buffer);
            match reaction {
                ServerReaction::ReadOn => break,
                ServerReaction::Ok | ServerReaction::Disconnect => {
                    if !response.is_empty() {
                        socket.write_all(&response).await?;
                    }
                    buffer.drain(..consumed.min(buffer.len()));
                    if reaction == ServerReaction::Disconnect {
                        return Ok(());
                    }
                    if buffer.is_empty() {
                        break;
                    }
                }
                ServerReaction::WrongReply => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoGet;
    impl GetResponder for EchoGet {
        fn get(&self, path: &str) -> Option<(String, Vec<u8>)> {
            if path == "/hello" {
                Some(("text/plain".to_string(), b"hi".to_vec()))
            } else {
                None
            }
        }
    }

    struct EchoPost;
    impl PostResponder for EchoPost {
        fn post(&self, _path: &str, _content_type: &str, body: &[u8]) -> Option<PostOutcome> {
            Some(PostOutcome::Response("application/json".to_string(), body.to_vec()))
        }
    }

    struct FatalPost;
    impl PostResponder for FatalPost {
        fn post(&self, _path: &str, _content_type: &str, _body: &[u8]) -> Option<PostOutcome> {
            Some(PostOutcome::Fatal)
        }
    }

    #[test]
    fn get_known_path_returns_200_with_body() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(EchoPost));
        let request = b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n";
        let (reaction, consumed, response) = session.respond(request);
        assert_eq!(reaction, ServerReaction::Ok);
        assert_eq!(consumed, request.len());
        let text = String::from_utf8(response).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.ends_with("hi"));
    }

    #[test]
    fn get_unknown_path_returns_404() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(EchoPost));
        let request = b"GET /../etc/passwd HTTP/1.1\r\nHost: x\r\n\r\n";
        let (reaction, _, response) = session.respond(request);
        assert_eq!(reaction, ServerReaction::Ok);
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 404 Not Found"));
    }

    #[test]
    fn post_with_body_not_yet_fully_arrived_reads_on() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(EchoPost));
        let request = b"POST / HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 10\r\n\r\n{\"a\":1}";
        let (reaction, _, _) = session.respond(request);
        assert_eq!(reaction, ServerReaction::ReadOn);
    }

    #[test]
    fn post_with_complete_body_back_patches_content_length() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(EchoPost));
        let body = b"{\"a\":1}";
        let request = format!(
            "POST / HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            std::str::from_utf8(body).unwrap()
        );
        let (reaction, consumed, response) = session.respond(request.as_bytes());
        assert_eq!(reaction, ServerReaction::Ok);
        assert_eq!(consumed, request.len());
        let text = String::from_utf8(response).unwrap();
        assert!(text.contains(&format!("Content-Length: {}", body.len())));
        assert!(text.ends_with(std::str::from_utf8(body).unwrap()));
    }

    #[test]
    fn connection_close_header_ends_session_after_responding() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(EchoPost));
        let request = b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n";
        let (reaction, _, _) = session.respond(request);
        assert_eq!(reaction, ServerReaction::Disconnect);
    }

    #[test]
    fn a_fatal_post_outcome_sends_500_and_disconnects() {
        let mut session = HttpSession::new(Arc::new(EchoGet), Arc::new(FatalPost));
        let request = b"POST / HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let (reaction, _, response) = session.respond(request);
        assert_eq!(reaction, ServerReaction::Disconnect);
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 500 Internal Server Error"));
    }
}
