//! Blocking HTTP client used as the transport underneath a bound
//! [`crate::rpc::RpcLambda`]: owns one outbound TCP connection, the next
//! token to assign, and a map of responses that arrived out of the
//! expected order and are waiting to be claimed.
//!
//! The [`crate::rpc::Responder`] contract this implements is itself
//! blocking (`get_response` returns only once the answer is in hand), so
//! this client deliberately sits on `std::net::TcpStream` rather than
//! `tokio` — there is no async runtime to suspend into here, only a
//! socket read loop a calling thread blocks on. The server side of this
//! crate (`http::server`) is the half built on `tokio::net`.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use super::framing::{HttpParseState, ServerReaction};
use crate::error::{Result, RpcError};
use crate::io::{RequestToken, StructuredInput, StructuredOutput};
use crate::rpc::Responder;

struct ClientState {
    stream: TcpStream,
    last_token_written: RequestToken,
    last_token_read: RequestToken,
    buffered: HashMap<RequestToken, Vec<u8>>,
    read_buffer: Vec<u8>,
}

/// A blocking HTTP + JSON-RPC client bound to one server connection.
pub struct HttpClient {
    state: Mutex<ClientState>,
    virtual_host: String,
}

impl HttpClient {
    /// Connects to `addr` and prepares to send requests with `Host:
    /// virtual_host`.
    pub fn connect(addr: &str, virtual_host: impl Into<String>) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self {
            state: Mutex::new(ClientState {
                stream,
                last_token_written: RequestToken::zero(),
                last_token_read: RequestToken::zero(),
                buffered: HashMap::new(),
                read_buffer: Vec::new(),
            }),
            virtual_host: virtual_host.into(),
        })
    }

    /// Sends a POST request with the given content type, letting `write_body`
    /// append the body bytes. Returns the token assigned to this request —
    /// tokens increase by exactly one per send and are never reused.
    pub fn send_post(&self, content_type: &str, write_body: impl FnOnce(&mut Vec<u8>)) -> RequestToken {
        let mut body = Vec::new();
        write_body(&mut body);

        let mut state = self.state.lock().expect("client mutex poisoned");
        let mut request = Vec::new();
        request.extend_from_slice(b"POST / HTTP/1.1\r\nContent-Length: ");
        request.extend_from_slice(body.len().to_string().as_bytes());
        request.extend_from_slice(b"\r\nHost: ");
        request.extend_from_slice(self.virtual_host.as_bytes());
        request.extend_from_slice(b"\r\nContent-Type: ");
        request.extend_from_slice(content_type.as_bytes());
        request.extend_from_slice(b"\r\n\r\n");
        request.extend_from_slice(&body);

        let _ = state.stream.write_all(&request);
        state.last_token_written = state.last_token_written.next();
        state.last_token_written
    }

    /// Reads and parses responses off the wire until one for `token` is
    /// available, feeding it to `reader`. Responses for other tokens are
    /// buffered for a later call.
    fn await_response(&self, token: RequestToken, reader: &mut dyn FnMut(&[u8])) -> Result<()> {
        let mut state = self.state.lock().expect("client mutex poisoned");
        if let Some(body) = state.buffered.remove(&token) {
            reader(&body);
            return Ok(());
        }

        let mut scratch = [0_u8; 8192];
        loop {
            let mut parse_state = HttpParseState::new();
            let mut status_code = 0_u16;
            loop {
                let (reaction, header_end) = parse_state.parse(
                    &state.read_buffer,
                    |line| {
                        let mut parts = line.splitn(3, |&b| b == b' ');
                        let _protocol = parts.next();
                        if let Some(code) = parts.next() {
                            status_code = std::str::from_utf8(code).ok().and_then(|c| c.parse().ok()).unwrap_or(0);
                        }
                        true
                    },
                    |_, _| {},
                );
                match reaction {
                    ServerReaction::Ok => {
                        let body_size = parse_state.body_size().max(0) as usize;
                        if state.read_buffer.len() < header_end + body_size {
                            // fall through to read more bytes
                        } else {
                            let body = state.read_buffer[header_end..header_end + body_size].to_vec();
                            let consumed = header_end + body_size;
                            state.read_buffer.drain(..consumed);

                            let next_expected = RequestToken::from_u32(state.last_token_read.as_u32().wrapping_add(1));
                            let parsed_token = extract_json_rpc_id(&body).unwrap_or(next_expected);

                            if status_code >= 200 && status_code < 300 && parsed_token == token {
                                state.last_token_read = parsed_token;
                                reader(&body);
                                return Ok(());
                            }
                            state.last_token_read = parsed_token;
                            state.buffered.insert(parsed_token, body);
                            break;
                        }
                    }
                    ServerReaction::ReadOn => {}
                    _ => return Err(RpcError::Transport("malformed HTTP response".to_string())),
                }
                let read = state
                    .stream
                    .read(&mut scratch)
                    .map_err(|e| RpcError::Transport(e.to_string()))?;
                if read == 0 {
                    return Err(RpcError::Transport("connection closed".to_string()));
                }
                state.read_buffer.extend_from_slice(&scratch[..read]);
            }
            if let Some(body) = state.buffered.remove(&token) {
                reader(&body);
                return Ok(());
            }
        }
    }
}

/// Pulls `"id":N` out of a JSON-RPC response body without a full parse —
/// used only to demultiplex out-of-order responses.
fn extract_json_rpc_id(body: &[u8]) -> Option<RequestToken> {
    let text = std::str::from_utf8(body).ok()?;
    let key = "\"id\":";
    let start = text.find(key)? + key.len();
    let rest = text[start..].trim_start();
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse::<u32>().ok().map(RequestToken::from_u32)
}

impl Responder for HttpClient {
    fn send(&self, write_request: &mut dyn FnMut(&mut dyn StructuredOutput, RequestToken)) -> RequestToken {
        use crate::codec::json::JsonOutput;
        let mut out = JsonOutput::new();
        let token = {
            let state = self.state.lock().expect("client mutex poisoned");
            RequestToken::from_u32(state.last_token_written.as_u32().wrapping_add(1))
        };
        write_request(&mut out, token);
        let body = out.into_string();
        self.send_post("application/json", |buf| buf.extend_from_slice(body.as_bytes()))
    }

    fn get_response(
        &self,
        token: RequestToken,
        read_response: &mut dyn FnMut(&mut dyn StructuredInput),
    ) -> Result<()> {
        use crate::codec::json::JsonInput;
        use crate::jsonrpc::unwrap_response;
        let mut outcome = Ok(());
        self.await_response(token, &mut |body| {
            let text = String::from_utf8_lossy(body).into_owned();
            match unwrap_response(&text) {
                Ok(Some((start, end))) => read_response(&mut JsonInput::new(&text[start..end])),
                Ok(None) => read_response(&mut JsonInput::new("null")),
                Err(err) => outcome = Err(err),
            }
        })?;
        outcome
    }

    fn has_response(&self, token: RequestToken) -> bool {
        self.state
            .lock()
            .expect("client mutex poisoned")
            .buffered
            .contains_key(&token)
    }
}
