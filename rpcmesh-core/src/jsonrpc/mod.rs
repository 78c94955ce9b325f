//! JSON-RPC 2.0 dispatch: turns one buffered HTTP body into a response
//! body by resolving a dotted method path against a [`Callable`] tree and
//! invoking it, in either direction.
//!
//! The server half ([`dispatch`], wired into [`crate::http::server`] via
//! [`JsonRpcService`]) tolerates `jsonrpc`/`id`/`method`/`params` arriving
//! in any order, since the whole body is already buffered before dispatch
//! starts — there is no need to track "have we seen the method yet" the
//! way a one-pass streaming reader would. A request is scanned once to
//! capture each recognized member's raw text span, then the members are
//! consulted in the order dispatch actually needs them.
//!
//! A request with no `id` is a notification: it is still invoked (for its
//! side effects), but produces no response at all, matching the member
//! JSON-RPC never responds to. The one exception is a request whose shape
//! is invalid before `id` could even be determined (malformed JSON, a
//! non-object top level, a wrong `jsonrpc` version, a missing `method`) —
//! those always get an error response with `"id": null`, because the
//! server cannot know whether the sender intended a notification.
//!
//! The client half ([`call_remote`]) is the mirror: it wraps a call's
//! arguments in the same envelope and hands the token to a
//! [`crate::rpc::Future`].

use std::sync::Arc;

use crate::error::{wire_codes, Result, RpcError};
use crate::flags::Flags;
use crate::http::server::{PostOutcome, PostResponder};
use crate::io::{MemberType, StructuredInput, StructuredOutput};
use crate::rpc::{ArgDescriptor, ArgTuple, Callable, Future, Responder, write_call_arguments};
use crate::typed::TypedSerialiser;

use crate::codec::json::JsonInput;
pub use crate::codec::json::JsonOutput;

const JSONRPC_VERSION: &str = "2.0";

/// Skips one value on a JSON input. The JSON codec's `skip_object_element`
/// only ever returns [`RpcError::Logic`] for formats with no generic skip
/// (the binary codec); on JSON it is infallible.
fn skip_json_element(input: &mut dyn StructuredInput) {
    input
        .skip_object_element(Flags::none())
        .expect("json never raises a fatal error skipping a value");
}

/// A [`PostResponder`] that dispatches every request body through a
/// [`Callable`] tree as JSON-RPC 2.0. Wire this into
/// [`crate::http::server::bind`] alongside whatever [`crate::http::server::GetResponder`]
/// serves static description documents.
pub struct JsonRpcService {
    root: Arc<dyn Callable>,
}

impl JsonRpcService {
    #[must_use]
    pub fn new(root: Arc<dyn Callable>) -> Self {
        Self { root }
    }
}

impl PostResponder for JsonRpcService {
    fn post(&self, _path: &str, content_type: &str, body: &[u8]) -> Option<PostOutcome> {
        if content_type != "application/json" {
            return None;
        }
        let text = std::str::from_utf8(body).ok()?;
        Some(match dispatch(self.root.as_ref(), text) {
            DispatchOutcome::Response(content_type, body) => PostOutcome::Response(content_type, body),
            DispatchOutcome::NoResponse => PostOutcome::Response(String::new(), Vec::new()),
            DispatchOutcome::Fatal => PostOutcome::Fatal,
        })
    }
}

/// What a dispatch pass produced, for [`JsonRpcService::post`] to turn
/// into an HTTP-level outcome.
pub enum DispatchOutcome {
    /// `(content_type, body)` for an ordinary JSON-RPC response.
    Response(String, Vec<u8>),
    /// The request was a notification (or an all-notification batch); no
    /// response body is sent.
    NoResponse,
    /// A callable raised [`RpcError::Logic`] or [`RpcError::Transport`].
    /// Per spec.md's error taxonomy this is fatal for the session: no wire
    /// response is produced and the connection is closed.
    Fatal,
}

/// One request object or batch element's dispatch result, before it is
/// folded into a [`DispatchOutcome`].
enum Dispatched {
    /// A notification; nothing should be written for it.
    Silent,
    /// A complete JSON-RPC response body.
    Response(String),
    /// A fatal error ended the exchange.
    Fatal,
}

/// Dispatches one buffered JSON-RPC body (a single request object or a
/// batch array) against `root`.
#[must_use]
pub fn dispatch(root: &dyn Callable, body: &str) -> DispatchOutcome {
    let mut probe = JsonInput::new(body);
    let dispatched = if probe.identify_type(Flags::none()) == MemberType::Array {
        dispatch_batch(root, body)
    } else {
        dispatch_one(root, body)
    };
    match dispatched {
        Dispatched::Fatal => DispatchOutcome::Fatal,
        Dispatched::Silent => DispatchOutcome::NoResponse,
        Dispatched::Response(body) => DispatchOutcome::Response("application/json".to_string(), body.into_bytes()),
    }
}

fn dispatch_batch(root: &dyn Callable, body: &str) -> Dispatched {
    let mut input = JsonInput::new(body);
    let mut elements = Vec::new();
    input
        .start_reading_array(Flags::none())
        .expect("json never raises a fatal error opening an array");
    while input.next_array_element(Flags::none()) {
        let start = input.store_position(Flags::none()).offset();
        input
            .skip_object_element(Flags::none())
            .expect("json never raises a fatal error skipping a value");
        let end = input.store_position(Flags::none()).offset();
        elements.push((start, end));
    }
    input.end_reading_array(Flags::none());

    if !input.good() {
        return Dispatched::Response(error_response(None, wire_codes::PARSE_ERROR, "malformed batch request"));
    }

    let mut responses = Vec::new();
    for (start, end) in elements {
        match dispatch_one(root, &body[start..end]) {
            Dispatched::Fatal => return Dispatched::Fatal,
            Dispatched::Response(body) => responses.push(body),
            Dispatched::Silent => {}
        }
    }

    if responses.is_empty() {
        Dispatched::Silent
    } else {
        Dispatched::Response(format!("[{}]", responses.join(",")))
    }
}

/// Dispatches one request object.
fn dispatch_one(root: &dyn Callable, text: &str) -> Dispatched {
    let mut probe = JsonInput::new(text);
    if probe.identify_type(Flags::none()) != MemberType::Object {
        return Dispatched::Response(error_response(None, wire_codes::INVALID_REQUEST, "request must be a JSON object"));
    }

    let mut input = JsonInput::new(text);
    let mut jsonrpc_ok = false;
    let mut id_present = false;
    let mut id_span = None;
    let mut method = None;
    let mut params_span = None;

    input.read_object(Flags::none(), &mut |input, name, _index| {
        match name {
            Some("jsonrpc") => jsonrpc_ok = input.read_string(Flags::none()) == JSONRPC_VERSION,
            Some("id") => {
                id_present = true;
                let start = input.store_position(Flags::none()).offset();
                skip_json_element(input);
                let end = input.store_position(Flags::none()).offset();
                id_span = Some((start, end));
            }
            Some("method") => method = Some(input.read_string(Flags::none())),
            Some("params") => {
                let start = input.store_position(Flags::none()).offset();
                skip_json_element(input);
                let end = input.store_position(Flags::none()).offset();
                params_span = Some((start, end));
            }
            _ => skip_json_element(input),
        }
        true
    });

    if !input.good() {
        return Dispatched::Response(error_response(None, wire_codes::PARSE_ERROR, "malformed request body"));
    }

    let id_text = id_span.map(|(start, end)| text[start..end].to_string());

    if !jsonrpc_ok {
        return Dispatched::Response(error_response(
            id_text.as_deref(),
            wire_codes::INVALID_REQUEST,
            "unsupported or missing jsonrpc version",
        ));
    }

    let Some(method) = method else {
        return Dispatched::Response(error_response(id_text.as_deref(), wire_codes::INVALID_REQUEST, "missing method"));
    };

    let responding = id_present;

    let Some(callable) = root.resolve(&method) else {
        return if responding {
            Dispatched::Response(error_response(
                id_text.as_deref(),
                wire_codes::METHOD_NOT_FOUND,
                &format!("method not found: {method}"),
            ))
        } else {
            Dispatched::Silent
        };
    };

    let mut params_input = params_span.map(|(start, end)| JsonInput::new(&text[start..end]));
    let params: Option<&mut dyn StructuredInput> = params_input.as_mut().map(|p| p as &mut dyn StructuredInput);

    if !responding {
        // A notification is still invoked for effect; its result is
        // discarded, but a fatal error it raises still ends the session.
        let mut sink = JsonOutput::new();
        return match callable.call(params, &mut sink, &mut |_| {}, Flags::none()) {
            Err(err) if err.is_fatal() => Dispatched::Fatal,
            _ => Dispatched::Silent,
        };
    }

    match success_response(id_text.as_deref(), callable, params) {
        Ok(body) => Dispatched::Response(body),
        Err(err) if err.is_fatal() => Dispatched::Fatal,
        Err(err) => Dispatched::Response(error_response(
            id_text.as_deref(),
            err.wire_code().unwrap_or(wire_codes::INTERNAL_ERROR),
            &err.to_string(),
        )),
    }
}

fn success_response(
    id_text: Option<&str>,
    callable: &dyn Callable,
    params: Option<&mut dyn StructuredInput>,
) -> Result<String> {
    let mut out = JsonOutput::new();
    out.start_writing_object(Flags::none(), Some(3));
    out.introduce_object_member(Flags::none(), "jsonrpc", 0);
    out.write_string(Flags::none(), JSONRPC_VERSION);
    out.introduce_object_member(Flags::none(), "id", 1);
    write_id(&mut out, id_text);

    callable.call(
        params,
        &mut out,
        &mut |out| out.introduce_object_member(Flags::none(), "result", 2),
        Flags::none(),
    )?;

    out.end_writing_object(Flags::none());
    Ok(out.into_string())
}

fn error_response(id_text: Option<&str>, code: i64, message: &str) -> String {
    let mut out = JsonOutput::new();
    out.start_writing_object(Flags::none(), Some(3));
    out.introduce_object_member(Flags::none(), "jsonrpc", 0);
    out.write_string(Flags::none(), JSONRPC_VERSION);
    out.introduce_object_member(Flags::none(), "id", 1);
    write_id(&mut out, id_text);
    out.introduce_object_member(Flags::none(), "error", 2);
    out.start_writing_object(Flags::none(), Some(2));
    out.introduce_object_member(Flags::none(), "code", 0);
    out.write_int(Flags::none(), code);
    out.introduce_object_member(Flags::none(), "message", 1);
    out.write_string(Flags::none(), message);
    out.end_writing_object(Flags::none());
    out.end_writing_object(Flags::none());
    out.into_string()
}

/// Writes `id_text` (the raw, still-undecoded JSON text captured for the
/// incoming `id` member) back out preserving its JSON type — an integer,
/// string, or float `id` is echoed as the same kind of value; anything
/// else, including an absent `id`, becomes `null`.
fn write_id(out: &mut dyn StructuredOutput, id_text: Option<&str>) {
    let Some(raw) = id_text else {
        out.write_null(Flags::none());
        return;
    };
    let mut probe = JsonInput::new(raw);
    match probe.identify_type(Flags::none()) {
        MemberType::Integer => out.write_int(Flags::none(), probe.read_int(Flags::none())),
        MemberType::Float => out.write_float(Flags::none(), probe.read_float(Flags::none())),
        MemberType::String => out.write_string(Flags::none(), &probe.read_string(Flags::none())),
        _ => out.write_null(Flags::none()),
    }
}

/// Sends `args` to `method` through `responder`, wrapping them in a
/// JSON-RPC request envelope under a freshly assigned token. This is the
/// client-side mirror of [`dispatch`]; `rpcmesh_derive::rpc_method!`
/// generates the call sites that use it.
pub fn call_remote<'a, Args, R>(
    responder: &'a dyn Responder,
    method: &str,
    descriptors: &'static [ArgDescriptor],
    args: &Args,
    flags: Flags,
) -> Future<'a, R>
where
    Args: ArgTuple,
    R: TypedSerialiser + Default,
{
    let token = responder.send(&mut |out, token| {
        out.start_writing_object(Flags::none(), Some(4));
        out.introduce_object_member(Flags::none(), "jsonrpc", 0);
        out.write_string(Flags::none(), JSONRPC_VERSION);
        out.introduce_object_member(Flags::none(), "id", 1);
        out.write_int(Flags::none(), i64::from(token.as_u32()));
        out.introduce_object_member(Flags::none(), "method", 2);
        out.write_string(Flags::none(), method);
        out.introduce_object_member(Flags::none(), "params", 3);
        write_call_arguments(args, descriptors, out, flags);
        out.end_writing_object(Flags::none());
    });
    Future::pending(responder, token, flags)
}

/// Splits a JSON-RPC response envelope into the raw text span of its
/// `result` member.
///
/// # Errors
/// Returns [`RpcError::Remote`] (with `code`/`message`/`data` taken from
/// the response) if the envelope carries an `"error"` member instead of a
/// `"result"`.
pub fn unwrap_response(body: &str) -> Result<Option<(usize, usize)>> {
    let mut input = JsonInput::new(body);
    let mut result_span = None;
    let mut error_seen = false;
    let mut error_code = 0_i64;
    let mut error_message = String::new();
    let mut error_data = None;

    input.read_object(Flags::none(), &mut |input, name, _index| {
        match name {
            Some("result") => {
                let start = input.store_position(Flags::none()).offset();
                skip_json_element(input);
                let end = input.store_position(Flags::none()).offset();
                result_span = Some((start, end));
            }
            Some("error") => {
                error_seen = true;
                input.read_object(Flags::none(), &mut |input, name, _index| {
                    match name {
                        Some("code") => error_code = input.read_int(Flags::none()),
                        Some("message") => error_message = input.read_string(Flags::none()),
                        Some("data") => {
                            let start = input.store_position(Flags::none()).offset();
                            skip_json_element(input);
                            let end = input.store_position(Flags::none()).offset();
                            error_data = serde_json::from_str(&body[start..end]).ok();
                        }
                        _ => skip_json_element(input),
                    }
                    true
                });
            }
            _ => skip_json_element(input),
        }
        true
    });

    if error_seen {
        return Err(RpcError::Remote {
            code: error_code,
            message: error_message,
            data: error_data,
        });
    }
    Ok(result_span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{ArgDescriptor as Arg, RpcLambda, RpcObjectBuilder};

    fn sum_tree() -> RpcObjectBuilder {
        static SUM_ARGS: &[Arg] = &[Arg::new("first"), Arg::new("second")];
        RpcObjectBuilder::new().child("sum", RpcLambda::new(|(a, b): (i64, i64)| a + b, SUM_ARGS))
    }

    fn expect_response(outcome: DispatchOutcome) -> (String, Vec<u8>) {
        match outcome {
            DispatchOutcome::Response(content_type, body) => (content_type, body),
            DispatchOutcome::NoResponse => panic!("expected a response, got none"),
            DispatchOutcome::Fatal => panic!("expected a response, got a fatal outcome"),
        }
    }

    fn expect_no_response(outcome: DispatchOutcome) {
        assert!(matches!(outcome, DispatchOutcome::NoResponse));
    }

    /// A leaf that always raises a fatal error, for exercising session
    /// termination.
    struct AlwaysFatal;

    impl Callable for AlwaysFatal {
        fn call(
            &self,
            _args: Option<&mut dyn StructuredInput>,
            _result: &mut dyn StructuredOutput,
            _introduce_result: &mut dyn FnMut(&mut dyn StructuredOutput),
            _flags: Flags,
        ) -> Result<()> {
            Err(RpcError::Logic("boom".to_string()))
        }
    }

    fn fatal_tree() -> RpcObjectBuilder {
        RpcObjectBuilder::new().child("boom", AlwaysFatal)
    }

    #[test]
    fn single_request_round_trips_a_result() {
        let root = sum_tree().build();
        let (content_type, body) = expect_response(dispatch(
            &root,
            r#"{"jsonrpc":"2.0","id":1,"method":"sum","params":{"first":2,"second":3}}"#,
        ));
        assert_eq!(content_type, "application/json");
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\"result\": 5"));
        assert!(text.contains("\"id\": 1"));
    }

    #[test]
    fn out_of_order_members_dispatch_the_same_way() {
        let root = sum_tree().build();
        let (_, body) = expect_response(dispatch(
            &root,
            r#"{"params":{"first":2,"second":3},"method":"sum","id":1,"jsonrpc":"2.0"}"#,
        ));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("\"result\": 5"));
    }

    #[test]
    fn notification_produces_no_response() {
        let root = sum_tree().build();
        expect_no_response(dispatch(&root, r#"{"jsonrpc":"2.0","method":"sum","params":{"first":2,"second":3}}"#));
    }

    #[test]
    fn unknown_method_reports_method_not_found() {
        let root = sum_tree().build();
        let (_, body) = expect_response(dispatch(&root, r#"{"jsonrpc":"2.0","id":1,"method":"missing"}"#));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains(&wire_codes::METHOD_NOT_FOUND.to_string()));
    }

    #[test]
    fn notification_to_an_unknown_method_is_silent() {
        let root = sum_tree().build();
        expect_no_response(dispatch(&root, r#"{"jsonrpc":"2.0","method":"missing"}"#));
    }

    #[test]
    fn non_object_top_level_is_an_invalid_request() {
        let root = sum_tree().build();
        let (_, body) = expect_response(dispatch(&root, "5"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains(&wire_codes::INVALID_REQUEST.to_string()));
        assert!(text.contains("\"id\": null"));
    }

    #[test]
    fn malformed_batch_gets_a_parse_error() {
        let root = sum_tree().build();
        let (_, body) = expect_response(dispatch(&root, "[1, 2"));
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains(&wire_codes::PARSE_ERROR.to_string()));
    }

    #[test]
    fn batch_isolates_failures_and_drops_notifications() {
        let root = sum_tree().build();
        let (content_type, body) = expect_response(dispatch(
            &root,
            r#"[
                {"jsonrpc":"2.0","id":1,"method":"sum","params":{"first":1,"second":1}},
                {"jsonrpc":"2.0","method":"sum","params":{"first":9,"second":9}},
                {"jsonrpc":"2.0","id":2,"method":"missing"}
            ]"#,
        ));
        assert_eq!(content_type, "application/json");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with('['));
        assert!(text.contains("\"result\": 2"));
        assert!(text.contains(&wire_codes::METHOD_NOT_FOUND.to_string()));
        // The dropped notification must not leave a stray element behind.
        assert_eq!(text.matches("\"jsonrpc\"").count(), 2);
    }

    #[test]
    fn all_notification_batch_produces_no_response() {
        let root = sum_tree().build();
        expect_no_response(dispatch(
            &root,
            r#"[{"jsonrpc":"2.0","method":"sum","params":{"first":1,"second":1}}]"#,
        ));
    }

    #[test]
    fn a_fatal_callable_error_ends_the_session_instead_of_a_wire_response() {
        let root = fatal_tree().build();
        let outcome = dispatch(&root, r#"{"jsonrpc":"2.0","id":1,"method":"boom"}"#);
        assert!(matches!(outcome, DispatchOutcome::Fatal));
    }

    #[test]
    fn a_fatal_callable_error_inside_a_batch_aborts_the_whole_batch() {
        let root = fatal_tree().build();
        let outcome = dispatch(
            &root,
            r#"[
                {"jsonrpc":"2.0","id":1,"method":"boom"},
                {"jsonrpc":"2.0","id":2,"method":"boom"}
            ]"#,
        );
        assert!(matches!(outcome, DispatchOutcome::Fatal));
    }

    #[test]
    fn a_fatal_notification_error_still_ends_the_session() {
        let root = fatal_tree().build();
        let outcome = dispatch(&root, r#"{"jsonrpc":"2.0","method":"boom"}"#);
        assert!(matches!(outcome, DispatchOutcome::Fatal));
    }

    #[test]
    fn unwrap_response_locates_the_result_span() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":5}"#;
        let span = unwrap_response(body).unwrap().unwrap();
        assert_eq!(&body[span.0..span.1], "5");
    }

    #[test]
    fn unwrap_response_propagates_an_error_member() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"no such method"}}"#;
        let err = unwrap_response(body).unwrap_err();
        assert!(matches!(
            err,
            RpcError::Remote { code: wire_codes::METHOD_NOT_FOUND, .. }
        ));
    }
}
