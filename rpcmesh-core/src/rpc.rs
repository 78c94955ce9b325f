//! Declarative RPC object tree: procedures as typed, named, discoverable
//! values rather than free functions matched by string at call time.
//!
//! A procedure is built with an explicit argument table (name + flags per
//! parameter) supplied at construction, instead of being probed out of a
//! closure's default arguments. A tree of procedures is assembled with
//! [`RpcObjectBuilder`], which records each child's name at registration
//! time rather than recovering it from a field offset.

use std::marker::PhantomData;

use crate::error::{Result, RpcError};
use crate::flags::Flags;
use crate::io::{RequestToken, StructuredInput, StructuredOutput};
use crate::object::{MethodDescriptionFiller, PropertyDescriptionFiller, SerialisableDescriptionFiller};
use crate::typed::{DescribeType, ListTypes, TypedSerialiser};

/// One entry in a procedure's argument table.
#[derive(Debug, Clone, Copy)]
pub struct ArgDescriptor {
    pub name: &'static str,
    pub flags: Flags,
    /// A single-line doc comment for this parameter, or `""` for none.
    pub doc: &'static str,
}

impl ArgDescriptor {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            flags: Flags::none(),
            doc: "",
        }
    }

    #[must_use]
    pub const fn with_flags(name: &'static str, flags: Flags) -> Self {
        Self { name, flags, doc: "" }
    }

    #[must_use]
    pub const fn with_doc(mut self, doc: &'static str) -> Self {
        self.doc = doc;
        self
    }
}

/// Something that can be invoked over the wire and located by name within
/// a callable tree. Implemented by [`RpcLambda`] (leaf procedures) and
/// [`RpcObject`] (namespaces).
pub trait Callable: Send + Sync {
    /// Invokes this procedure. `args` is `None` for a call with no
    /// parameters object at all (distinct from an empty one). `result`
    /// receives the serialized return value after `introduce_result` is
    /// called to let the caller emit whatever wraps it (e.g. `"result":`).
    fn call(
        &self,
        args: Option<&mut dyn StructuredInput>,
        result: &mut dyn StructuredOutput,
        introduce_result: &mut dyn FnMut(&mut dyn StructuredOutput),
        flags: Flags,
    ) -> Result<()>;

    fn child_by_name(&self, _name: &str) -> Option<&dyn Callable> {
        None
    }

    fn child_by_index(&self, _index: usize) -> Option<&dyn Callable> {
        None
    }

    fn child_name_at(&self, _index: usize) -> Option<&'static str> {
        None
    }

    fn child_count(&self) -> usize {
        0
    }

    /// Resolves a dotted path (`"users.get"`) starting from this node.
    fn resolve(&self, path: &str) -> Option<&dyn Callable> {
        let mut node: &dyn Callable = self;
        for segment in path.split('.') {
            node = node.child_by_name(segment)?;
        }
        Some(node)
    }

    /// Feeds this procedure's own description (doc, parameters, return
    /// value) to `filler`. A no-op for namespaces; [`walk_methods`] only
    /// calls this on leaves.
    fn describe_self(&self, _filler: &mut dyn MethodDescriptionFiller) {}

    /// Feeds every declarative object type this node (or, for a namespace,
    /// anything beneath it) refers to in its parameters or return value to
    /// `filler`, so the service description's top-level `types` map can be
    /// built once, independently of any one method's own description. A
    /// no-op by default: a leaf with only scalar/array/optional parameters
    /// has nothing to contribute here.
    fn list_types(&self, _filler: &mut dyn SerialisableDescriptionFiller) {}
}

/// Walks `root` depth-first, calling `visit(path, node)` once per leaf
/// procedure (a node with no children), keyed by its full dotted path
/// from `root`. This is the tree-walking half of describing a service;
/// the caller supplies a fresh [`MethodDescriptionFiller`] per leaf (via
/// `node.describe_self(...)` inside `visit`) since each method gets its
/// own entry in the resulting document.
pub fn walk_methods(root: &dyn Callable, visit: &mut dyn FnMut(&str, &dyn Callable)) {
    walk_methods_from(root, "", visit);
}

fn walk_methods_from(node: &dyn Callable, prefix: &str, visit: &mut dyn FnMut(&str, &dyn Callable)) {
    if node.child_count() == 0 {
        if !prefix.is_empty() {
            visit(prefix, node);
        }
        return;
    }
    for index in 0..node.child_count() {
        if let (Some(name), Some(child)) = (node.child_name_at(index), node.child_by_index(index)) {
            let path = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}.{name}")
            };
            walk_methods_from(child, &path, visit);
        }
    }
}

/// A namespace: a named group of child [`Callable`]s with no call
/// behavior of its own.
pub struct RpcObject {
    children: Vec<(&'static str, Box<dyn Callable>)>,
}

impl Callable for RpcObject {
    fn call(
        &self,
        _args: Option<&mut dyn StructuredInput>,
        _result: &mut dyn StructuredOutput,
        _introduce_result: &mut dyn FnMut(&mut dyn StructuredOutput),
        _flags: Flags,
    ) -> Result<()> {
        Err(RpcError::MethodNotFound("this node is a namespace, not a procedure".to_string()))
    }

    fn child_by_name(&self, name: &str) -> Option<&dyn Callable> {
        self.children
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c.as_ref())
    }

    fn child_by_index(&self, index: usize) -> Option<&dyn Callable> {
        self.children.get(index).map(|(_, c)| c.as_ref())
    }

    fn child_name_at(&self, index: usize) -> Option<&'static str> {
        self.children.get(index).map(|(n, _)| *n)
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }

    fn list_types(&self, filler: &mut dyn SerialisableDescriptionFiller) {
        for (_, child) in &self.children {
            child.list_types(filler);
        }
    }
}

/// Builds an [`RpcObject`] by registering named children one at a time.
/// This is the explicit substitute for the source's offset-discovery
/// mechanism: the name a child is known by is whatever name it was
/// registered under here, recorded once, not recovered later.
#[derive(Default)]
pub struct RpcObjectBuilder {
    children: Vec<(&'static str, Box<dyn Callable>)>,
}

impl RpcObjectBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(mut self, name: &'static str, callable: impl Callable + 'static) -> Self {
        self.children.push((name, Box::new(callable)));
        self
    }

    #[must_use]
    pub fn build(self) -> RpcObject {
        RpcObject {
            children: self.children,
        }
    }
}

/// A tuple of argument slots a procedure can deserialize into and
/// serialize out of, one member at a time by table index. Implemented for
/// arities 0 through 3; the unit type covers a zero-argument procedure.
pub trait ArgTuple: Default + Send + Sync {
    fn deserialise_at(&mut self, index: usize, input: &mut dyn StructuredInput, flags: Flags);
    fn serialise_at(&self, index: usize, out: &mut dyn StructuredOutput, flags: Flags);
}

impl ArgTuple for () {
    fn deserialise_at(&mut self, _index: usize, _input: &mut dyn StructuredInput, _flags: Flags) {}
    fn serialise_at(&self, _index: usize, _out: &mut dyn StructuredOutput, _flags: Flags) {}
}

impl<A1: TypedSerialiser + Default + Send + Sync> ArgTuple for (A1,) {
    fn deserialise_at(&mut self, index: usize, input: &mut dyn StructuredInput, flags: Flags) {
        if index == 0 {
            A1::deserialise_member(&mut self.0, input, flags);
        }
    }

    fn serialise_at(&self, index: usize, out: &mut dyn StructuredOutput, flags: Flags) {
        if index == 0 {
            A1::serialise_member(&self.0, out, flags);
        }
    }
}

impl<A1: TypedSerialiser + Default + Send + Sync, A2: TypedSerialiser + Default + Send + Sync> ArgTuple
    for (A1, A2)
{
    fn deserialise_at(&mut self, index: usize, input: &mut dyn StructuredInput, flags: Flags) {
        match index {
            0 => A1::deserialise_member(&mut self.0, input, flags),
            1 => A2::deserialise_member(&mut self.1, input, flags),
            _ => {}
        }
    }

    fn serialise_at(&self, index: usize, out: &mut dyn StructuredOutput, flags: Flags) {
        match index {
            0 => A1::serialise_member(&self.0, out, flags),
            1 => A2::serialise_member(&self.1, out, flags),
            _ => {}
        }
    }
}

impl<
        A1: TypedSerialiser + Default + Send + Sync,
        A2: TypedSerialiser + Default + Send + Sync,
        A3: TypedSerialiser + Default + Send + Sync,
    > ArgTuple for (A1, A2, A3)
{
    fn deserialise_at(&mut self, index: usize, input: &mut dyn StructuredInput, flags: Flags) {
        match index {
            0 => A1::deserialise_member(&mut self.0, input, flags),
            1 => A2::deserialise_member(&mut self.1, input, flags),
            2 => A3::deserialise_member(&mut self.2, input, flags),
            _ => {}
        }
    }

    fn serialise_at(&self, index: usize, out: &mut dyn StructuredOutput, flags: Flags) {
        match index {
            0 => A1::serialise_member(&self.0, out, flags),
            1 => A2::serialise_member(&self.1, out, flags),
            2 => A3::serialise_member(&self.2, out, flags),
            _ => {}
        }
    }
}

/// A tuple of argument slots that can describe each of its members' wire
/// shape in declaration order, mirroring [`ArgTuple`]. Implemented for
/// the same arities 0 through 3.
pub trait DescribeArgs: ArgTuple {
    fn describe_at(index: usize, filler: &mut dyn PropertyDescriptionFiller);
}

impl DescribeArgs for () {
    fn describe_at(_index: usize, _filler: &mut dyn PropertyDescriptionFiller) {}
}

impl<A1: TypedSerialiser + Default + Send + Sync + DescribeType> DescribeArgs for (A1,) {
    fn describe_at(index: usize, filler: &mut dyn PropertyDescriptionFiller) {
        if index == 0 {
            A1::describe_type(filler);
        }
    }
}

impl<A1, A2> DescribeArgs for (A1, A2)
where
    A1: TypedSerialiser + Default + Send + Sync + DescribeType,
    A2: TypedSerialiser + Default + Send + Sync + DescribeType,
{
    fn describe_at(index: usize, filler: &mut dyn PropertyDescriptionFiller) {
        match index {
            0 => A1::describe_type(filler),
            1 => A2::describe_type(filler),
            _ => {}
        }
    }
}

impl<A1, A2, A3> DescribeArgs for (A1, A2, A3)
where
    A1: TypedSerialiser + Default + Send + Sync + DescribeType,
    A2: TypedSerialiser + Default + Send + Sync + DescribeType,
    A3: TypedSerialiser + Default + Send + Sync + DescribeType,
{
    fn describe_at(index: usize, filler: &mut dyn PropertyDescriptionFiller) {
        match index {
            0 => A1::describe_type(filler),
            1 => A2::describe_type(filler),
            2 => A3::describe_type(filler),
            _ => {}
        }
    }
}

/// A tuple of argument slots that can register each of its members' own
/// declarative object type (if any) into a service description's `types`
/// map, mirroring [`DescribeArgs`]. Implemented for the same arities 0
/// through 3.
pub trait ListArgTypes: ArgTuple {
    fn list_types(filler: &mut dyn SerialisableDescriptionFiller);
}

impl ListArgTypes for () {
    fn list_types(_filler: &mut dyn SerialisableDescriptionFiller) {}
}

impl<A1: TypedSerialiser + Default + Send + Sync + ListTypes> ListArgTypes for (A1,) {
    fn list_types(filler: &mut dyn SerialisableDescriptionFiller) {
        A1::list_types(filler);
    }
}

impl<A1, A2> ListArgTypes for (A1, A2)
where
    A1: TypedSerialiser + Default + Send + Sync + ListTypes,
    A2: TypedSerialiser + Default + Send + Sync + ListTypes,
{
    fn list_types(filler: &mut dyn SerialisableDescriptionFiller) {
        A1::list_types(filler);
        A2::list_types(filler);
    }
}

impl<A1, A2, A3> ListArgTypes for (A1, A2, A3)
where
    A1: TypedSerialiser + Default + Send + Sync + ListTypes,
    A2: TypedSerialiser + Default + Send + Sync + ListTypes,
    A3: TypedSerialiser + Default + Send + Sync + ListTypes,
{
    fn list_types(filler: &mut dyn SerialisableDescriptionFiller) {
        A1::list_types(filler);
        A2::list_types(filler);
        A3::list_types(filler);
    }
}

/// A leaf procedure: a typed closure plus the argument table describing
/// its parameters. `Args` is a tuple type implementing [`ArgTuple`];
/// `rpcmesh_derive::rpc_method!` generates this wrapper from an ordinary
/// function signature so callers never juggle tuples by hand.
pub struct RpcLambda<F, Args, R> {
    func: F,
    descriptors: &'static [ArgDescriptor],
    flags: Flags,
    doc: &'static [&'static str],
    return_doc: &'static [&'static str],
    _marker: PhantomData<fn(Args) -> R>,
}

impl<F, Args, R> RpcLambda<F, Args, R>
where
    F: Fn(Args) -> R + Send + Sync,
    Args: ArgTuple,
{
    #[must_use]
    pub fn new(func: F, descriptors: &'static [ArgDescriptor]) -> Self {
        Self {
            func,
            descriptors,
            flags: Flags::none(),
            doc: &[],
            return_doc: &[],
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Attaches this procedure's own doc lines, shown in a generated
    /// service description.
    #[must_use]
    pub fn with_doc(mut self, doc: &'static [&'static str]) -> Self {
        self.doc = doc;
        self
    }

    /// Attaches doc lines for the return value.
    #[must_use]
    pub fn with_return_doc(mut self, doc: &'static [&'static str]) -> Self {
        self.return_doc = doc;
        self
    }

    /// Runs the functor directly, bypassing any transport. Used both for
    /// an unbound local call and internally once arguments are assembled
    /// from the wire.
    pub fn invoke(&self, args: Args) -> R {
        (self.func)(args)
    }
}

impl<F, Args, R> Callable for RpcLambda<F, Args, R>
where
    F: Fn(Args) -> R + Send + Sync,
    Args: ArgTuple + DescribeArgs + ListArgTypes,
    R: TypedSerialiser + DescribeType + ListTypes,
{
    fn call(
        &self,
        args: Option<&mut dyn StructuredInput>,
        result: &mut dyn StructuredOutput,
        introduce_result: &mut dyn FnMut(&mut dyn StructuredOutput),
        flags: Flags,
    ) -> Result<()> {
        let mut slots = Args::default();
        if let Some(input) = args {
            let member_flags = flags.or(self.flags).or(Flags::OBJECT_LAYOUT_KNOWN);
            let descriptors = self.descriptors;
            let mut skip_error = None;
            input.read_object(member_flags, &mut |input, name, index| {
                let resolved = name
                    .and_then(|n| descriptors.iter().position(|d| d.name == n))
                    .unwrap_or(index);
                if resolved < descriptors.len() {
                    let arg_flags = flags.or(descriptors[resolved].flags);
                    slots.deserialise_at(resolved, input, arg_flags);
                } else if let Err(err) = input.skip_object_element(flags) {
                    skip_error = Some(err);
                    return false;
                }
                name.is_some() || index < descriptors.len()
            });
            if let Some(err) = skip_error {
                return Err(err);
            }
            if !input.good() {
                return Err(RpcError::InvalidParams("argument object failed to parse".to_string()));
            }
        }

        let returned = (self.func)(slots);
        introduce_result(result);
        R::serialise_member(&returned, result, flags);
        Ok(())
    }

    fn describe_self(&self, filler: &mut dyn MethodDescriptionFiller) {
        filler.doc_lines(self.doc);
        for (index, descriptor) in self.descriptors.iter().enumerate() {
            let doc_lines: &[&str] = if descriptor.doc.is_empty() {
                &[]
            } else {
                std::slice::from_ref(&descriptor.doc)
            };
            filler.add_param(descriptor.name, index + 1, doc_lines, &mut |sub| {
                Args::describe_at(index, sub);
            });
        }
        filler.set_return(self.return_doc, &mut |sub| R::describe_type(sub));
    }

    fn list_types(&self, filler: &mut dyn SerialisableDescriptionFiller) {
        Args::list_types(filler);
        R::list_types(filler);
    }
}

/// Writes a call's arguments as a known-layout object, for the client
/// side of an [`RpcLambda`] bound to a [`Responder`].
pub fn write_call_arguments<Args: ArgTuple>(
    args: &Args,
    descriptors: &'static [ArgDescriptor],
    out: &mut dyn StructuredOutput,
    flags: Flags,
) {
    let object_flags = flags.or(Flags::OBJECT_LAYOUT_KNOWN);
    out.start_writing_object(object_flags, Some(descriptors.len()));
    for (index, descriptor) in descriptors.iter().enumerate() {
        out.introduce_object_member(object_flags, descriptor.name, index);
        args.serialise_at(index, out, flags.or(descriptor.flags));
    }
    out.end_writing_object(object_flags);
}

/// Transport-agnostic dispatch/response surface a bound [`RpcLambda`] or
/// [`Future`] talks to on the client side.
pub trait Responder: Send + Sync {
    /// Assigns a token and hands the caller a writer to serialize the
    /// request body under it.
    fn send(&self, write_request: &mut dyn FnMut(&mut dyn StructuredOutput, RequestToken)) -> RequestToken;

    /// Blocks until a response for `token` is available, then feeds it to
    /// `read_response` exactly once.
    ///
    /// # Errors
    /// Returns the transport failure, or the remote's JSON-RPC `error`
    /// member as [`RpcError::Remote`], without calling `read_response`.
    fn get_response(
        &self,
        token: RequestToken,
        read_response: &mut dyn FnMut(&mut dyn StructuredInput),
    ) -> Result<()>;

    /// Non-blocking check for whether a response is already buffered.
    fn has_response(&self, token: RequestToken) -> bool;
}

/// A one-shot handle to a pending (or already-resolved) RPC result.
/// Dropping a future that was never read still drains the response off
/// the responder, so an ignored call never leaks a slot in the response
/// cache.
pub struct Future<'a, R> {
    responder: Option<&'a dyn Responder>,
    token: RequestToken,
    flags: Flags,
    value: Option<Result<R>>,
    fetched: bool,
}

impl<'a, R> Future<'a, R> {
    #[must_use]
    pub fn ready(value: R) -> Self {
        Self {
            responder: None,
            token: RequestToken::zero(),
            flags: Flags::none(),
            value: Some(Ok(value)),
            fetched: true,
        }
    }

    #[must_use]
    pub fn pending(responder: &'a dyn Responder, token: RequestToken, flags: Flags) -> Self {
        Self {
            responder: Some(responder),
            token,
            flags,
            value: None,
            fetched: false,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        if self.fetched {
            return true;
        }
        match self.responder {
            Some(responder) => responder.has_response(self.token),
            None => true,
        }
    }
}

impl<R: TypedSerialiser + Default> Future<'_, R> {
    /// Blocks until the value is available, consuming the future.
    ///
    /// # Errors
    /// Propagates a transport failure or a remote JSON-RPC error.
    pub fn get(mut self) -> Result<R> {
        self.resolve();
        self.value.take().expect("resolved above")
    }

    fn resolve(&mut self) {
        if self.fetched {
            return;
        }
        let flags = self.flags;
        let outcome = if let Some(responder) = self.responder {
            let mut result = R::default();
            responder
                .get_response(self.token, &mut |input| {
                    R::deserialise_member(&mut result, input, flags);
                })
                .map(|()| result)
        } else {
            Ok(R::default())
        };
        self.value = Some(outcome);
        self.fetched = true;
    }
}

impl<R: TypedSerialiser + Default> Drop for Future<'_, R> {
    fn drop(&mut self) {
        if !self.fetched {
            self.resolve();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::{JsonInput, JsonOutput};

    static SUM_ARGS: &[ArgDescriptor] = &[ArgDescriptor::new("first"), ArgDescriptor::new("second")];

    fn sum_method() -> RpcLambda<impl Fn((i64, i64)) -> i64, (i64, i64), i64> {
        RpcLambda::new(|(a, b): (i64, i64)| a + b, SUM_ARGS)
    }

    #[test]
    fn invokes_directly_without_a_responder() {
        let method = sum_method();
        assert_eq!(method.invoke((2, 3)), 5);
    }

    #[test]
    fn calls_from_a_serialized_params_object() {
        let method = sum_method();
        let mut input = JsonInput::new(r#"{"first": 2, "second": 3}"#);
        let mut out = JsonOutput::new();
        let mut wrote_result = false;
        method
            .call(
                Some(&mut input),
                &mut out,
                &mut |_| wrote_result = true,
                Flags::none(),
            )
            .unwrap();
        assert!(wrote_result);
        assert_eq!(out.into_string().trim(), "5");
    }

    #[test]
    fn resolves_dotted_paths_through_a_namespace() {
        let tree = RpcObjectBuilder::new()
            .child("sum", sum_method())
            .build();
        assert!(tree.resolve("sum").is_some());
        assert!(tree.resolve("missing").is_none());
    }

    struct RecordingResponder {
        body: String,
    }

    impl Responder for RecordingResponder {
        fn send(&self, write_request: &mut dyn FnMut(&mut dyn StructuredOutput, RequestToken)) -> RequestToken {
            let mut out = JsonOutput::new();
            write_request(&mut out, RequestToken::zero());
            RequestToken::zero()
        }

        fn get_response(
            &self,
            _token: RequestToken,
            read_response: &mut dyn FnMut(&mut dyn StructuredInput),
        ) -> Result<()> {
            let mut input = JsonInput::new(&self.body);
            read_response(&mut input);
            Ok(())
        }

        fn has_response(&self, _token: RequestToken) -> bool {
            true
        }
    }

    #[test]
    fn future_drain_on_drop_still_consumes_the_response() {
        let responder = RecordingResponder { body: "42".to_string() };
        let future = Future::<i64>::pending(&responder, RequestToken::zero(), Flags::none());
        drop(future);
    }

    #[test]
    fn future_get_returns_the_resolved_value() {
        let responder = RecordingResponder { body: "42".to_string() };
        let future = Future::<i64>::pending(&responder, RequestToken::zero(), Flags::none());
        assert_eq!(future.get().unwrap(), 42);
    }

    struct FailingResponder;

    impl Responder for FailingResponder {
        fn send(&self, write_request: &mut dyn FnMut(&mut dyn StructuredOutput, RequestToken)) -> RequestToken {
            let mut out = JsonOutput::new();
            write_request(&mut out, RequestToken::zero());
            RequestToken::zero()
        }

        fn get_response(
            &self,
            _token: RequestToken,
            _read_response: &mut dyn FnMut(&mut dyn StructuredInput),
        ) -> Result<()> {
            Err(RpcError::Remote {
                code: -32000,
                message: "boom".to_string(),
                data: None,
            })
        }

        fn has_response(&self, _token: RequestToken) -> bool {
            true
        }
    }

    #[test]
    fn future_get_propagates_a_remote_error() {
        let responder = FailingResponder;
        let future = Future::<i64>::pending(&responder, RequestToken::zero(), Flags::none());
        let err = future.get().unwrap_err();
        assert!(matches!(err, RpcError::Remote { code: -32000, .. }));
    }
}
