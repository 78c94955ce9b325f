//! Walks a [`Callable`] tree into a JSON-WSP service description: one flat
//! dotted-key entry per leaf procedure in `methods`, one deduplicated entry
//! per referenced declarative object type in `types`, wrapped in the
//! `{type:"jsonwsp/description", version:"1.0", servicename, url, ...}`
//! envelope.

use rpcmesh_core::object::{MethodDescriptionFiller, PropertyDescriptionFiller};
use rpcmesh_core::rpc::{walk_methods, Callable};
use serde_json::{Map, Value};

use crate::filler::{TypeFiller, TypesRegistry};

/// Gathers one procedure's own description as `Callable::describe_self`
/// feeds it in: its doc comment, its parameters in declaration order, and
/// its return value.
struct MethodFiller {
    doc_lines: Vec<Value>,
    params: Map<String, Value>,
    ret_info: Option<Value>,
}

impl MethodFiller {
    fn new() -> Self {
        Self {
            doc_lines: Vec::new(),
            params: Map::new(),
            ret_info: None,
        }
    }

    fn into_value(self) -> Value {
        let mut method = Map::new();
        method.insert("doc_lines".to_string(), Value::Array(self.doc_lines));
        method.insert("params".to_string(), Value::Object(self.params));
        method.insert(
            "ret_info".to_string(),
            self.ret_info.unwrap_or_else(empty_ret_info),
        );
        Value::Object(method)
    }
}

fn empty_ret_info() -> Value {
    let mut ret = Map::new();
    ret.insert("doc_lines".to_string(), Value::Array(Vec::new()));
    ret.insert("type".to_string(), Value::Null);
    Value::Object(ret)
}

fn doc_lines_value(lines: &[&str]) -> Value {
    Value::Array(lines.iter().map(|line| Value::String((*line).to_string())).collect())
}

impl MethodDescriptionFiller for MethodFiller {
    fn doc_lines(&mut self, lines: &[&str]) {
        self.doc_lines = lines.iter().map(|line| Value::String((*line).to_string())).collect();
    }

    fn add_param(
        &mut self,
        name: &str,
        def_order: usize,
        doc_lines: &[&str],
        describe: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller),
    ) {
        let mut type_filler = TypeFiller::new();
        describe(&mut type_filler);

        let mut param = Map::new();
        param.insert("def_order".to_string(), Value::Number(def_order.into()));
        param.insert("doc_lines".to_string(), doc_lines_value(doc_lines));
        param.insert("type".to_string(), type_filler.value);
        param.insert("optional".to_string(), Value::Bool(type_filler.optional));
        self.params.insert(name.to_string(), Value::Object(param));
    }

    fn set_return(&mut self, doc_lines: &[&str], describe: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        assert!(self.ret_info.is_none(), "a procedure has exactly one return value");

        let mut type_filler = TypeFiller::new();
        describe(&mut type_filler);

        let mut ret = Map::new();
        ret.insert("doc_lines".to_string(), doc_lines_value(doc_lines));
        ret.insert("type".to_string(), type_filler.value);
        self.ret_info = Some(Value::Object(ret));
    }
}

/// Builds the JSON-WSP description document for `root`: every leaf
/// procedure reachable from it becomes one entry in `methods`, keyed by
/// its full dotted path, and every declarative object type any of them
/// refers to is described once in `types`.
#[must_use]
pub fn describe(root: &dyn Callable, servicename: &str, url: &str) -> Value {
    let mut methods = Map::new();
    walk_methods(root, &mut |path, node| {
        let mut filler = MethodFiller::new();
        node.describe_self(&mut filler);
        methods.insert(path.to_string(), filler.into_value());
    });

    let mut registry = TypesRegistry::new();
    root.list_types(&mut registry);

    let mut envelope = Map::new();
    envelope.insert("type".to_string(), Value::String("jsonwsp/description".to_string()));
    envelope.insert("version".to_string(), Value::String("1.0".to_string()));
    envelope.insert("servicename".to_string(), Value::String(servicename.to_string()));
    envelope.insert("url".to_string(), Value::String(url.to_string()));
    envelope.insert("types".to_string(), Value::Object(registry.types));
    envelope.insert("methods".to_string(), Value::Object(methods));
    Value::Object(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcmesh_core::error::Result;
    use rpcmesh_core::flags::Flags;
    use rpcmesh_core::io::{StructuredInput, StructuredOutput};
    use rpcmesh_core::rpc::{ArgDescriptor, RpcLambda, RpcObjectBuilder};

    fn sum_method() -> RpcLambda<impl Fn((i64, i64)) -> i64 + Send + Sync, (i64, i64), i64> {
        static ARGS: &[ArgDescriptor] = &[
            ArgDescriptor::new("left").with_doc("the first addend"),
            ArgDescriptor::new("right"),
        ];
        RpcLambda::new(|(left, right)| left + right, ARGS)
            .with_doc(&["Adds two integers."])
            .with_return_doc(&["The sum of both arguments."])
    }

    #[test]
    fn describes_a_flat_one_method_service() {
        let root = RpcObjectBuilder::new().child("sum", sum_method()).build();
        let doc = describe(&root, "demo", "http://localhost:8080/");

        assert_eq!(doc["type"], Value::String("jsonwsp/description".to_string()));
        assert_eq!(doc["servicename"], Value::String("demo".to_string()));
        assert_eq!(doc["url"], Value::String("http://localhost:8080/".to_string()));
        assert_eq!(doc["types"], Value::Object(Map::new()));

        let method = &doc["methods"]["sum"];
        assert_eq!(method["doc_lines"], Value::Array(vec![Value::String("Adds two integers.".to_string())]));
        assert_eq!(method["params"]["left"]["def_order"], Value::Number(1.into()));
        assert_eq!(method["params"]["left"]["type"], Value::String("number".to_string()));
        assert_eq!(method["params"]["left"]["optional"], Value::Bool(false));
        assert_eq!(
            method["params"]["left"]["doc_lines"],
            Value::Array(vec![Value::String("the first addend".to_string())])
        );
        assert_eq!(method["params"]["right"]["def_order"], Value::Number(2.into()));
        assert_eq!(method["ret_info"]["type"], Value::String("number".to_string()));
    }

    #[test]
    fn nested_namespaces_produce_dotted_method_paths() {
        let root = RpcObjectBuilder::new()
            .child("math", RpcObjectBuilder::new().child("sum", sum_method()).build())
            .build();
        let doc = describe(&root, "demo", "http://localhost/");
        assert!(doc["methods"].get("math.sum").is_some());
    }

    #[test]
    fn a_procedure_with_no_own_description_still_gets_an_entry() {
        struct Silent;
        impl Callable for Silent {
            fn call(
                &self,
                _args: Option<&mut dyn StructuredInput>,
                _result: &mut dyn StructuredOutput,
                _introduce_result: &mut dyn FnMut(&mut dyn StructuredOutput),
                _flags: Flags,
            ) -> Result<()> {
                Ok(())
            }
        }
        let root = RpcObjectBuilder::new().child("ping", Silent).build();
        let doc = describe(&root, "demo", "http://localhost/");
        let method = &doc["methods"]["ping"];
        assert_eq!(method["doc_lines"], Value::Array(Vec::new()));
        assert_eq!(method["params"], Value::Object(Map::new()));
        assert_eq!(method["ret_info"]["type"], Value::Null);
    }
}
