//! Concrete [`PropertyDescriptionFiller`]/[`SerialisableDescriptionFiller`]
//! implementations that build the `serde_json::Value` fragments a JSON-WSP
//! description document is made of: a type reference (`"number"`,
//! `"string"`, a one-element array, or a bare subobject type name), one
//! object type's flat member list, and the deduplicated top-level `types`
//! map those member lists land in.

use rpcmesh_core::object::{PropertyDescriptionFiller, SerialisableDescriptionFiller};
use serde_json::{Map, Value};

/// Builds the `"type"` value for one parameter, return value, array
/// element, or object member. Also remembers whether `add_optional` was
/// reached, since a parameter's `"optional"` flag is read off of it —
/// return values and object members ignore the flag, as JSON-WSP has no
/// place for it there.
pub(crate) struct TypeFiller {
    pub(crate) value: Value,
    pub(crate) optional: bool,
}

impl TypeFiller {
    pub(crate) fn new() -> Self {
        Self {
            value: Value::Null,
            optional: false,
        }
    }
}

impl PropertyDescriptionFiller for TypeFiller {
    fn add_member(&mut self, _name: &str, _description: &str, _writer: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        // A bare type reference never walks members directly; an object
        // type's members are only ever reached through `add_subobject` plus
        // a separate `list_types` pass, not from here.
    }

    fn add_integer(&mut self) {
        self.value = Value::String("number".to_string());
    }

    fn add_float(&mut self) {
        self.value = Value::String("number".to_string());
    }

    fn add_boolean(&mut self) {
        self.value = Value::String("boolean".to_string());
    }

    fn add_string(&mut self) {
        self.value = Value::String("string".to_string());
    }

    fn add_optional(&mut self, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        self.optional = true;
        filler(self);
    }

    fn add_array(&mut self, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        let mut item = TypeFiller::new();
        filler(&mut item);
        self.value = Value::Array(vec![item.value]);
    }

    fn add_subobject(&mut self, type_name: Option<&str>, _filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        self.value = Value::String(type_name.unwrap_or("object").to_string());
    }
}

/// Builds the flat `{member_name: type_value}` body of one `types` entry:
/// each member contributes just its type, with none of the
/// `def_order`/`doc_lines`/`optional` wrapping a parameter gets.
pub(crate) struct MembersFiller {
    pub(crate) members: Map<String, Value>,
}

impl MembersFiller {
    pub(crate) fn new() -> Self {
        Self { members: Map::new() }
    }
}

impl PropertyDescriptionFiller for MembersFiller {
    fn add_member(&mut self, name: &str, _description: &str, writer: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        let mut type_filler = TypeFiller::new();
        writer(&mut type_filler);
        self.members.insert(name.to_string(), type_filler.value);
    }

    fn add_integer(&mut self) {}
    fn add_float(&mut self) {}
    fn add_boolean(&mut self) {}
    fn add_string(&mut self) {}

    fn add_optional(&mut self, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        filler(self);
    }

    fn add_array(&mut self, _filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {}

    fn add_subobject(&mut self, _type_name: Option<&str>, _filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {}
}

/// Collects one entry per distinct type name into the top-level `types`
/// map. A type already recorded is left alone — the same object
/// referenced from more than one procedure still only gets described once.
pub(crate) struct TypesRegistry {
    pub(crate) types: Map<String, Value>,
}

impl TypesRegistry {
    pub(crate) fn new() -> Self {
        Self { types: Map::new() }
    }
}

impl SerialisableDescriptionFiller for TypesRegistry {
    fn add_more_types(&mut self, other_filler: &mut dyn FnMut(&mut dyn SerialisableDescriptionFiller)) {
        other_filler(self);
    }

    fn fill_members(&mut self, name: &str, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller)) {
        if self.types.contains_key(name) {
            return;
        }
        let mut members = MembersFiller::new();
        filler(&mut members);
        self.types.insert(name.to_string(), Value::Object(members.members));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_type_is_a_bare_string() {
        let mut filler = TypeFiller::new();
        filler.add_integer();
        assert_eq!(filler.value, Value::String("number".to_string()));
        assert!(!filler.optional);
    }

    #[test]
    fn optional_scalar_sets_the_flag_but_keeps_the_inner_type() {
        let mut filler = TypeFiller::new();
        filler.add_optional(&mut |sub| sub.add_string());
        assert_eq!(filler.value, Value::String("string".to_string()));
        assert!(filler.optional);
    }

    #[test]
    fn array_wraps_one_element() {
        let mut filler = TypeFiller::new();
        filler.add_array(&mut |sub| sub.add_integer());
        assert_eq!(filler.value, Value::Array(vec![Value::String("number".to_string())]));
    }

    #[test]
    fn subobject_is_just_its_name() {
        let mut filler = TypeFiller::new();
        filler.add_subobject(Some("Point"), &mut |_| {});
        assert_eq!(filler.value, Value::String("Point".to_string()));
    }

    #[test]
    fn registry_deduplicates_repeated_type_names() {
        let mut registry = TypesRegistry::new();
        let mut calls = 0;
        registry.fill_members("Point", &mut |members| {
            calls += 1;
            members.add_member("x", "", &mut |t| t.add_integer());
        });
        registry.fill_members("Point", &mut |members| {
            calls += 1;
            members.add_member("y", "", &mut |t| t.add_integer());
        });
        assert_eq!(calls, 1);
        assert_eq!(
            registry.types.get("Point"),
            Some(&Value::Object(Map::from_iter([("x".to_string(), Value::String("number".to_string()))])))
        );
    }
}
