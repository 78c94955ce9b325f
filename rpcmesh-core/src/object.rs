//! Declarative object model: types that describe their own members for
//! serialization via an explicit field table, rather than any runtime
//! offset discovery.
//!
//! A type becomes serialisable by registering one [`FieldDescriptor`] per
//! member with a [`FieldBuilder`] — each descriptor pairs a name with a
//! getter/setter lens into the struct. `#[derive(rpcmesh_derive::Serialisable)]`
//! generates exactly this registration for ordinary structs; hand-written
//! impls are equally valid for types that need custom behavior (e.g. a
//! field backed by a computed value).

use crate::flags::Flags;
use crate::io::{StructuredInput, StructuredOutput};
use crate::typed::TypedSerialiser;

/// Implemented by types that can write/read themselves through the
/// structured I/O traits by way of a registered field table.
pub trait Serialisable {
    /// Writes every registered field, in registration order, as an object.
    fn serialise(&self, out: &mut dyn StructuredOutput, flags: Flags);

    /// Reads an object, matching incoming member names against the
    /// registered table and skipping unrecognized ones.
    fn deserialise(&mut self, input: &mut dyn StructuredInput, flags: Flags) -> bool;

    /// Feeds each registered field's description to `filler`, in
    /// registration order.
    fn describe(&self, filler: &mut dyn PropertyDescriptionFiller);

    /// The name this type should be known by in generated descriptions.
    fn type_name(&self) -> &'static str;
}

/// One entry in a [`Serialisable`] type's field table: a name, a pair of
/// closures reaching into the struct, and the flags that member should
/// carry on the wire.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub flags: Flags,
    pub get: fn(&T) -> FieldRef<'_>,
    pub get_mut: fn(&mut T) -> FieldRefMut<'_>,
}

/// A type-erased read-only view into one field, produced by a descriptor's
/// `get` lens. Holds a closure over the concrete field rather than a
/// `dyn Any` downcast, so the same descriptor works for any `TypedSerialiser`
/// type without runtime type checks.
pub struct FieldRef<'a>(Box<dyn FnOnce(&mut dyn StructuredOutput, Flags) + 'a>);

impl<'a> FieldRef<'a> {
    /// Wraps a concrete field reference behind the type-erased boundary.
    pub fn new<T: TypedSerialiser>(value: &'a T) -> Self {
        Self(Box::new(move |out, flags| {
            T::serialise_member(value, out, flags);
        }))
    }

    fn write(self, out: &mut dyn StructuredOutput, flags: Flags) {
        (self.0)(out, flags);
    }
}

/// A type-erased mutable view into one field, produced by a descriptor's
/// `get_mut` lens.
pub struct FieldRefMut<'a>(Box<dyn FnOnce(&mut dyn StructuredInput, Flags) + 'a>);

impl<'a> FieldRefMut<'a> {
    /// Wraps a concrete mutable field reference behind the type-erased
    /// boundary.
    pub fn new<T: TypedSerialiser>(value: &'a mut T) -> Self {
        Self(Box::new(move |input, flags| {
            T::deserialise_member(value, input, flags);
        }))
    }

    fn read(self, input: &mut dyn StructuredInput, flags: Flags) {
        (self.0)(input, flags);
    }
}

/// Helper for implementing [`Serialisable::serialise`]/[`Serialisable::deserialise`]
/// over a static field table: drives the object-writing and
/// object-reading grammar against [`StructuredOutput`]/[`StructuredInput`]
/// so each `impl Serialisable` only needs to supply the table itself.
pub fn serialise_fields<T>(value: &T, fields: &'static [FieldDescriptor<T>], out: &mut dyn StructuredOutput, flags: Flags) {
    out.start_writing_object(flags, Some(fields.len()));
    for (index, field) in fields.iter().enumerate() {
        let member_flags = flags.or(field.flags);
        out.introduce_object_member(member_flags, field.name, index);
        (field.get)(value).write(out, member_flags);
    }
    out.end_writing_object(flags);
}

/// Helper for implementing [`Serialisable::deserialise`] over a static
/// field table.
pub fn deserialise_fields<T>(value: &mut T, fields: &'static [FieldDescriptor<T>], input: &mut dyn StructuredInput, flags: Flags) -> bool {
    let mut skip_error = false;
    input.read_object(flags, &mut |input, name, _index| {
        let Some(field) = name.and_then(|n| fields.iter().find(|f| f.name == n)) else {
            if input.skip_object_element(flags).is_err() {
                skip_error = true;
                return false;
            }
            return true;
        };
        let member_flags = flags.or(field.flags);
        (field.get_mut)(value).read(input, member_flags);
        true
    });
    input.good() && !skip_error
}

/// Adds a type's description to a format-specific description document
/// (JSON-WSP's parameter/return list, most notably). One impl per target
/// format.
pub trait PropertyDescriptionFiller {
    fn add_member(&mut self, name: &str, description: &str, writer: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
    fn add_integer(&mut self);
    fn add_float(&mut self);
    fn add_boolean(&mut self);
    fn add_string(&mut self);
    fn add_optional(&mut self, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
    fn add_array(&mut self, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
    fn add_subobject(&mut self, type_name: Option<&str>, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
}

/// Adds a nested type's definition to a description document that tracks
/// types by name so shared subobjects are described once.
pub trait SerialisableDescriptionFiller {
    fn add_more_types(&mut self, other_filler: &mut dyn FnMut(&mut dyn SerialisableDescriptionFiller));
    fn fill_members(&mut self, name: &str, filler: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
}

/// A visitor that collects one procedure's description: its own doc
/// comment, each parameter in declaration order, and its return value.
/// [`crate::rpc::Callable::describe_self`] is the hook a leaf procedure
/// feeds this through; `rpcmesh-wsp` supplies the concrete filler that
/// turns it into a JSON-WSP method entry. A filler that receives more
/// than one [`MethodDescriptionFiller::set_return`] call is a programmer
/// error — a procedure has exactly one return value.
pub trait MethodDescriptionFiller {
    fn doc_lines(&mut self, lines: &[&str]);
    fn add_param(
        &mut self,
        name: &str,
        def_order: usize,
        doc_lines: &[&str],
        describe: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller),
    );
    fn set_return(&mut self, doc_lines: &[&str], describe: &mut dyn FnMut(&mut dyn PropertyDescriptionFiller));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::{JsonInput, JsonOutput};

    struct Point {
        x: i32,
        y: i32,
    }

    fn point_fields() -> &'static [FieldDescriptor<Point>] {
        static FIELDS: &[FieldDescriptor<Point>] = &[
            FieldDescriptor {
                name: "x",
                flags: Flags::none(),
                get: |p| FieldRef::new(&p.x),
                get_mut: |p| FieldRefMut::new(&mut p.x),
            },
            FieldDescriptor {
                name: "y",
                flags: Flags::none(),
                get: |p| FieldRef::new(&p.y),
                get_mut: |p| FieldRefMut::new(&mut p.y),
            },
        ];
        FIELDS
    }

    impl Serialisable for Point {
        fn serialise(&self, out: &mut dyn StructuredOutput, flags: Flags) {
            serialise_fields(self, point_fields(), out, flags);
        }

        fn deserialise(&mut self, input: &mut dyn StructuredInput, flags: Flags) -> bool {
            deserialise_fields(self, point_fields(), input, flags)
        }

        fn describe(&self, _filler: &mut dyn PropertyDescriptionFiller) {}

        fn type_name(&self) -> &'static str {
            "Point"
        }
    }

    #[test]
    fn round_trips_through_json() {
        let original = Point { x: 3, y: -4 };
        let mut out = JsonOutput::new();
        original.serialise(&mut out, Flags::none());
        let text = out.into_string();

        let mut restored = Point { x: 0, y: 0 };
        let mut input = JsonInput::new(&text);
        assert!(restored.deserialise(&mut input, Flags::none()));
        assert_eq!(restored.x, 3);
        assert_eq!(restored.y, -4);
    }

    #[test]
    fn unknown_member_is_skipped_not_fatal() {
        let mut restored = Point { x: 0, y: 0 };
        let mut input = JsonInput::new(r#"{"x": 1, "z": 99, "y": 2}"#);
        assert!(restored.deserialise(&mut input, Flags::none()));
        assert_eq!(restored.x, 1);
        assert_eq!(restored.y, 2);
    }
}
