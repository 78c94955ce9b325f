//! Per-type serialization dispatch.
//!
//! [`TypedSerialiser`] is the bridge between a concrete Rust type and the
//! [`StructuredOutput`]/[`StructuredInput`] visitor traits: given a value
//! and a sink (or a sink and a value to fill), it knows which `write_*`/
//! `read_*` call applies. [`crate::object::Serialisable`] field descriptors
//! call through this trait rather than hard-coding a type switch, so
//! adding a new serialisable container only means adding one impl here.

use std::collections::BTreeMap;

use crate::flags::Flags;
use crate::io::{MemberType, StructuredInput, StructuredOutput};

/// Dispatches serialization for one concrete type `Self`.
pub trait TypedSerialiser: Sized {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags);
    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags);
}

macro_rules! impl_integer {
    ($ty:ty, $numeric_flag:expr) => {
        impl TypedSerialiser for $ty {
            fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
                let flags = if flags.numeric_width().is_none() {
                    flags.or($numeric_flag)
                } else {
                    flags
                };
                out.write_int(flags, i64::from(*value));
            }

            fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
                let flags = if flags.numeric_width().is_none() {
                    flags.or($numeric_flag)
                } else {
                    flags
                };
                *value = input.read_int(flags) as Self;
            }
        }
    };
}

impl_integer!(i8, Flags::INT_8);
impl_integer!(i16, Flags::INT_16);
impl_integer!(i32, Flags::INT_32);
impl_integer!(u8, Flags::UINT_8);
impl_integer!(u16, Flags::UINT_16);
impl_integer!(u32, Flags::UINT_32);

impl TypedSerialiser for i64 {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::INT_64)
        } else {
            flags
        };
        out.write_int(flags, *value);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::INT_64)
        } else {
            flags
        };
        *value = input.read_int(flags);
    }
}

impl TypedSerialiser for u64 {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::UINT_64)
        } else {
            flags
        };
        out.write_int(flags, *value as i64);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::UINT_64)
        } else {
            flags
        };
        *value = input.read_int(flags) as Self;
    }
}

impl TypedSerialiser for f32 {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::FLOAT_32)
        } else {
            flags
        };
        out.write_float(flags, f64::from(*value));
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::FLOAT_32)
        } else {
            flags
        };
        *value = input.read_float(flags) as Self;
    }
}

impl TypedSerialiser for f64 {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::FLOAT_64)
        } else {
            flags
        };
        out.write_float(flags, *value);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        let flags = if flags.numeric_width().is_none() {
            flags.or(Flags::FLOAT_64)
        } else {
            flags
        };
        *value = input.read_float(flags);
    }
}

impl TypedSerialiser for bool {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        out.write_bool(flags, *value);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        *value = input.read_bool(flags);
    }
}

impl TypedSerialiser for String {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        out.write_string(flags, value);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        *value = input.read_string(flags);
    }
}

impl<T: TypedSerialiser + Default> TypedSerialiser for Vec<T> {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        out.start_writing_array(flags, Some(value.len()));
        for (i, item) in value.iter().enumerate() {
            out.introduce_array_element(flags, i);
            T::serialise_member(item, out, flags);
        }
        out.end_writing_array(flags);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        if input.start_reading_array(flags).is_err() {
            value.clear();
            return;
        }
        let mut index = 0;
        while input.next_array_element(flags) {
            if value.len() <= index {
                value.push(T::default());
            }
            T::deserialise_member(&mut value[index], input, flags);
            index += 1;
        }
        value.truncate(index);
        input.end_reading_array(flags);
    }
}

impl<T: TypedSerialiser + Default> TypedSerialiser for Option<T> {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        match value {
            Some(inner) => {
                out.write_optional(flags, true, &mut |out| {
                    T::serialise_member(inner, out, flags);
                });
            }
            None => out.write_optional(flags, false, &mut |_| {}),
        }
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        let mut inner = value.take().unwrap_or_default();
        let present = input.read_optional(flags, &mut |input| {
            T::deserialise_member(&mut inner, input, flags);
        });
        *value = if present { Some(inner) } else { None };
    }
}

impl<T: TypedSerialiser + Default> TypedSerialiser for BTreeMap<String, T> {
    fn serialise_member(value: &Self, out: &mut dyn StructuredOutput, flags: Flags) {
        out.start_writing_object(flags, Some(value.len()));
        for (index, (key, item)) in value.iter().enumerate() {
            out.introduce_object_member(flags, key, index);
            T::serialise_member(item, out, flags);
        }
        out.end_writing_object(flags);
    }

    fn deserialise_member(value: &mut Self, input: &mut dyn StructuredInput, flags: Flags) {
        if value.is_empty() {
            input.read_object(flags, &mut |input, name, _index| {
                let Some(name) = name else { return true };
                let mut entry = T::default();
                T::deserialise_member(&mut entry, input, flags);
                value.insert(name.to_string(), entry);
                true
            });
        } else {
            let mut result = Self::new();
            input.read_object(flags, &mut |input, name, _index| {
                let Some(name) = name else { return true };
                let mut entry = value.remove(name).unwrap_or_default();
                T::deserialise_member(&mut entry, input, flags);
                result.insert(name.to_string(), entry);
                true
            });
            *value = result;
        }
    }
}

/// Describes the on-wire shape of `Self`, for the JSON-WSP description
/// builder (C12). Kept distinct from [`TypedSerialiser`] so scalar codec
/// dispatch does not pay for description support it doesn't need.
pub trait DescribeType {
    fn describe_type(filler: &mut dyn crate::object::PropertyDescriptionFiller);
}

macro_rules! impl_describe_scalar {
    ($ty:ty, $method:ident) => {
        impl DescribeType for $ty {
            fn describe_type(filler: &mut dyn crate::object::PropertyDescriptionFiller) {
                filler.$method();
            }
        }
    };
}

impl_describe_scalar!(i8, add_integer);
impl_describe_scalar!(i16, add_integer);
impl_describe_scalar!(i32, add_integer);
impl_describe_scalar!(i64, add_integer);
impl_describe_scalar!(u8, add_integer);
impl_describe_scalar!(u16, add_integer);
impl_describe_scalar!(u32, add_integer);
impl_describe_scalar!(u64, add_integer);
impl_describe_scalar!(f32, add_float);
impl_describe_scalar!(f64, add_float);
impl_describe_scalar!(bool, add_boolean);
impl_describe_scalar!(String, add_string);

impl<T: DescribeType> DescribeType for Vec<T> {
    fn describe_type(filler: &mut dyn crate::object::PropertyDescriptionFiller) {
        filler.add_array(&mut |sub| T::describe_type(sub));
    }
}

impl<T: DescribeType> DescribeType for Option<T> {
    fn describe_type(filler: &mut dyn crate::object::PropertyDescriptionFiller) {
        filler.add_optional(&mut |sub| T::describe_type(sub));
    }
}

/// Registers `Self`'s own entry (and anything nested within it) into a
/// service description's top-level `types` map, independently of any one
/// procedure's parameter/return description. A no-op for scalars, which
/// never get a `types` entry of their own; `#[derive(Serialisable)]`
/// generates the non-trivial impl for a declarative object type, calling
/// through to each field's own `ListTypes::list_types` in turn so a
/// subobject nested inside another one is still reached.
pub trait ListTypes {
    fn list_types(filler: &mut dyn crate::object::SerialisableDescriptionFiller);
}

macro_rules! impl_list_types_noop {
    ($ty:ty) => {
        impl ListTypes for $ty {
            fn list_types(_filler: &mut dyn crate::object::SerialisableDescriptionFiller) {}
        }
    };
}

impl_list_types_noop!(i8);
impl_list_types_noop!(i16);
impl_list_types_noop!(i32);
impl_list_types_noop!(i64);
impl_list_types_noop!(u8);
impl_list_types_noop!(u16);
impl_list_types_noop!(u32);
impl_list_types_noop!(u64);
impl_list_types_noop!(f32);
impl_list_types_noop!(f64);
impl_list_types_noop!(bool);
impl_list_types_noop!(String);

impl<T: ListTypes> ListTypes for Vec<T> {
    fn list_types(filler: &mut dyn crate::object::SerialisableDescriptionFiller) {
        T::list_types(filler);
    }
}

impl<T: ListTypes> ListTypes for Option<T> {
    fn list_types(filler: &mut dyn crate::object::SerialisableDescriptionFiller) {
        T::list_types(filler);
    }
}

/// The member-type lookahead a codec reports before a scalar read,
/// re-exported here since callers of `TypedSerialiser` often need to
/// branch on it first (e.g. the JSON-RPC params/result dispatcher).
pub type Lookahead = MemberType;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::{JsonInput, JsonOutput};

    #[test]
    fn integer_round_trips_through_json() {
        let mut out = JsonOutput::new();
        i32::serialise_member(&-42, &mut out, Flags::none());
        let text = out.into_string();
        assert_eq!(text, "-42");

        let mut input = JsonInput::new(&text);
        let mut value = 0i32;
        i32::deserialise_member(&mut value, &mut input, Flags::none());
        assert_eq!(value, -42);
    }

    #[test]
    fn vec_round_trips_through_json() {
        let mut out = JsonOutput::new();
        let values = vec![1i32, 2, 3];
        Vec::<i32>::serialise_member(&values, &mut out, Flags::none());
        let text = out.into_string();

        let mut input = JsonInput::new(&text);
        let mut restored: Vec<i32> = Vec::new();
        Vec::<i32>::deserialise_member(&mut restored, &mut input, Flags::none());
        assert_eq!(restored, values);
    }

    #[test]
    fn map_merge_preserves_untouched_keys() {
        let mut existing: BTreeMap<String, i32> = BTreeMap::new();
        existing.insert("kept".to_string(), 7);

        let mut out = JsonOutput::new();
        let mut update: BTreeMap<String, i32> = BTreeMap::new();
        update.insert("kept".to_string(), 99);
        BTreeMap::<String, i32>::serialise_member(&update, &mut out, Flags::none());
        let text = out.into_string();

        let mut input = JsonInput::new(&text);
        BTreeMap::<String, i32>::deserialise_member(&mut existing, &mut input, Flags::none());
        assert_eq!(existing.get("kept"), Some(&99));
    }
}
