//! Binary codec: little-endian, length-prefixed, depth-bounded.
//!
//! Unlike JSON, this format carries no self-describing tokens — every
//! array and object must announce its size up front, and the caller must
//! already know an object's field count when `OBJECT_LAYOUT_KNOWN` is set
//! (that flag drops member names from the wire, so the reader walks
//! exactly as many members as the type is known to declare rather than
//! discovering a count). `skip_object_element` is consequently unsupported
//! here: with no self-describing length, there is nothing generic to skip
//! past. Nesting is bounded by `MAX_DEPTH` so the reader can track
//! remaining-element counts in a fixed-size array instead of a heap stack.

use crate::error::{Result, RpcError};
use crate::flags::{Flags, NumericWidth};
use crate::io::{Location, MemberType, StructuredInput, StructuredOutput};

type SizeType = u16;

fn numeric_width_or_default(flags: Flags) -> NumericWidth {
    flags.numeric_width().unwrap_or(NumericWidth::Int32)
}

/// Writes little-endian, length-prefixed binary output.
pub struct BinaryOutput {
    buf: Vec<u8>,
}

impl BinaryOutput {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_sized_int(&mut self, width: NumericWidth, value: i64) {
        match width {
            NumericWidth::Int8 | NumericWidth::Uint8 => self.buf.push(value as u8),
            NumericWidth::Int16 | NumericWidth::Uint16 => {
                self.buf.extend_from_slice(&(value as u16).to_le_bytes());
            }
            NumericWidth::Int32 | NumericWidth::Uint32 => {
                self.buf.extend_from_slice(&(value as u32).to_le_bytes());
            }
            NumericWidth::Int64 | NumericWidth::Uint64 => {
                self.buf.extend_from_slice(&(value as u64).to_le_bytes());
            }
            NumericWidth::Float16 => {
                self.buf.extend_from_slice(&(value as u16).to_le_bytes());
            }
            NumericWidth::Float32 => {
                self.buf.extend_from_slice(&(value as f32).to_le_bytes());
            }
            NumericWidth::Float64 => {
                self.buf.extend_from_slice(&(value as f64).to_le_bytes());
            }
        }
    }

    fn write_size(&mut self, size: usize) {
        self.buf
            .extend_from_slice(&(size as SizeType).to_le_bytes());
    }
}

impl Default for BinaryOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredOutput for BinaryOutput {
    fn write_int(&mut self, flags: Flags, value: i64) {
        self.write_sized_int(numeric_width_or_default(flags), value);
    }

    fn write_float(&mut self, flags: Flags, value: f64) {
        match numeric_width_or_default(flags) {
            NumericWidth::Float32 => self.buf.extend_from_slice(&(value as f32).to_le_bytes()),
            _ => self.buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn write_string(&mut self, _flags: Flags, value: &str) {
        self.write_size(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn write_bool(&mut self, _flags: Flags, value: bool) {
        self.buf.push(u8::from(value));
    }

    fn write_null(&mut self, _flags: Flags) {}

    fn start_writing_array(&mut self, _flags: Flags, size: Option<usize>) {
        let size = size.expect("binary codec requires array size to be known in advance");
        self.write_size(size);
    }

    fn introduce_array_element(&mut self, _flags: Flags, _index: usize) {}

    fn end_writing_array(&mut self, _flags: Flags) {}

    fn start_writing_object(&mut self, flags: Flags, size: Option<usize>) {
        if !flags.contains(Flags::OBJECT_LAYOUT_KNOWN) {
            let size = size.expect("binary codec requires object size to be known in advance");
            self.write_size(size);
        }
    }

    fn introduce_object_member(&mut self, flags: Flags, name: &str, _index: usize) {
        if !flags.contains(Flags::OBJECT_LAYOUT_KNOWN) {
            self.write_string(flags, name);
        }
    }

    fn end_writing_object(&mut self, _flags: Flags) {}

    fn write_optional(
        &mut self,
        _flags: Flags,
        present: bool,
        write_value: &mut dyn FnMut(&mut dyn StructuredOutput),
    ) {
        self.buf.push(u8::from(present));
        if present {
            write_value(self);
        }
    }
}

/// Reads little-endian, length-prefixed binary input.
pub struct BinaryInput<'a, const MAX_DEPTH: usize = 3> {
    data: &'a [u8],
    pos: usize,
    good: bool,
    remaining: [i64; MAX_DEPTH],
    depth: isize,
}

impl<'a, const MAX_DEPTH: usize> BinaryInput<'a, MAX_DEPTH> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            good: true,
            remaining: [0; MAX_DEPTH],
            depth: -1,
        }
    }

    fn fail(&mut self) {
        self.good = false;
    }

    fn read_sized_int(&mut self, width: NumericWidth) -> i64 {
        let len = width.byte_len();
        if self.pos + len > self.data.len() {
            self.fail();
            return 0;
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        match width {
            NumericWidth::Int8 => i64::from(bytes[0] as i8),
            NumericWidth::Uint8 => i64::from(bytes[0]),
            NumericWidth::Int16 => i64::from(i16::from_le_bytes(bytes.try_into().unwrap())),
            NumericWidth::Uint16 | NumericWidth::Float16 => {
                i64::from(u16::from_le_bytes(bytes.try_into().unwrap()))
            }
            NumericWidth::Int32 => i64::from(i32::from_le_bytes(bytes.try_into().unwrap())),
            NumericWidth::Uint32 => i64::from(u32::from_le_bytes(bytes.try_into().unwrap())),
            NumericWidth::Int64 => i64::from_le_bytes(bytes.try_into().unwrap()),
            NumericWidth::Uint64 => u64::from_le_bytes(bytes.try_into().unwrap()) as i64,
            NumericWidth::Float32 => f32::from_le_bytes(bytes.try_into().unwrap()) as i64,
            NumericWidth::Float64 => f64::from_le_bytes(bytes.try_into().unwrap()) as i64,
        }
    }

    fn read_size(&mut self) -> usize {
        let len = std::mem::size_of::<SizeType>();
        if self.pos + len > self.data.len() {
            self.fail();
            return 0;
        }
        let bytes: [u8; 2] = self.data[self.pos..self.pos + len].try_into().unwrap();
        self.pos += len;
        SizeType::from_le_bytes(bytes) as usize
    }
}

impl<const MAX_DEPTH: usize> StructuredInput for BinaryInput<'_, MAX_DEPTH> {
    fn good(&self) -> bool {
        self.good
    }

    fn identify_type(&mut self, _flags: Flags) -> MemberType {
        MemberType::Invalid
    }

    fn read_int(&mut self, flags: Flags) -> i64 {
        self.read_sized_int(numeric_width_or_default(flags))
    }

    fn read_float(&mut self, flags: Flags) -> f64 {
        match numeric_width_or_default(flags) {
            NumericWidth::Float32 => {
                let len = 4;
                if self.pos + len > self.data.len() {
                    self.fail();
                    return 0.0;
                }
                let bytes: [u8; 4] = self.data[self.pos..self.pos + len].try_into().unwrap();
                self.pos += len;
                f64::from(f32::from_le_bytes(bytes))
            }
            _ => {
                let len = 8;
                if self.pos + len > self.data.len() {
                    self.fail();
                    return 0.0;
                }
                let bytes: [u8; 8] = self.data[self.pos..self.pos + len].try_into().unwrap();
                self.pos += len;
                f64::from_le_bytes(bytes)
            }
        }
    }

    fn read_string(&mut self, _flags: Flags) -> String {
        let len = self.read_size();
        if self.pos + len > self.data.len() {
            self.fail();
            return String::new();
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn read_bool(&mut self, _flags: Flags) -> bool {
        if self.pos >= self.data.len() {
            self.fail();
            return false;
        }
        let value = self.data[self.pos] != 0;
        self.pos += 1;
        value
    }

    fn read_null(&mut self, _flags: Flags) {}

    fn start_reading_array(&mut self, _flags: Flags) -> Result<()> {
        self.depth += 1;
        if self.depth as usize == MAX_DEPTH {
            self.depth -= 1;
            return Err(RpcError::Logic(format!("binary array nesting exceeds depth bound {MAX_DEPTH}")));
        }
        let size = self.read_size();
        self.remaining[self.depth as usize] = size as i64;
        Ok(())
    }

    fn next_array_element(&mut self, _flags: Flags) -> bool {
        if self.depth < 0 {
            return false;
        }
        let slot = &mut self.remaining[self.depth as usize];
        *slot -= 1;
        *slot >= 0
    }

    fn end_reading_array(&mut self, _flags: Flags) {
        if self.depth >= 0 {
            self.remaining[self.depth as usize] = -1;
            self.depth -= 1;
        }
    }

    fn read_object(
        &mut self,
        flags: Flags,
        on_each: &mut dyn FnMut(&mut dyn StructuredInput, Option<&str>, usize) -> bool,
    ) {
        if flags.contains(Flags::OBJECT_LAYOUT_KNOWN) {
            let mut index = 0;
            while on_each(self, None, index) {
                index += 1;
            }
        } else {
            let size = self.read_size();
            for index in 0..size {
                let name = self.read_string(flags);
                if !on_each(self, Some(&name), index) {
                    break;
                }
            }
        }
    }

    fn skip_object_element(&mut self, _flags: Flags) -> Result<()> {
        // No self-describing length to skip past without already knowing
        // the type; a dispatcher asking for this indicates a schema
        // mismatch between client and server.
        Err(RpcError::Logic("binary codec cannot skip an unrecognized member".to_string()))
    }

    fn seek_object_element(&mut self, _flags: Flags, _name: &str) -> Result<bool> {
        // Members carry no name on the wire; layout is positional only.
        Err(RpcError::Logic("binary codec cannot seek a member by name".to_string()))
    }

    fn read_optional(
        &mut self,
        flags: Flags,
        read_value: &mut dyn FnMut(&mut dyn StructuredInput),
    ) -> bool {
        let present = self.read_bool(flags);
        if present {
            read_value(self);
        }
        present
    }

    fn store_position(&mut self, _flags: Flags) -> Location {
        Location::new(self.pos)
    }

    fn restore_position(&mut self, _flags: Flags, location: Location) {
        self.pos = location.offset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips_at_default_width() {
        let mut out = BinaryOutput::new();
        out.write_int(Flags::none(), 300);
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 4); // default Int32

        let mut input: BinaryInput = BinaryInput::new(&bytes);
        assert_eq!(input.read_int(Flags::none()), 300);
    }

    #[test]
    fn string_round_trips_with_size_prefix() {
        let mut out = BinaryOutput::new();
        out.write_string(Flags::none(), "hello");
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 2 + 5);

        let mut input: BinaryInput = BinaryInput::new(&bytes);
        assert_eq!(input.read_string(Flags::none()), "hello");
    }

    #[test]
    fn array_tracks_remaining_count_across_depth() {
        let mut out = BinaryOutput::new();
        out.start_writing_array(Flags::none(), Some(2));
        out.write_int(Flags::none(), 1);
        out.write_int(Flags::none(), 2);
        out.end_writing_array(Flags::none());
        let bytes = out.into_bytes();

        let mut input: BinaryInput = BinaryInput::new(&bytes);
        input.start_reading_array(Flags::none()).unwrap();
        let mut values = Vec::new();
        while input.next_array_element(Flags::none()) {
            values.push(input.read_int(Flags::none()));
        }
        input.end_reading_array(Flags::none());
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn object_layout_known_omits_names() {
        let mut out = BinaryOutput::new();
        out.start_writing_object(Flags::OBJECT_LAYOUT_KNOWN, Some(1));
        out.introduce_object_member(Flags::OBJECT_LAYOUT_KNOWN, "x", 0);
        out.write_int(Flags::OBJECT_LAYOUT_KNOWN, 7);
        out.end_writing_object(Flags::OBJECT_LAYOUT_KNOWN);
        let bytes = out.into_bytes();
        assert_eq!(bytes.len(), 4); // no size prefix, no name, just the int32
    }

    #[test]
    fn nesting_past_max_depth_is_a_fatal_logic_error() {
        let bytes = [0_u8; 16];
        let mut input: BinaryInput<'_, 2> = BinaryInput::new(&bytes);
        input.start_reading_array(Flags::none()).unwrap();
        input.start_reading_array(Flags::none()).unwrap();
        let err = input.start_reading_array(Flags::none()).unwrap_err();
        assert!(matches!(err, RpcError::Logic(_)));
    }

    #[test]
    fn skip_object_element_is_a_fatal_logic_error() {
        let bytes = [0_u8; 4];
        let mut input: BinaryInput = BinaryInput::new(&bytes);
        let err = input.skip_object_element(Flags::none()).unwrap_err();
        assert!(matches!(err, RpcError::Logic(_)));
    }

    #[test]
    fn seek_object_element_is_a_fatal_logic_error() {
        let bytes = [0_u8; 4];
        let mut input: BinaryInput = BinaryInput::new(&bytes);
        let err = input.seek_object_element(Flags::none(), "x").unwrap_err();
        assert!(matches!(err, RpcError::Logic(_)));
    }

    proptest::proptest! {
        #[test]
        fn int64_round_trips(value: i64) {
            let mut out = BinaryOutput::new();
            out.write_int(Flags::INT_64, value);
            let bytes = out.into_bytes();
            let mut input: BinaryInput = BinaryInput::new(&bytes);
            prop_assert_eq!(input.read_int(Flags::INT_64), value);
        }

        #[test]
        fn string_round_trips(value in "\\PC*") {
            let mut out = BinaryOutput::new();
            out.write_string(Flags::none(), &value);
            let bytes = out.into_bytes();
            let mut input: BinaryInput = BinaryInput::new(&bytes);
            prop_assert_eq!(input.read_string(Flags::none()), value);
        }
    }
}
