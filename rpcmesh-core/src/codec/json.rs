//! JSON codec: tab-indented pretty-printing writer and a lookahead-based
//! reader, both hand-rolled against [`StructuredOutput`]/[`StructuredInput`]
//! rather than delegating to `serde_json`'s own (de)serializer — the codec
//! itself, including its exact whitespace handling and duplicate-key
//! seeking, is core subject matter here, not incidental plumbing.

use crate::error::Result;
use crate::flags::Flags;
use crate::io::{Location, MemberType, StructuredInput, StructuredOutput};

/// Writes a pretty-printed JSON document, one tab per nesting level.
pub struct JsonOutput {
    buf: String,
    depth: usize,
}

impl JsonOutput {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            depth: 0,
        }
    }

    /// Consumes the writer, returning the accumulated document text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buf
    }

    fn indent(&mut self) {
        self.buf.push('\n');
        for _ in 0..self.depth {
            self.buf.push('\t');
        }
    }

    fn write_escaped_string(&mut self, value: &str) {
        self.buf.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.buf.push_str("\\\""),
                '\\' => self.buf.push_str("\\\\"),
                '\n' => self.buf.push_str("\\n"),
                '\r' => self.buf.push_str("\\r"),
                '\t' => self.buf.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    self.buf.push_str(&format!("\\u{:04x}", c as u32));
                }
                c => self.buf.push(c),
            }
        }
        self.buf.push('"');
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredOutput for JsonOutput {
    fn write_int(&mut self, _flags: Flags, value: i64) {
        self.buf.push_str(&value.to_string());
    }

    fn write_float(&mut self, _flags: Flags, value: f64) {
        // NaN/Infinity have no JSON representation; the teacher format
        // writes a bare 0 rather than producing invalid output.
        if value.is_finite() {
            self.buf.push_str(&value.to_string());
        } else {
            self.buf.push('0');
        }
    }

    fn write_string(&mut self, _flags: Flags, value: &str) {
        self.write_escaped_string(value);
    }

    fn write_bool(&mut self, _flags: Flags, value: bool) {
        self.buf.push_str(if value { "true" } else { "false" });
    }

    fn write_null(&mut self, _flags: Flags) {
        self.buf.push_str("null");
    }

    fn start_writing_array(&mut self, _flags: Flags, _size: Option<usize>) {
        self.buf.push('[');
        self.depth += 1;
    }

    fn introduce_array_element(&mut self, _flags: Flags, index: usize) {
        if index > 0 {
            self.buf.push(',');
        }
        self.indent();
    }

    fn end_writing_array(&mut self, _flags: Flags) {
        self.depth -= 1;
        self.indent();
        self.buf.push(']');
    }

    fn start_writing_object(&mut self, _flags: Flags, _size: Option<usize>) {
        self.buf.push('{');
        self.depth += 1;
    }

    fn introduce_object_member(&mut self, _flags: Flags, name: &str, index: usize) {
        if index > 0 {
            self.buf.push(',');
        }
        self.indent();
        self.write_escaped_string(name);
        self.buf.push_str(": ");
    }

    fn end_writing_object(&mut self, _flags: Flags) {
        self.depth -= 1;
        self.indent();
        self.buf.push('}');
    }

    fn write_optional(
        &mut self,
        flags: Flags,
        present: bool,
        write_value: &mut dyn FnMut(&mut dyn StructuredOutput),
    ) {
        if present {
            write_value(self);
        } else {
            self.write_null(flags);
        }
    }
}

/// Reads from an in-memory JSON document with single-character lookahead.
pub struct JsonInput<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    good: bool,
}

impl<'a> JsonInput<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            good: true,
        }
    }

    fn eat_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn fail(&mut self) {
        self.good = false;
    }

    fn parse_string_raw(&mut self) -> String {
        self.eat_whitespace();
        if self.peek() != Some(b'"') {
            self.fail();
            return String::new();
        }
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => {
                    self.fail();
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(b'"') => {
                            out.push('"');
                            self.pos += 1;
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            self.pos += 1;
                        }
                        Some(b'/') => {
                            out.push('/');
                            self.pos += 1;
                        }
                        Some(b'n') => {
                            out.push('\n');
                            self.pos += 1;
                        }
                        Some(b'r') => {
                            out.push('\r');
                            self.pos += 1;
                        }
                        Some(b't') => {
                            out.push('\t');
                            self.pos += 1;
                        }
                        Some(b'u') => {
                            self.pos += 1;
                            let hex = self.text.get(self.pos..self.pos + 4);
                            if let Some(hex) = hex.and_then(|h| u32::from_str_radix(h, 16).ok()) {
                                if let Some(c) = char::from_u32(hex) {
                                    out.push(c);
                                }
                                self.pos += 4;
                            } else {
                                self.fail();
                                break;
                            }
                        }
                        _ => {
                            self.fail();
                            break;
                        }
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while let Some(b) = self.peek() {
                        if b == b'"' || b == b'\\' {
                            break;
                        }
                        self.pos += 1;
                    }
                    out.push_str(&self.text[start..self.pos]);
                }
            }
        }
        out
    }

    fn parse_number_raw(&mut self) -> &'a str {
        self.eat_whitespace();
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'+' || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.text[start..self.pos]
    }
}

impl StructuredInput for JsonInput<'_> {
    fn good(&self) -> bool {
        self.good
    }

    fn identify_type(&mut self, _flags: Flags) -> MemberType {
        self.eat_whitespace();
        match self.peek() {
            Some(b'"') => MemberType::String,
            Some(b't' | b'f') => MemberType::Boolean,
            Some(b'n') => MemberType::Null,
            Some(b'[') => MemberType::Array,
            Some(b'{') => MemberType::Object,
            Some(b'-') => MemberType::Integer,
            Some(b) if b.is_ascii_digit() => MemberType::Integer,
            _ => MemberType::Invalid,
        }
    }

    fn read_int(&mut self, _flags: Flags) -> i64 {
        let text = self.parse_number_raw();
        text.parse::<f64>().map_or_else(
            |_| {
                self.fail();
                0
            },
            |v| v as i64,
        )
    }

    fn read_float(&mut self, _flags: Flags) -> f64 {
        let text = self.parse_number_raw();
        text.parse::<f64>().unwrap_or_else(|_| {
            self.fail();
            0.0
        })
    }

    fn read_string(&mut self, _flags: Flags) -> String {
        self.parse_string_raw()
    }

    fn read_bool(&mut self, _flags: Flags) -> bool {
        self.eat_whitespace();
        if self.text[self.pos..].starts_with("true") {
            self.pos += 4;
            true
        } else if self.text[self.pos..].starts_with("false") {
            self.pos += 5;
            false
        } else {
            self.fail();
            false
        }
    }

    fn read_null(&mut self, _flags: Flags) {
        self.eat_whitespace();
        if self.text[self.pos..].starts_with("null") {
            self.pos += 4;
        } else {
            self.fail();
        }
    }

    fn start_reading_array(&mut self, _flags: Flags) -> Result<()> {
        self.eat_whitespace();
        if self.peek() == Some(b'[') {
            self.pos += 1;
        } else {
            self.fail();
        }
        Ok(())
    }

    fn next_array_element(&mut self, _flags: Flags) -> bool {
        self.eat_whitespace();
        match self.peek() {
            Some(b']') => false,
            Some(b',') => {
                self.pos += 1;
                self.eat_whitespace();
                self.peek() != Some(b']')
            }
            None => false,
            _ => true,
        }
    }

    fn end_reading_array(&mut self, _flags: Flags) {
        self.eat_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            self.fail();
        }
    }

    fn read_object(
        &mut self,
        flags: Flags,
        on_each: &mut dyn FnMut(&mut dyn StructuredInput, Option<&str>, usize) -> bool,
    ) {
        self.eat_whitespace();
        if self.peek() != Some(b'{') {
            self.fail();
            return;
        }
        self.pos += 1;
        let mut index = 0;
        loop {
            self.eat_whitespace();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => {
                    self.fail();
                    break;
                }
                _ => {}
            }
            let name = self.parse_string_raw();
            self.eat_whitespace();
            if self.peek() == Some(b':') {
                self.pos += 1;
            } else {
                self.fail();
                break;
            }
            if !on_each(self, Some(&name), index) {
                break;
            }
            index += 1;
            self.eat_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    self.fail();
                    break;
                }
            }
        }
        let _ = flags;
    }

    fn skip_object_element(&mut self, flags: Flags) -> Result<()> {
        match self.identify_type(flags) {
            MemberType::String => {
                self.parse_string_raw();
            }
            MemberType::Integer | MemberType::Float => {
                self.parse_number_raw();
            }
            MemberType::Boolean => {
                self.read_bool(flags);
            }
            MemberType::Null => {
                self.read_null(flags);
            }
            MemberType::Array => {
                self.start_reading_array(flags)?;
                while self.next_array_element(flags) {
                    self.skip_object_element(flags)?;
                }
                self.end_reading_array(flags);
            }
            MemberType::Object => {
                self.read_object(flags, &mut |input, _name, _index| {
                    let _ = input.skip_object_element(flags);
                    true
                });
            }
            MemberType::Invalid => self.fail(),
        }
        Ok(())
    }

    fn seek_object_element(&mut self, flags: Flags, name: &str) -> Result<bool> {
        self.eat_whitespace();
        if self.peek() != Some(b'{') {
            self.fail();
            return Ok(false);
        }
        self.pos += 1;
        loop {
            self.eat_whitespace();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(false);
                }
                None => {
                    self.fail();
                    return Ok(false);
                }
                _ => {}
            }
            let key = self.parse_string_raw();
            self.eat_whitespace();
            if self.peek() == Some(b':') {
                self.pos += 1;
            } else {
                self.fail();
                return Ok(false);
            }
            if key == name {
                return Ok(true);
            }
            self.skip_object_element(flags)?;
            self.eat_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(false);
                }
                _ => {
                    self.fail();
                    return Ok(false);
                }
            }
        }
    }

    fn read_optional(
        &mut self,
        flags: Flags,
        read_value: &mut dyn FnMut(&mut dyn StructuredInput),
    ) -> bool {
        if self.identify_type(flags) == MemberType::Null {
            self.read_null(flags);
            false
        } else {
            read_value(self);
            true
        }
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
    fn writes_nested_object_with_tab_indentation() {
        let mut out = JsonOutput::new();
        out.start_writing_object(Flags::none(), Some(1));
        out.introduce_object_member(Flags::none(), "a", 0);
        out.write_int(Flags::none(), 1);
        out.end_writing_object(Flags::none());
        assert_eq!(out.into_string(), "{\n\t\"a\": 1\n}");
    }

    #[test]
    fn non_finite_floats_write_as_zero() {
        let mut out = JsonOutput::new();
        out.write_float(Flags::none(), f64::NAN);
        assert_eq!(out.into_string(), "0");
    }

    #[test]
    fn reads_escaped_string() {
        let mut input = JsonInput::new(r#""a\nb\"c""#);
        let value = input.read_string(Flags::none());
        assert_eq!(value, "a\nb\"c");
        assert!(input.good());
    }

    #[test]
    fn skip_object_element_advances_past_nested_value() {
        let mut input = JsonInput::new(r#"{"skip": {"x": 1, "y": [1,2,3]}, "keep": 5}"#);
        let mut seen = Vec::new();
        input.read_object(Flags::none(), &mut |input, name, _index| {
            if name == Some("skip") {
                input.skip_object_element(Flags::none()).unwrap();
            } else {
                seen.push(input.read_int(Flags::none()));
            }
            true
        });
        assert_eq!(seen, vec![5]);
        assert!(input.good());
    }

    #[test]
    fn store_and_restore_position_rereads_same_value() {
        let mut input = JsonInput::new(r#"[1, 2]"#);
        input.start_reading_array(Flags::none()).unwrap();
        assert!(input.next_array_element(Flags::none()));
        let mark = input.store_position(Flags::none());
        let first = input.read_int(Flags::none());
        input.restore_position(Flags::none(), mark);
        let first_again = input.read_int(Flags::none());
        assert_eq!(first, first_again);
    }

    #[test]
    fn seek_object_element_finds_a_later_member_and_positions_at_its_value() {
        let mut input = JsonInput::new(r#"{"params": {"a": 1}, "method": "sum", "id": 7}"#);
        assert!(input.seek_object_element(Flags::none(), "method").unwrap());
        assert_eq!(input.read_string(Flags::none()), "sum");
    }

    #[test]
    fn seek_object_element_skips_nested_objects_without_matching_inner_keys() {
        let mut input = JsonInput::new(r#"{"method": {"id": "nope"}, "id": 7}"#);
        assert!(input.seek_object_element(Flags::none(), "id").unwrap());
        assert_eq!(input.read_int(Flags::none()), 7);
    }

    #[test]
    fn seek_object_element_reports_a_miss() {
        let mut input = JsonInput::new(r#"{"a": 1, "b": 2}"#);
        assert!(!input.seek_object_element(Flags::none(), "missing").unwrap());
        assert!(input.good());
    }

    proptest::proptest! {
        #[test]
        fn int_round_trips(value: i64) {
            let mut out = JsonOutput::new();
            out.write_int(Flags::none(), value);
            let text = out.into_string();
            let mut input = JsonInput::new(&text);
            prop_assert_eq!(input.read_int(Flags::none()), value);
            prop_assert!(input.good());
        }

        #[test]
        fn bool_round_trips(value: bool) {
            let mut out = JsonOutput::new();
            out.write_bool(Flags::none(), value);
            let text = out.into_string();
            let mut input = JsonInput::new(&text);
            prop_assert_eq!(input.read_bool(Flags::none()), value);
            prop_assert!(input.good());
        }

        #[test]
        fn string_round_trips(value in ".*") {
            let mut out = JsonOutput::new();
            out.write_string(Flags::none(), &value);
            let text = out.into_string();
            let mut input = JsonInput::new(&text);
            prop_assert_eq!(input.read_string(Flags::none()), value);
            prop_assert!(input.good());
        }
    }
}
