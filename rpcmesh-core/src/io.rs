//! Format-agnostic structured I/O: the push/pull visitor traits every codec
//! implements, and the small value types (`MemberType`, `Location`,
//! `RequestToken`) that travel alongside them.
//!
//! `StructuredOutput` is written to in a strict grammar: a scalar write, or
//! `start_writing_{array,object}` / `introduce_*` / `end_writing_*`.
//! `StructuredInput` is read from in the mirror grammar. Both are
//! object-safe so a [`crate::object::Serialisable`] implementation can hold
//! `&mut dyn StructuredOutput` without knowing which wire format it is.

use crate::error::Result;
use crate::flags::Flags;

/// The shape of the next value a [`StructuredInput`] is positioned at,
/// discovered by lookahead before committing to a `read_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Array,
    Object,
    /// The format reached a point it could not classify; only meaningful
    /// when the input is already known to be malformed.
    Invalid,
}

/// An opaque cursor into a [`StructuredInput`]'s underlying buffer, for
/// codecs that need to revisit a position (the JSON codec's duplicate-key
/// handling, for instance). Not comparable or orderable across different
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(usize);

impl Location {
    /// Wraps a raw byte offset as a location.
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// The raw byte offset this location points at.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// An identifier for one outstanding request, monotonically assigned by a
/// client and echoed back by the responder. Wraps on overflow by design —
/// after four billion in-flight requests a token may collide with one
/// already retired, which is acceptable since responses are consumed
/// promptly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(std::num::Wrapping<u32>);

impl RequestToken {
    /// The first token a fresh counter produces.
    #[must_use]
    pub const fn zero() -> Self {
        Self(std::num::Wrapping(0))
    }

    /// The next token after this one, wrapping past `u32::MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + std::num::Wrapping(1))
    }

    /// The token's raw numeric value, for embedding on the wire.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0.0
    }

    /// Builds a token from a raw wire value.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self(std::num::Wrapping(value))
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.0)
    }
}

/// A sink that structured values are written into. One impl per wire
/// format (JSON, binary, URL-form).
pub trait StructuredOutput {
    fn write_int(&mut self, flags: Flags, value: i64);
    fn write_float(&mut self, flags: Flags, value: f64);
    fn write_string(&mut self, flags: Flags, value: &str);
    fn write_bool(&mut self, flags: Flags, value: bool);
    fn write_null(&mut self, flags: Flags);

    /// Size hint for an upcoming array; `None` when not known in advance.
    fn start_writing_array(&mut self, flags: Flags, size: Option<usize>);
    fn introduce_array_element(&mut self, flags: Flags, index: usize);
    fn end_writing_array(&mut self, flags: Flags);

    /// Size hint for an upcoming object; `None` when not known in advance.
    fn start_writing_object(&mut self, flags: Flags, size: Option<usize>);
    fn introduce_object_member(&mut self, flags: Flags, name: &str, index: usize);
    fn end_writing_object(&mut self, flags: Flags);

    /// Writes either nothing (`present == false`) or calls `write_value`
    /// to write the payload (`present == true`).
    fn write_optional(&mut self, flags: Flags, present: bool, write_value: &mut dyn FnMut(&mut dyn StructuredOutput));
}

/// A convenience wrapper over `&mut dyn StructuredOutput` that tracks the
/// running element index while filling an array, mirroring the teacher
/// format's member-index bookkeeping without requiring every call site to
/// track it by hand.
pub struct ArrayFiller<'a> {
    output: &'a mut dyn StructuredOutput,
    index: usize,
}

impl<'a> ArrayFiller<'a> {
    /// Opens array-writing on `output`, returning a filler that must be
    /// dropped (or have [`ArrayFiller::finish`] called) to close it.
    pub fn open(output: &'a mut dyn StructuredOutput, size: Option<usize>) -> Self {
        output.start_writing_array(Flags::none(), size);
        Self { output, index: 0 }
    }

    fn advance(&mut self) -> &mut dyn StructuredOutput {
        self.output
            .introduce_array_element(Flags::none(), self.index);
        self.index += 1;
        self.output
    }

    pub fn write_int(&mut self, value: i64) {
        self.advance().write_int(Flags::none(), value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.advance().write_string(Flags::none(), value);
    }

    /// Ends array-writing. Called automatically on drop if not called
    /// explicitly.
    pub fn finish(self) {
        // Drop impl performs the close.
    }
}

impl Drop for ArrayFiller<'_> {
    fn drop(&mut self) {
        self.output.end_writing_array(Flags::none());
    }
}

/// A source that structured values are read from. One impl per wire
/// format (JSON, binary, URL-form).
pub trait StructuredInput {
    /// Whether the input is still in a consistent, recoverable state.
    /// Codecs set this to `false` on malformed input and callers should
    /// stop asking for more values once it's tripped.
    fn good(&self) -> bool;

    fn identify_type(&mut self, flags: Flags) -> MemberType;

    fn read_int(&mut self, flags: Flags) -> i64;
    fn read_float(&mut self, flags: Flags) -> f64;
    fn read_string(&mut self, flags: Flags) -> String;
    fn read_bool(&mut self, flags: Flags) -> bool;
    fn read_null(&mut self, flags: Flags);

    /// # Errors
    /// Returns [`crate::error::RpcError::Logic`] where opening an array is
    /// a programmer misuse rather than a malformed-input condition — depth
    /// exceeding a codec's fixed bound, or nesting in a format that has no
    /// representation for it (URL-form). Ordinary malformed input instead
    /// trips [`StructuredInput::good`].
    fn start_reading_array(&mut self, flags: Flags) -> Result<()>;
    /// Returns `true` if another element follows (and the cursor is now
    /// positioned to read it), `false` once the array is exhausted.
    fn next_array_element(&mut self, flags: Flags) -> bool;
    fn end_reading_array(&mut self, flags: Flags);

    /// Calls `on_each` once per member, passing back a reborrow of `self`
    /// so the callback can read or skip the member's value, along with its
    /// name (when the format carries one) and positional index. Stops
    /// early if `on_each` returns `false`.
    fn read_object(
        &mut self,
        flags: Flags,
        on_each: &mut dyn FnMut(&mut dyn StructuredInput, Option<&str>, usize) -> bool,
    );
    /// Skips the value the cursor is currently positioned at without
    /// interpreting it, for members a reader does not recognize.
    ///
    /// # Errors
    /// Returns [`crate::error::RpcError::Logic`] on formats that have no
    /// generic skip (the binary codec: with no self-describing length,
    /// skipping an unrecognized member means the caller's schema has
    /// drifted from the wire's, a programmer error rather than malformed
    /// input).
    fn skip_object_element(&mut self, flags: Flags) -> Result<()>;

    /// Scans the current object for a member named `name`, leaving the
    /// cursor positioned at its value on success (`Ok(true)`) or past the
    /// whole object on a miss (`Ok(false)`) — used by JSON-RPC dispatch to
    /// resolve `method` when `params` arrives first on the wire, and to
    /// retroactively locate `id` when building an error response.
    ///
    /// # Errors
    /// Returns [`crate::error::RpcError::Logic`] on formats with no
    /// sensible notion of seeking by name (the binary codec: members carry
    /// no name on the wire at all).
    fn seek_object_element(&mut self, flags: Flags, name: &str) -> Result<bool>;

    /// Calls `read_value` if a value is present, returning whether it was.
    fn read_optional(&mut self, flags: Flags, read_value: &mut dyn FnMut(&mut dyn StructuredInput)) -> bool;

    fn store_position(&mut self, flags: Flags) -> Location;
    fn restore_position(&mut self, flags: Flags, location: Location);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_token_wraps_on_overflow() {
        let near_max = RequestToken::from_u32(u32::MAX);
        assert_eq!(near_max.next(), RequestToken::from_u32(0));
    }

    #[test]
    fn request_token_increments_normally() {
        let t = RequestToken::zero();
        assert_eq!(t.next().as_u32(), 1);
    }

    #[test]
    fn location_round_trips_offset() {
        let loc = Location::new(42);
        assert_eq!(loc.offset(), 42);
    }
}
