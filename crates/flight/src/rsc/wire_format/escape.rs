use std::borrow::Cow;

use super::chunk::ChunkId;

pub const ELEMENT_MARKER: &str = "$";
pub const SERVER_BLOCK_MARKER: &str = "@";

/// `$` and `@` prefixed strings are reserved for references and markers, so literal strings
/// starting with either get an extra `$`.
pub fn escape_string(value: &str) -> Cow<'_, str> {
    if value.starts_with('$') || value.starts_with('@') {
        Cow::Owned(format!("${value}"))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn serialize_reference(id: ChunkId) -> String {
    format!("${:x}", id.as_u32())
}

/// A string as it appears inside a serialized row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireString<'a> {
    Literal(Cow<'a, str>),
    Reference(ChunkId),
    ElementMarker,
    ServerBlockMarker,
}

pub fn parse_wire_string(value: &str) -> WireString<'_> {
    match value {
        ELEMENT_MARKER => return WireString::ElementMarker,
        SERVER_BLOCK_MARKER => return WireString::ServerBlockMarker,
        _ => {}
    }

    let Some(rest) = value.strip_prefix('$') else {
        return WireString::Literal(Cow::Borrowed(value));
    };

    if rest.starts_with('$') || rest.starts_with('@') {
        return WireString::Literal(Cow::Borrowed(rest));
    }

    match u32::from_str_radix(rest, 16) {
        Ok(id) => WireString::Reference(ChunkId::new(id)),
        Err(_) => WireString::Literal(Cow::Borrowed(value)),
    }
}

pub fn unescape_string(value: &str) -> Cow<'_, str> {
    match parse_wire_string(value) {
        WireString::Literal(literal) => literal,
        _ => Cow::Borrowed(value),
    }
}
