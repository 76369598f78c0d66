use std::fmt;

use bytes::Bytes;

use crate::error::ErrorPayload;

use super::escape::serialize_reference;

/// Row id shared by model rows and error rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(u32);

impl ChunkId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn reference(&self) -> String {
        serialize_reference(*self)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ChunkIdAllocator {
    next: u32,
}

impl ChunkIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ChunkId {
        let id = ChunkId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    Model,
    Error,
}

impl ChunkTag {
    pub fn tag_char(&self) -> Option<char> {
        match self {
            Self::Model => None,
            Self::Error => Some('E'),
        }
    }

    pub fn format_row(&self, id: ChunkId, data: &str) -> String {
        match self.tag_char() {
            Some(tag) => format!("{id}:{tag}{data}\n"),
            None => format!("{id}:{data}\n"),
        }
    }
}

/// One fully serialized row, ready to hand to a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    id: ChunkId,
    tag: ChunkTag,
    data: Bytes,
}

impl Chunk {
    pub fn model(id: ChunkId, json: &str) -> Self {
        Self { id, tag: ChunkTag::Model, data: Bytes::from(ChunkTag::Model.format_row(id, json)) }
    }

    pub fn error(id: ChunkId, payload: &ErrorPayload) -> Self {
        let json = serde_json::to_string(payload).unwrap_or_else(|_| {
            format!(r#"{{"message":"{}","stack":""}}"#, ErrorPayload::FALLBACK_MESSAGE)
        });
        Self { id, tag: ChunkTag::Error, data: Bytes::from(ChunkTag::Error.format_row(id, &json)) }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.data).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = ChunkIdAllocator::new();
        assert_eq!(ids.allocate(), ChunkId::new(0));
        assert_eq!(ids.allocate(), ChunkId::new(1));
        assert_eq!(ids.allocate(), ChunkId::new(2));
    }

    #[test]
    fn test_model_row_format() {
        let chunk = Chunk::model(ChunkId::new(3), r#"{"a":1}"#);
        assert_eq!(chunk.as_str(), "3:{\"a\":1}\n");
        assert_eq!(chunk.tag(), ChunkTag::Model);
    }

    #[test]
    fn test_error_row_format() {
        let payload = ErrorPayload { message: "boom".to_string(), stack: String::new() };
        let chunk = Chunk::error(ChunkId::new(12), &payload);

        assert_eq!(chunk.as_str(), "12:E{\"message\":\"boom\",\"stack\":\"\"}\n");
        assert_eq!(chunk.id(), ChunkId::new(12));
    }

    #[test]
    fn test_row_ids_are_decimal_and_references_hex() {
        let id = ChunkId::new(26);
        assert!(Chunk::model(id, "null").as_str().starts_with("26:"));
        assert_eq!(id.reference(), "$1a");
    }
}
