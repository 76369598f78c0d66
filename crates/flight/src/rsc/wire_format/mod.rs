pub mod chunk;
pub mod describe;
pub mod escape;
pub mod serializer;

pub use chunk::{Chunk, ChunkId, ChunkIdAllocator, ChunkTag};
pub use escape::{WireString, escape_string, parse_wire_string, unescape_string};
pub use serializer::{ModelSerializer, SerializationContext};
