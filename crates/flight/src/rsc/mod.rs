pub mod diagnostics;
pub mod hooks;
pub mod modules;
pub mod rendering;
pub mod resolver;
pub mod thenable;
pub mod types;
pub mod wire_format;

pub use diagnostics::{Diagnostics, NoopDiagnostics, TracingDiagnostics};
pub use modules::{BundlerConfig, ModuleMap, ModuleMetaData, ModuleReference, ServerBlock};
pub use rendering::streaming::{
    Destination, FlightStream, ManualScheduler, MemoryDestination, MemoryOutput, Request,
    RequestOptions, Scheduler, render_to_stream,
};
pub use resolver::resolve_element;
pub use thenable::{Promise, PromiseStatus, Resolution, Thenable};
pub use types::{Element, Marker, Model, Record, Renderable, ToModel};
pub use wire_format::{Chunk, ChunkId};
