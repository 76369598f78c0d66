pub mod destination;
pub mod request;
pub mod scheduler;
pub mod segment;
pub mod stream;

pub use destination::{Destination, MemoryDestination, MemoryOutput};
pub use request::{Request, RequestOptions};
pub use scheduler::{LocalTaskScheduler, ManualScheduler, Scheduler, Work};
pub use segment::{Segment, SegmentQuery};
pub use stream::{ChannelDestination, FlightStream, render_to_stream};
