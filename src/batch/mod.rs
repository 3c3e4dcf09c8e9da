pub mod events;
pub mod report;
pub mod request;
pub mod scheduler;

pub use events::{EventSink, NullSink};
pub use report::BatchReport;
pub use request::ExtractionRequest;
pub use scheduler::Scheduler;
