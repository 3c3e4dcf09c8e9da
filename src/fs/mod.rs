mod record;
mod traits;

pub use record::{LogRecord, RecordWriter, ResultLog};
pub use traits::FileOperation;
