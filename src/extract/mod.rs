pub mod archiver;
pub mod classifier;
pub mod outcome;
pub mod session;
pub mod stream;

pub use archiver::{locate_archiver, Archiver, ArchiverChild, ProcessControl, SevenZip};
pub use classifier::{Classified, ClassifiedEvent, Classifier};
pub use outcome::SessionOutcome;
pub use session::{ExtractionSession, SessionControl, SessionState};
pub use stream::{OutputContext, OutputEvent};
