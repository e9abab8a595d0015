//! Live progress of a crawl run
//!
//! Progress is derived from the run's `CrawlState` and broadcast to any
//! number of subscribers. Nothing here touches storage, and a send with no
//! subscribers is not an error.

mod events;
mod reporter;

pub use events::{CompletionEvent, Eta, FailureEvent, ProgressEvent, ProgressUpdate};
pub use reporter::{estimate_eta, progress_percent, ProgressReporter};
