//! Terminal output

pub mod progress;

pub use progress::{format_event_line, ProgressReporter};
