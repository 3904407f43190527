//! Live log streaming and viewing.
//!
//! Long-running backend jobs (database updates) report progress over a
//! one-way server-push stream. [`stream`] owns the connection and turns the
//! wire format into text lines; [`viewer`] owns the display buffer and the
//! scroll-position-aware auto-follow behavior.

pub mod stream;
pub mod viewer;

pub use stream::{open_stream, LogEvent, LogStreamHandle, StreamError};
pub use viewer::{LogViewer, Viewport, BOTTOM_THRESHOLD_PX, SCROLL_ANIMATION};
