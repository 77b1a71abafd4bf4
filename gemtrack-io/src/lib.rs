//! gemtrack-io: File I/O for gemtrack.
//!
//! This crate loads detector setups from JSON, streams events from JSON-lines
//! files and writes tracking results as CSV or JSON lines.
//!

mod error;
mod reader;
pub mod setup;
mod writer;

pub use error::{Error, Result};
pub use reader::{parse_event_line, read_events, EventReader};
pub use setup::{LayerSetup, SetupConfig};
pub use writer::{write_track_files, OutputFormat, TrackFileWriter};
