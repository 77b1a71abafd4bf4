//! Event file reading.
//!
//! Event files are JSON lines, one event per line:
//!
//! ```text
//! {"event": 12, "hits": [{"layer": 0, "x": 1.5, "y": -3.2, "x_charge": 820.0}]}
//! ```
//!
//! Hit coordinates are local to their layer. Blank lines and lines starting
//! with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use gemtrack_core::event::{CoordinateFrame, Event};
use gemtrack_core::point::{Point, UNDEFINED_TIMEBIN};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Deserialize)]
struct JsonEvent {
    event: u64,
    #[serde(default)]
    hits: Vec<JsonHit>,
}

#[derive(Deserialize)]
struct JsonHit {
    layer: i32,
    x: f64,
    y: f64,
    module: Option<i32>,
    #[serde(default)]
    x_charge: f64,
    #[serde(default)]
    y_charge: f64,
    #[serde(default)]
    x_peak: f64,
    #[serde(default)]
    y_peak: f64,
    #[serde(default = "undefined_timebin")]
    x_max_timebin: i32,
    #[serde(default = "undefined_timebin")]
    y_max_timebin: i32,
    #[serde(default)]
    x_size: i32,
    #[serde(default)]
    y_size: i32,
}

fn undefined_timebin() -> i32 {
    UNDEFINED_TIMEBIN
}

impl JsonHit {
    fn into_point(self) -> Point {
        // One module per layer unless the file says otherwise.
        let module = self.module.unwrap_or(self.layer);
        Point::new(self.x, self.y, 0.0)
            .with_charge(self.x_charge, self.y_charge)
            .with_peak(self.x_peak, self.y_peak)
            .with_max_timebin(self.x_max_timebin, self.y_max_timebin)
            .with_size(self.x_size, self.y_size)
            .with_module(module)
            .with_layer(self.layer)
    }
}

/// Parses one event line.
///
/// # Errors
/// Returns an error if the line is not a valid event record.
pub fn parse_event_line(line: &str) -> Result<Event> {
    let record: JsonEvent = serde_json::from_str(line)?;
    let mut event = Event::new(record.event).with_frame(CoordinateFrame::Local);
    event.hits = record.hits.into_iter().map(JsonHit::into_point).collect();
    Ok(event)
}

/// Streaming reader over an event file.
pub struct EventReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl EventReader<BufReader<File>> {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let line_number = self.line_number;
            return Some(parse_event_line(trimmed).map_err(|e| {
                Error::InvalidFormat(format!("event file line {line_number}: {e}"))
            }));
        }
    }
}

/// Reads every event of a file.
///
/// # Errors
/// Returns the first read or parse error.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    EventReader::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_event_line() {
        let line = r#"{"event": 4, "hits": [
            {"layer": 2, "x": 1.5, "y": -2.0, "x_charge": 300, "x_max_timebin": 3},
            {"layer": 3, "x": 0.0, "y": 0.0, "module": 31}
        ]}"#;
        let event = parse_event_line(line).unwrap();

        assert_eq!(event.number, 4);
        assert_eq!(event.len(), 2);
        assert!(event.is_local());
        let first = event.hits[0];
        assert_eq!(first.layer_id, 2);
        assert_eq!(first.module_id, 2);
        assert_eq!(first.x_max_timebin, 3);
        assert_eq!(first.y_max_timebin, UNDEFINED_TIMEBIN);
        assert!((first.x_charge - 300.0).abs() < f64::EPSILON);
        assert_eq!(event.hits[1].module_id, 31);
    }

    #[test]
    fn test_reader_skips_blank_and_comment_lines() {
        let data = "# run 17\n\n{\"event\": 1, \"hits\": []}\n{\"event\": 2}\n";
        let events: Vec<Event> = EventReader::new(Cursor::new(data))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].number, 2);
        assert!(events[1].is_empty());
    }

    #[test]
    fn test_reader_reports_line_number() {
        let data = "{\"event\": 1}\n{\"event\": \"two\"}\n";
        let mut reader = EventReader::new(Cursor::new(data));
        assert!(reader.next().unwrap().is_ok());

        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(ref msg) if msg.contains("line 2")));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_events_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"event": 10, "hits": [{{"layer": 0, "x": 1, "y": 2}}]}}"#).unwrap();
        writeln!(file, r#"{{"event": 11, "hits": []}}"#).unwrap();
        file.flush().unwrap();

        let events = read_events(file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].hits[0].layer_id, 0);
    }
}
