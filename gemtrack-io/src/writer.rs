//! Track output writers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use gemtrack_algorithms::EventResult;
use gemtrack_core::track::Track;
use log::debug;
use serde::Serialize;

use crate::Result;

/// Output file layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One CSV row per retained track.
    Csv,
    /// One JSON object per event with the best track and its hit diagnostics.
    JsonLines,
}

impl OutputFormat {
    /// Picks the format from a file extension; anything but `.csv` is JSON
    /// lines.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::JsonLines,
        }
    }
}

#[derive(Serialize)]
struct JsonEventRecord {
    event: u64,
    candidates: usize,
    combinations_examined: u64,
    best: Option<JsonBestTrack>,
}

#[derive(Serialize)]
struct JsonBestTrack {
    x0: f64,
    y0: f64,
    xp: f64,
    yp: f64,
    chi2ndf: f64,
    nhits: usize,
    hits: Vec<JsonHit>,
}

#[derive(Serialize)]
struct JsonHit {
    layer: i32,
    module: i32,
    x: f64,
    y: f64,
    z: f64,
    projected_x: f64,
    projected_y: f64,
    residual_x: f64,
    residual_y: f64,
}

impl From<&Track> for JsonBestTrack {
    fn from(track: &Track) -> Self {
        let hits = track
            .diagnostics()
            .into_iter()
            .map(|d| JsonHit {
                layer: d.layer_id,
                module: d.module_id,
                x: d.x,
                y: d.y,
                z: d.z,
                projected_x: d.projected_x,
                projected_y: d.projected_y,
                residual_x: d.residual_x(),
                residual_y: d.residual_y(),
            })
            .collect();
        Self {
            x0: track.params.x0,
            y0: track.params.y0,
            xp: track.params.xp,
            yp: track.params.yp,
            chi2ndf: track.params.chi2ndf,
            nhits: track.nhits(),
            hits,
        }
    }
}

/// Writer for tracking results.
pub struct TrackFileWriter {
    writer: BufWriter<File>,
}

impl TrackFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes results in the given format.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_results(&mut self, results: &[EventResult], format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => self.write_tracks_csv(results),
            OutputFormat::JsonLines => self.write_events_jsonl(results),
        }
    }

    /// Writes every retained track as CSV, best first within each event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_tracks_csv(&mut self, results: &[EventResult]) -> Result<()> {
        writeln!(self.writer, "event,rank,x0,y0,xp,yp,chi2ndf,nhits")?;

        for result in results {
            let t = &result.tracks;
            for i in 0..t.len() {
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{},{}",
                    result.number, i, t.x0[i], t.y0[i], t.xp[i], t.yp[i], t.chi2ndf[i], t.nhits[i]
                )?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes the hits of every retained track as CSV.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_hits_csv(&mut self, results: &[EventResult]) -> Result<()> {
        writeln!(self.writer, "event,rank,x,y,z,module")?;

        for result in results {
            let t = &result.tracks;
            for h in 0..t.total_hits() {
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{}",
                    result.number,
                    t.hit_track_index[h],
                    t.hit_x[h],
                    t.hit_y[h],
                    t.hit_z[h],
                    t.hit_module[h]
                )?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes one JSON object per event.
    ///
    /// # Errors
    /// Returns an error if writing or serialization fails.
    pub fn write_events_jsonl(&mut self, results: &[EventResult]) -> Result<()> {
        for result in results {
            let record = JsonEventRecord {
                event: result.number,
                candidates: result.tracks.len(),
                combinations_examined: result.statistics.combinations_examined,
                best: result.best.as_ref().map(JsonBestTrack::from),
            };
            serde_json::to_writer(&mut self.writer, &record)?;
            self.writer.write_all(b"\n")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes `results` to `output` in the format its extension selects and,
/// when `hits` is given, the per-hit columns of every retained track there
/// as CSV.
///
/// # Errors
/// Returns an error if either file cannot be written.
pub fn write_track_files(
    results: &[EventResult],
    output: &Path,
    hits: Option<&Path>,
) -> Result<OutputFormat> {
    let format = OutputFormat::from_path(output);
    TrackFileWriter::create(output)?.write_results(results, format)?;
    debug!("Wrote {:?} output to {}", format, output.display());

    if let Some(path) = hits {
        TrackFileWriter::create(path)?.write_hits_csv(results)?;
        debug!("Wrote track hits to {}", path.display());
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemtrack_algorithms::{RoutingSummary, SearchStatistics};
    use gemtrack_core::point::Point;
    use gemtrack_core::soa::TrackBatch;
    use gemtrack_core::track::{HitRef, TrackParameters};
    use tempfile::NamedTempFile;

    fn sample_results() -> Vec<EventResult> {
        let track = Track {
            params: TrackParameters {
                x0: 1.5,
                y0: -2.0,
                xp: 0.25,
                yp: 0.5,
                chi2ndf: 0.75,
            },
            hits: vec![HitRef::new(0, 0), HitRef::new(1, 0)],
            points: vec![
                Point::new(1.5, -2.0, 0.0).with_module(7),
                Point::new(4.0, 3.0, 10.0).with_module(8),
            ],
            residuals_x: vec![0.0, 0.0],
            residuals_y: vec![0.0, 0.0],
        };
        let statistics = SearchStatistics {
            combinations_examined: 9,
            ..SearchStatistics::default()
        };

        vec![
            EventResult {
                number: 3,
                tracks: TrackBatch::from_tracks([&track]),
                best: Some(track),
                statistics,
                routing: RoutingSummary::default(),
            },
            EventResult {
                number: 4,
                best: None,
                tracks: TrackBatch::default(),
                statistics: SearchStatistics::default(),
                routing: RoutingSummary::default(),
            },
        ]
    }

    #[test]
    fn test_write_tracks_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = TrackFileWriter::create(file.path()).unwrap();
        writer.write_tracks_csv(&sample_results()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "event,rank,x0,y0,xp,yp,chi2ndf,nhits");
        assert_eq!(lines[1], "3,0,1.5,-2,0.25,0.5,0.75,2");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_write_hits_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = TrackFileWriter::create(file.path()).unwrap();
        writer.write_hits_csv(&sample_results()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("3,0,1.5,-2,0,7"));
        assert!(content.contains("3,0,4,3,10,8"));
    }

    #[test]
    fn test_write_events_jsonl() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = TrackFileWriter::create(file.path()).unwrap();
        writer
            .write_results(&sample_results(), OutputFormat::JsonLines)
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], 3);
        assert_eq!(first["combinations_examined"], 9);
        assert_eq!(first["best"]["nhits"], 2);
        assert_eq!(first["best"]["hits"][1]["module"], 8);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second["best"].is_null());
    }

    #[test]
    fn test_write_track_files_with_hits() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tracks.csv");
        let hits = dir.path().join("hits.csv");

        let format = write_track_files(&sample_results(), &output, Some(&hits)).unwrap();
        assert_eq!(format, OutputFormat::Csv);

        let tracks = std::fs::read_to_string(&output).unwrap();
        assert!(tracks.starts_with("event,rank,x0,y0,xp,yp,chi2ndf,nhits"));

        let hit_rows = std::fs::read_to_string(&hits).unwrap();
        let lines: Vec<&str> = hit_rows.lines().collect();
        assert_eq!(lines[0], "event,rank,x,y,z,module");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_track_files_without_hits() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("tracks.jsonl");

        let format = write_track_files(&sample_results(), &output, None).unwrap();
        assert_eq!(format, OutputFormat::JsonLines);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(OutputFormat::from_path("tracks.CSV"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_path("tracks.jsonl"), OutputFormat::JsonLines);
        assert_eq!(OutputFormat::from_path("tracks"), OutputFormat::JsonLines);
    }
}
