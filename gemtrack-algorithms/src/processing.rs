//! High-level helpers that route events through a detector and track finder.

use gemtrack_core::config::TrackingCuts;
use gemtrack_core::error::Result;
use gemtrack_core::event::Event;
use gemtrack_core::soa::TrackBatch;
use gemtrack_core::track::Track;
use rayon::prelude::*;

use crate::detector::{Detector, RoutingSummary};
use crate::engine::{SearchStatistics, TrackFinder};

/// Tracking outcome for one event.
#[derive(Clone, Debug)]
pub struct EventResult {
    /// Event number.
    pub number: u64,
    /// Best track, if any passed the cuts.
    pub best: Option<Track>,
    /// Retained candidates, best first.
    pub tracks: TrackBatch,
    /// Search counters.
    pub statistics: SearchStatistics,
    /// How the event's hits were routed.
    pub routing: RoutingSummary,
}

/// A detector paired with a track finder configured for it.
#[derive(Clone, Debug)]
pub struct TrackingSystem {
    detector: Detector,
    finder: TrackFinder,
}

impl TrackingSystem {
    /// Builds the finder for `detector` and completes its setup.
    ///
    /// # Errors
    /// Returns an error if the cuts are invalid or the detector has too few
    /// tracking layers.
    pub fn new(detector: Detector, cuts: TrackingCuts) -> Result<Self> {
        let mut finder = TrackFinder::new(cuts)?;
        finder.complete_setup(&detector)?;
        Ok(Self { detector, finder })
    }

    /// The detector.
    #[must_use]
    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// The track finder.
    #[must_use]
    pub fn finder(&self) -> &TrackFinder {
        &self.finder
    }

    /// Loads `event`, searches it and flags the best track's grid cells.
    ///
    /// # Errors
    /// Returns an error if a tracking layer disappeared from the detector.
    pub fn process_event(&mut self, event: &Event) -> Result<EventResult> {
        let routing = self.detector.load_event(event);
        self.finder.find_tracks(&self.detector)?;

        let best = self.finder.best().cloned();
        if let Some(track) = &best {
            self.detector.mark_track_cells(track);
        }

        Ok(EventResult {
            number: event.number,
            best,
            tracks: self.finder.track_batch(),
            statistics: *self.finder.statistics(),
            routing,
        })
    }
}

/// Tracks every event, in input order.
///
/// With `parallel`, events are spread over the rayon pool; each worker gets
/// its own clone of `system`.
///
/// # Errors
/// Returns the first error encountered.
pub fn track_events(
    system: &TrackingSystem,
    events: &[Event],
    parallel: bool,
) -> Result<Vec<EventResult>> {
    if parallel {
        events
            .par_iter()
            .map_init(|| system.clone(), |worker, event| worker.process_event(event))
            .collect()
    } else {
        let mut worker = system.clone();
        events
            .iter()
            .map(|event| worker.process_event(event))
            .collect()
    }
}

/// Iterator adapter tracking events as they are pulled.
pub struct TrackEventStream<I> {
    system: TrackingSystem,
    events: I,
}

impl<I> Iterator for TrackEventStream<I>
where
    I: Iterator<Item = Event>,
{
    type Item = Result<EventResult>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.events.next()?;
        Some(self.system.process_event(&event))
    }
}

/// Tracks a stream of events lazily with one system.
pub fn track_event_stream<I>(system: TrackingSystem, events: I) -> TrackEventStream<I::IntoIter>
where
    I: IntoIterator<Item = Event>,
{
    TrackEventStream {
        system,
        events: events.into_iter(),
    }
}
