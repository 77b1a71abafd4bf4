//! Bounded set of the lowest-chi2 track candidates.

use gemtrack_core::track::Track;

#[derive(Debug, Clone)]
struct Entry {
    chi2: f64,
    sequence: u64,
    track: Track,
}

/// Keeps at most `capacity` tracks with the smallest chi2/ndf.
///
/// Entries stay sorted best first. Equal chi2 values keep insertion order,
/// so the earlier candidate survives a tie at the boundary.
#[derive(Debug, Clone)]
pub struct TopKTracks {
    capacity: usize,
    next_sequence: u64,
    entries: Vec<Entry>,
}

impl TopKTracks {
    /// Creates an empty set holding up to `capacity` tracks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_sequence: 0,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of retained tracks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chi2 of the worst retained track.
    #[must_use]
    pub fn worst_chi2(&self) -> Option<f64> {
        self.entries.last().map(|e| e.chi2)
    }

    /// Returns true if a track with `chi2` would be retained.
    #[must_use]
    pub fn would_accept(&self, chi2: f64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.entries.len() < self.capacity || self.worst_chi2().is_some_and(|w| chi2 < w)
    }

    /// Offers a track.
    ///
    /// Returns the track that did not make it: the evicted worst entry, the
    /// offered track itself if it was not good enough, or `None` if the set
    /// simply grew.
    pub fn push(&mut self, track: Track) -> Option<Track> {
        let chi2 = track.chi2ndf();
        if !self.would_accept(chi2) {
            return Some(track);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let pos = self.entries.partition_point(|e| e.chi2 <= chi2);
        self.entries.insert(
            pos,
            Entry {
                chi2,
                sequence,
                track,
            },
        );

        if self.entries.len() > self.capacity {
            self.entries.pop().map(|e| e.track)
        } else {
            None
        }
    }

    /// Retained tracks, best first.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter().map(|e| &e.track)
    }

    /// Insertion sequence numbers of the retained tracks, best first.
    pub(crate) fn sequences(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.sequence)
    }

    /// Drops every track.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 0;
    }
}
