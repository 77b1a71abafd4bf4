//! Structure of Arrays (`SoA`) track output.
//!
//! `TrackBatch` flattens a list of tracks into parallel columns: one row per
//! track in the track columns, one row per hit in the hit columns. Hit rows
//! point back to their track through `hit_track_index`. This is the layout
//! downstream histogramming and persistence code consumes.

use crate::track::Track;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tracks stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackBatch {
    /// Track x at z = 0.
    pub x0: Vec<f64>,
    /// Track y at z = 0.
    pub y0: Vec<f64>,
    /// Track x-z slope.
    pub xp: Vec<f64>,
    /// Track y-z slope.
    pub yp: Vec<f64>,
    /// Track chi2/ndf.
    pub chi2ndf: Vec<f64>,
    /// Number of hits per track.
    pub nhits: Vec<u32>,
    /// Hit x positions, all tracks concatenated.
    pub hit_x: Vec<f64>,
    /// Hit y positions.
    pub hit_y: Vec<f64>,
    /// Hit z positions.
    pub hit_z: Vec<f64>,
    /// Row of the owning track in the track columns.
    pub hit_track_index: Vec<u32>,
    /// Module id of each hit.
    pub hit_module: Vec<i32>,
}

impl TrackBatch {
    /// Creates an empty batch with capacity for `tracks` tracks of
    /// `hits_per_track` hits.
    #[must_use]
    pub fn with_capacity(tracks: usize, hits_per_track: usize) -> Self {
        let hits = tracks * hits_per_track;
        Self {
            x0: Vec::with_capacity(tracks),
            y0: Vec::with_capacity(tracks),
            xp: Vec::with_capacity(tracks),
            yp: Vec::with_capacity(tracks),
            chi2ndf: Vec::with_capacity(tracks),
            nhits: Vec::with_capacity(tracks),
            hit_x: Vec::with_capacity(hits),
            hit_y: Vec::with_capacity(hits),
            hit_z: Vec::with_capacity(hits),
            hit_track_index: Vec::with_capacity(hits),
            hit_module: Vec::with_capacity(hits),
        }
    }

    /// Flattens tracks in the given order.
    #[must_use]
    pub fn from_tracks<'a, I>(tracks: I) -> Self
    where
        I: IntoIterator<Item = &'a Track>,
    {
        let mut batch = Self::default();
        for track in tracks {
            batch.push(track);
        }
        batch
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x0.len()
    }

    /// Returns true if the batch holds no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x0.is_empty()
    }

    /// Total number of hit rows.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.hit_x.len()
    }

    /// Clears all columns.
    pub fn clear(&mut self) {
        self.x0.clear();
        self.y0.clear();
        self.xp.clear();
        self.yp.clear();
        self.chi2ndf.clear();
        self.nhits.clear();
        self.hit_x.clear();
        self.hit_y.clear();
        self.hit_z.clear();
        self.hit_track_index.clear();
        self.hit_module.clear();
    }

    /// Appends one track and its hits.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, track: &Track) {
        let track_index = self.len() as u32;
        let p = &track.params;
        self.x0.push(p.x0);
        self.y0.push(p.y0);
        self.xp.push(p.xp);
        self.yp.push(p.yp);
        self.chi2ndf.push(p.chi2ndf);
        self.nhits.push(track.points.len() as u32);

        for point in &track.points {
            self.hit_x.push(point.x);
            self.hit_y.push(point.y);
            self.hit_z.push(point.z);
            self.hit_track_index.push(track_index);
            self.hit_module.push(point.module_id);
        }
    }

    /// Appends all tracks of another batch, re-basing its track indices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: &TrackBatch) {
        let base = self.len() as u32;
        self.x0.extend_from_slice(&other.x0);
        self.y0.extend_from_slice(&other.y0);
        self.xp.extend_from_slice(&other.xp);
        self.yp.extend_from_slice(&other.yp);
        self.chi2ndf.extend_from_slice(&other.chi2ndf);
        self.nhits.extend_from_slice(&other.nhits);
        self.hit_x.extend_from_slice(&other.hit_x);
        self.hit_y.extend_from_slice(&other.hit_y);
        self.hit_z.extend_from_slice(&other.hit_z);
        self.hit_track_index
            .extend(other.hit_track_index.iter().map(|i| i + base));
        self.hit_module.extend_from_slice(&other.hit_module);
    }

    /// Hit rows belonging to track `index` as a range into the hit columns.
    #[must_use]
    pub fn hit_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        if index >= self.len() {
            return None;
        }
        let start: usize = self.nhits[..index].iter().map(|&n| n as usize).sum();
        Some(start..start + self.nhits[index] as usize)
    }
}
