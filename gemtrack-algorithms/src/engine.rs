//! Combinatorial track finding over a detector's tracking layers.
//!
//! Layer subsets are searched from the largest size down. For each subset
//! the first and last layers are the boundary layers: every pair of their
//! hits defines a straight line, and each middle layer contributes only the
//! hits its spatial grid reports near that line's crossing point. Every
//! resulting combination is fitted; accepted candidates compete for a
//! bounded list of the lowest chi2/ndf tracks. The search stops after the
//! first subset size that yields an accepted track, so tracks using more
//! layers are always preferred.

use std::collections::{BTreeMap, HashMap};

use gemtrack_core::config::{SearchStrategy, TrackingCuts};
use gemtrack_core::error::{ConfigError, Error, Result};
use gemtrack_core::point::Point;
use gemtrack_core::soa::TrackBatch;
use gemtrack_core::track::{HitRef, Track, TrackParameters};
use log::{debug, trace};

use crate::combination::{for_each_index_tuple, saturating_product, LayerGroups};
use crate::detector::Detector;
use crate::fit::{intersection_point, LineFitter};
use crate::layer::Layer;
use crate::topk::TopKTracks;

/// Counters collected during one event's search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    /// Layer subsets searched.
    pub groups_examined: u64,
    /// Layer subsets skipped by the abort guard.
    pub groups_aborted: u64,
    /// Boundary hit pairs searched.
    pub pairs_examined: u64,
    /// Boundary hit pairs skipped by the abort guard.
    pub pairs_aborted: u64,
    /// Boundary hit pairs whose line never crosses a middle layer.
    pub pairs_parallel: u64,
    /// Hit combinations fitted.
    pub combinations_examined: u64,
    /// Fits rejected as degenerate.
    pub degenerate_fits: u64,
    /// Fits outside a slope window.
    pub rejected_slope: u64,
    /// Fits above the chi2/ndf cut.
    pub rejected_chi2: u64,
    /// Fits passing every cut.
    pub accepted: u64,
}

impl SearchStatistics {
    /// Resets every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Adds another event's counters to these.
    pub fn merge(&mut self, other: &Self) {
        self.groups_examined += other.groups_examined;
        self.groups_aborted += other.groups_aborted;
        self.pairs_examined += other.pairs_examined;
        self.pairs_aborted += other.pairs_aborted;
        self.pairs_parallel += other.pairs_parallel;
        self.combinations_examined += other.combinations_examined;
        self.degenerate_fits += other.degenerate_fits;
        self.rejected_slope += other.rejected_slope;
        self.rejected_chi2 += other.rejected_chi2;
        self.accepted += other.accepted;
    }
}

/// Finds straight tracks in the hits currently loaded on a [`Detector`].
///
/// Usage per detector setup:
/// 1. [`TrackFinder::new`] with the cuts,
/// 2. [`TrackFinder::complete_setup`] once the layers are registered,
/// 3. per event, [`TrackFinder::find_tracks`] and the result accessors.
#[derive(Debug, Clone)]
pub struct TrackFinder {
    cuts: TrackingCuts,
    fitter: LineFitter,
    layer_ids: Vec<i32>,
    layer_groups: LayerGroups,
    setup_complete: bool,
    best: Option<Track>,
    best_chi2_by_nhits: BTreeMap<usize, f64>,
    candidates: TopKTracks,
    good_candidates: usize,
    stats: SearchStatistics,
}

impl TrackFinder {
    /// Creates a finder with the given cuts.
    ///
    /// # Errors
    /// Returns an error if the cuts are inconsistent.
    pub fn new(cuts: TrackingCuts) -> std::result::Result<Self, ConfigError> {
        cuts.validate()?;
        Ok(Self {
            cuts,
            fitter: LineFitter::new(cuts.resolution_x, cuts.resolution_y),
            layer_ids: Vec::new(),
            layer_groups: LayerGroups::default(),
            setup_complete: false,
            best: None,
            best_chi2_by_nhits: BTreeMap::new(),
            candidates: TopKTracks::new(cuts.max_track_save_quantity),
            good_candidates: 0,
            stats: SearchStatistics::default(),
        })
    }

    /// Captures the detector's tracking layers and precomputes the layer
    /// subsets to search.
    ///
    /// # Errors
    /// [`ConfigError::TooFewLayers`] if fewer tracking layers exist than
    /// hits required per track.
    pub fn complete_setup(&mut self, detector: &Detector) -> std::result::Result<(), ConfigError> {
        let ids = detector.tracking_layer_ids();
        let required = self.cuts.minimum_hits_on_track;
        if ids.len() < required {
            return Err(ConfigError::TooFewLayers {
                layers: ids.len(),
                required,
            });
        }

        self.layer_groups = LayerGroups::build(&ids, required);
        debug!(
            "Tracking setup complete: layers {:?}, {} layer groups, strategy {:?}",
            ids,
            self.layer_groups.total(),
            self.cuts.strategy
        );
        self.layer_ids = ids;
        self.setup_complete = true;
        self.clear_previous_event();
        Ok(())
    }

    /// Forgets the previous event's results and counters.
    pub fn clear_previous_event(&mut self) {
        self.best = None;
        self.best_chi2_by_nhits.clear();
        self.candidates.clear();
        self.good_candidates = 0;
        self.stats.clear();
    }

    /// Searches the detector's current hits.
    ///
    /// Previous results are cleared first. Returns the best track's
    /// parameters, or `None` when nothing passes the cuts.
    ///
    /// # Errors
    /// [`ConfigError::SetupIncomplete`] before [`TrackFinder::complete_setup`],
    /// [`ConfigError::UnknownLayer`] if a layer captured at setup is gone.
    pub fn find_tracks(&mut self, detector: &Detector) -> Result<Option<TrackParameters>> {
        if !self.setup_complete {
            return Err(ConfigError::SetupIncomplete.into());
        }
        self.clear_previous_event();

        let mut layers: HashMap<i32, &Layer> = HashMap::with_capacity(self.layer_ids.len());
        for &id in &self.layer_ids {
            let layer = detector
                .layer(id)
                .ok_or(Error::Config(ConfigError::UnknownLayer(id)))?;
            layers.insert(id, layer);
        }

        let groups = std::mem::take(&mut self.layer_groups);
        let mut subset: Vec<&Layer> = Vec::with_capacity(self.layer_ids.len());

        for nlayers in groups.sizes_descending() {
            for group in groups.get(nlayers) {
                subset.clear();
                subset.extend(group.iter().filter_map(|id| layers.get(id).copied()));

                match self.cuts.strategy {
                    SearchStrategy::Grid => self.search_group_grid(&subset),
                    SearchStrategy::Exhaustive => self.search_group_exhaustive(&subset),
                }
            }

            if self.best_chi2_by_nhits.contains_key(&nlayers) {
                trace!("Accepted a {nlayers}-layer track, skipping smaller subsets");
                break;
            }
        }
        self.layer_groups = groups;

        trace!("Search finished: {:?}", self.stats);
        Ok(self.best_track())
    }

    fn search_group_grid(&mut self, subset: &[&Layer]) {
        let [start, middles @ .., end] = subset else {
            return;
        };

        let boundary = saturating_product([start.hit_count(), end.hit_count()]);
        if boundary > self.cuts.abort_quantity {
            self.stats.groups_aborted += 1;
            trace!(
                "Skipping layers {} -> {}: {boundary} boundary pairs exceed abort quantity",
                start.id(),
                end.id()
            );
            return;
        }
        self.stats.groups_examined += 1;

        let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); middles.len()];
        let mut lens: Vec<usize> = Vec::with_capacity(middles.len());
        let mut combo: Vec<HitRef> = Vec::with_capacity(subset.len());

        for (si, s) in start.hits().iter().enumerate() {
            'pairs: for (ei, e) in end.hits().iter().enumerate() {
                self.stats.pairs_examined += 1;

                for (middle, found) in middles.iter().zip(candidates.iter_mut()) {
                    found.clear();
                    let Ok(crossing) = intersection_point(s, e, middle.z()) else {
                        self.stats.pairs_parallel += 1;
                        continue 'pairs;
                    };
                    middle.candidate_hits(crossing.x, crossing.y, found);
                }

                lens.clear();
                lens.extend(candidates.iter().map(Vec::len));
                let product = boundary.saturating_mul(saturating_product(lens.iter().copied()));
                if product > self.cuts.abort_quantity {
                    self.stats.pairs_aborted += 1;
                    trace!("Skipping hit pair ({si}, {ei}): {product} combinations");
                    continue;
                }

                for_each_index_tuple(&lens, |tuple| {
                    combo.clear();
                    combo.push(HitRef::new(start.id(), si));
                    for ((middle, found), &pick) in middles.iter().zip(&candidates).zip(tuple) {
                        combo.push(HitRef::new(middle.id(), found[pick]));
                    }
                    combo.push(HitRef::new(end.id(), ei));
                    self.evaluate(&combo, subset);
                });
            }
        }
    }

    fn search_group_exhaustive(&mut self, subset: &[&Layer]) {
        let lens: Vec<usize> = subset.iter().map(|l| l.hit_count()).collect();
        let product = saturating_product(lens.iter().copied());
        if product > self.cuts.abort_quantity {
            self.stats.groups_aborted += 1;
            trace!("Skipping layer group: {product} combinations exceed abort quantity");
            return;
        }
        self.stats.groups_examined += 1;

        let mut combo: Vec<HitRef> = Vec::with_capacity(subset.len());
        for_each_index_tuple(&lens, |tuple| {
            combo.clear();
            combo.extend(
                subset
                    .iter()
                    .zip(tuple)
                    .map(|(layer, &index)| HitRef::new(layer.id(), index)),
            );
            self.evaluate(&combo, subset);
        });
    }

    /// Fits one combination; `hits[i]` lies on `subset[i]`.
    fn evaluate(&mut self, hits: &[HitRef], subset: &[&Layer]) {
        self.stats.combinations_examined += 1;

        let points: Vec<Point> = hits
            .iter()
            .zip(subset)
            .filter_map(|(hit, layer)| layer.hit(hit.hit_index).copied())
            .collect();

        let fit = match self.fitter.fit(&points) {
            Ok(fit) => fit,
            Err(_) => {
                self.stats.degenerate_fits += 1;
                return;
            }
        };

        let params = fit.params;
        if !self.cuts.accepts_slopes(params.xp, params.yp) {
            self.stats.rejected_slope += 1;
            return;
        }
        // NaN chi2 fails this check too.
        if !(params.chi2ndf <= self.cuts.chi2_cut) {
            self.stats.rejected_chi2 += 1;
            return;
        }

        self.stats.accepted += 1;
        self.good_candidates += 1;

        let best_for_size = self
            .best_chi2_by_nhits
            .entry(hits.len())
            .or_insert(f64::INFINITY);
        if params.chi2ndf < *best_for_size {
            *best_for_size = params.chi2ndf;
        }

        let is_best = self
            .best
            .as_ref()
            .map_or(true, |best| params.chi2ndf < best.chi2ndf());
        if !is_best && !self.candidates.would_accept(params.chi2ndf) {
            return;
        }

        let track = Track {
            params,
            hits: hits.to_vec(),
            points,
            residuals_x: fit.residuals_x,
            residuals_y: fit.residuals_y,
        };
        if is_best {
            self.best = Some(track.clone());
        }
        self.candidates.push(track);
    }

    /// Parameters of the best track of the last search.
    #[must_use]
    pub fn best_track(&self) -> Option<TrackParameters> {
        self.best.as_ref().map(|t| t.params)
    }

    /// Best track with its hits and residuals.
    #[must_use]
    pub fn best(&self) -> Option<&Track> {
        self.best.as_ref()
    }

    /// Hits on the best track, zero when there is none.
    #[must_use]
    pub fn nhits_on_best_track(&self) -> usize {
        self.best.as_ref().map_or(0, Track::nhits)
    }

    /// Lowest chi2/ndf accepted for each track size.
    #[must_use]
    pub fn best_chi2_by_nhits(&self) -> &BTreeMap<usize, f64> {
        &self.best_chi2_by_nhits
    }

    /// Retained candidates, best first.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.candidates.iter()
    }

    /// Retained candidates flattened into columns, best first.
    #[must_use]
    pub fn track_batch(&self) -> TrackBatch {
        TrackBatch::from_tracks(self.candidates.iter())
    }

    /// Number of combinations that passed every cut, retained or not.
    #[must_use]
    pub fn good_candidate_count(&self) -> usize {
        self.good_candidates
    }

    /// Counters from the last search.
    #[must_use]
    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    /// Layer subsets searched, grouped by size.
    #[must_use]
    pub fn layer_groups(&self) -> &LayerGroups {
        &self.layer_groups
    }

    /// Tracking layer ids captured at setup.
    #[must_use]
    pub fn layer_ids(&self) -> &[i32] {
        &self.layer_ids
    }

    /// Acceptance cuts.
    #[must_use]
    pub fn cuts(&self) -> &TrackingCuts {
        &self.cuts
    }

    /// Returns true once [`TrackFinder::complete_setup`] has succeeded.
    #[must_use]
    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gemtrack_core::config::{GridConfig, SlopeWindow};
    use gemtrack_core::geometry::LayerPlacement;

    const Z: [f64; 4] = [0.0, 100.0, 1020.0, 1120.0];

    fn detector(zs: &[f64]) -> Detector {
        let mut detector = Detector::new();
        for (id, &z) in (0..).zip(zs) {
            let layer = Layer::new(
                id,
                LayerPlacement::at_z(z, 400.0, 400.0),
                GridConfig::default(),
            )
            .unwrap();
            detector.add_layer(layer).unwrap();
        }
        detector
    }

    fn on_line(layer: i32, z: f64) -> Point {
        Point::new(5.0 + 0.01 * z, -3.0 - 0.02 * z, z).with_layer(layer)
    }

    fn finder(cuts: TrackingCuts, detector: &Detector) -> TrackFinder {
        let mut finder = TrackFinder::new(cuts).unwrap();
        finder.complete_setup(detector).unwrap();
        finder
    }

    #[test]
    fn test_setup_required() {
        let detector = detector(&Z);
        let mut finder = TrackFinder::new(TrackingCuts::default()).unwrap();
        assert!(matches!(
            finder.find_tracks(&detector),
            Err(Error::Config(ConfigError::SetupIncomplete))
        ));
    }

    #[test]
    fn test_too_few_layers() {
        let detector = detector(&Z[..2]);
        let mut finder = TrackFinder::new(TrackingCuts::default()).unwrap();
        assert_eq!(
            finder.complete_setup(&detector),
            Err(ConfigError::TooFewLayers {
                layers: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_single_track() {
        let mut detector = detector(&Z);
        for (id, &z) in (0..).zip(&Z) {
            detector.add_hit(on_line(id, z));
        }
        let mut finder = finder(TrackingCuts::default(), &detector);

        let best = finder.find_tracks(&detector).unwrap().unwrap();
        assert_relative_eq!(best.x0, 5.0, epsilon = 1e-9);
        assert_relative_eq!(best.y0, -3.0, epsilon = 1e-9);
        assert_relative_eq!(best.xp, 0.01, epsilon = 1e-12);
        assert_relative_eq!(best.yp, -0.02, epsilon = 1e-12);
        assert!(best.chi2ndf < 1e-9);

        assert_eq!(finder.nhits_on_best_track(), 4);
        assert_eq!(
            finder.best().unwrap().hits,
            vec![
                HitRef::new(0, 0),
                HitRef::new(1, 0),
                HitRef::new(2, 0),
                HitRef::new(3, 0)
            ]
        );
        // Greedy stop: the 3-layer subsets are never searched.
        assert_eq!(finder.statistics().groups_examined, 1);
        assert_eq!(finder.good_candidate_count(), 1);
        assert_eq!(finder.track_batch().len(), 1);
    }

    #[test]
    fn test_no_hits_no_track() {
        let detector = detector(&Z);
        let mut finder = finder(TrackingCuts::default(), &detector);
        assert_eq!(finder.find_tracks(&detector).unwrap(), None);
        assert_eq!(finder.nhits_on_best_track(), 0);
        assert_eq!(finder.statistics().combinations_examined, 0);
    }

    #[test]
    fn test_falls_back_to_fewer_layers() {
        let mut detector = detector(&Z);
        // Layer 2 misses the track entirely.
        detector.add_hit(on_line(0, Z[0]));
        detector.add_hit(on_line(1, Z[1]));
        detector.add_hit(on_line(3, Z[3]));

        let mut finder = finder(TrackingCuts::default(), &detector);
        let best = finder.find_tracks(&detector).unwrap();
        assert!(best.is_some());
        assert_eq!(finder.nhits_on_best_track(), 3);
        assert_eq!(
            finder.best().unwrap().layer_ids().collect::<Vec<_>>(),
            vec![0, 1, 3]
        );
    }

    #[test]
    fn test_slope_window_rejects() {
        let mut detector = detector(&Z);
        for (id, &z) in (0..).zip(&Z) {
            detector.add_hit(on_line(id, z));
        }
        let cuts = TrackingCuts::default()
            .with_slope_windows(SlopeWindow::symmetric(0.005), SlopeWindow::unbounded());
        let mut finder = finder(cuts, &detector);

        assert_eq!(finder.find_tracks(&detector).unwrap(), None);
        assert!(finder.statistics().rejected_slope > 0);
        assert_eq!(finder.statistics().accepted, 0);
    }

    #[test]
    fn test_abort_guard_skips_group() {
        let mut detector = detector(&Z[..3]);
        for i in 0..4 {
            let x = f64::from(i) * 30.0;
            detector.add_hit(Point::new(x, 0.0, 0.0).with_layer(0));
            detector.add_hit(Point::new(x, 0.0, 100.0).with_layer(1));
            detector.add_hit(Point::new(x, 0.0, 1020.0).with_layer(2));
        }

        let cuts = TrackingCuts::default().with_abort_quantity(15);
        let mut finder = finder(cuts, &detector);
        assert_eq!(finder.find_tracks(&detector).unwrap(), None);

        let stats = finder.statistics();
        assert_eq!(stats.combinations_examined, 0);
        assert_eq!(stats.groups_aborted, 1);
    }

    #[test]
    fn test_abort_guard_skips_pair() {
        // Everything sits in the middle of one grid cell, so each boundary
        // pair picks up all ten middle hits.
        let mut detector = detector(&Z[..3]);
        for dx in [0.0, 0.2] {
            detector.add_hit(Point::new(-2.6 + dx, -2.6, Z[0]).with_layer(0));
            detector.add_hit(Point::new(-2.6 + dx, -2.6, Z[2]).with_layer(2));
        }
        for i in 0..10 {
            let x = -2.6 + 0.05 * f64::from(i);
            detector.add_hit(Point::new(x, -2.6, Z[1]).with_layer(1));
        }

        // 2 * 2 boundary pairs pass, 2 * 2 * 10 combinations do not.
        let cuts = TrackingCuts::default().with_abort_quantity(20);
        let mut guarded = finder(cuts, &detector);
        assert_eq!(guarded.find_tracks(&detector).unwrap(), None);
        let stats = guarded.statistics();
        assert_eq!(stats.groups_examined, 1);
        assert_eq!(stats.groups_aborted, 0);
        assert_eq!(stats.pairs_examined, 4);
        assert_eq!(stats.pairs_aborted, 4);
        assert_eq!(stats.combinations_examined, 0);

        let cuts = TrackingCuts::default().with_abort_quantity(40);
        let mut open = finder(cuts, &detector);
        assert!(open.find_tracks(&detector).unwrap().is_some());
        assert_eq!(open.statistics().pairs_aborted, 0);
        assert_eq!(open.statistics().combinations_examined, 40);
    }

    #[test]
    fn test_parallel_pair_skipped() {
        let mut detector = detector(&[50.0, 50.0, 50.0]);
        detector.add_hit(Point::new(0.0, 0.0, 50.0).with_layer(0));
        detector.add_hit(Point::new(1.0, 0.0, 50.0).with_layer(1));
        detector.add_hit(Point::new(2.0, 0.0, 50.0).with_layer(2));

        let mut finder = finder(TrackingCuts::default(), &detector);
        assert_eq!(finder.find_tracks(&detector).unwrap(), None);

        let stats = finder.statistics();
        assert_eq!(stats.pairs_examined, 1);
        assert_eq!(stats.pairs_parallel, 1);
        assert_eq!(stats.combinations_examined, 0);
    }

    #[test]
    fn test_degenerate_combination_rejected() {
        let mut detector = detector(&[50.0, 50.0, 50.0]);
        detector.add_hit(Point::new(0.0, 0.0, 50.0).with_layer(0));
        detector.add_hit(Point::new(1.0, 0.0, 50.0).with_layer(1));
        detector.add_hit(Point::new(2.0, 0.0, 50.0).with_layer(2));

        let cuts = TrackingCuts::default().with_strategy(SearchStrategy::Exhaustive);
        let mut finder = finder(cuts, &detector);
        assert_eq!(finder.find_tracks(&detector).unwrap(), None);

        let stats = finder.statistics();
        assert_eq!(stats.combinations_examined, 1);
        assert_eq!(stats.degenerate_fits, 1);
        assert_eq!(stats.accepted, 0);
        assert_eq!(finder.tracks().count(), 0);
    }

    #[test]
    fn test_layer_groups_survive_searches() {
        let mut detector = detector(&Z);
        let mut finder = finder(TrackingCuts::default(), &detector);
        let groups = finder.layer_groups().clone();
        assert_eq!(groups.total(), 5);

        for _ in 0..2 {
            detector.reset();
            for (id, &z) in (0..).zip(&Z) {
                detector.add_hit(on_line(id, z));
            }
            assert!(finder.find_tracks(&detector).unwrap().is_some());
            assert_eq!(finder.layer_groups(), &groups);
        }
    }

    #[test]
    fn test_clear_previous_event() {
        let mut detector = detector(&Z);
        for (id, &z) in (0..).zip(&Z) {
            detector.add_hit(on_line(id, z));
        }
        let mut finder = finder(TrackingCuts::default(), &detector);
        finder.find_tracks(&detector).unwrap();
        assert!(finder.best().is_some());

        finder.clear_previous_event();
        assert!(finder.best().is_none());
        assert_eq!(finder.tracks().count(), 0);
        assert_eq!(*finder.statistics(), SearchStatistics::default());
    }

    #[test]
    fn test_exhaustive_matches_grid() {
        let mut detector = detector(&Z);
        for (id, &z) in (0..).zip(&Z) {
            detector.add_hit(on_line(id, z));
            detector.add_hit(Point::new(-150.0, 120.0, z).with_layer(id));
        }

        let mut grid = finder(TrackingCuts::default(), &detector);
        let mut exhaustive = finder(
            TrackingCuts::default().with_strategy(SearchStrategy::Exhaustive),
            &detector,
        );

        let a = grid.find_tracks(&detector).unwrap().unwrap();
        let b = exhaustive.find_tracks(&detector).unwrap().unwrap();
        assert_relative_eq!(a.x0, b.x0, epsilon = 1e-9);
        assert_relative_eq!(a.yp, b.yp, epsilon = 1e-12);
        assert!(
            exhaustive.statistics().combinations_examined
                >= grid.statistics().combinations_examined
        );
    }
}
