//! Layer-subset enumeration and index-tuple iteration.

use std::collections::BTreeMap;

/// All size-`k` subsets of `items`, each preserving the input order, listed
/// in lexicographic order of positions.
///
/// `k == 0` yields one empty subset; `k > items.len()` yields none.
#[must_use]
pub fn combinations<T: Copy>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| items[i]).collect());

        // Rightmost position that can still advance.
        let Some(pos) = (0..k).rev().find(|&p| idx[p] < n - k + p) else {
            break;
        };
        idx[pos] += 1;
        for p in pos + 1..k {
            idx[p] = idx[p - 1] + 1;
        }
    }
    out
}

/// Calls `f` with every tuple `t` where `t[i] < lens[i]`, last position
/// varying fastest.
///
/// Nothing is emitted when any length is zero. An empty `lens` emits one
/// empty tuple.
pub fn for_each_index_tuple<F>(lens: &[usize], mut f: F)
where
    F: FnMut(&[usize]),
{
    if lens.contains(&0) {
        return;
    }

    let mut tuple = vec![0usize; lens.len()];
    loop {
        f(&tuple);

        let mut pos = lens.len();
        loop {
            if pos == 0 {
                return;
            }
            pos -= 1;
            tuple[pos] += 1;
            if tuple[pos] < lens[pos] {
                break;
            }
            tuple[pos] = 0;
        }
    }
}

/// Product of `counts`, saturating at `u64::MAX`.
#[must_use]
pub fn saturating_product<I>(counts: I) -> u64
where
    I: IntoIterator<Item = usize>,
{
    counts.into_iter().fold(1u64, |acc, c| {
        acc.saturating_mul(u64::try_from(c).unwrap_or(u64::MAX))
    })
}

/// Layer subsets grouped by size, precomputed once per detector setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerGroups {
    groups: BTreeMap<usize, Vec<Vec<i32>>>,
}

impl LayerGroups {
    /// Builds every subset of `layer_ids` with at least `minimum_size`
    /// members.
    #[must_use]
    pub fn build(layer_ids: &[i32], minimum_size: usize) -> Self {
        let groups = (minimum_size.max(1)..=layer_ids.len())
            .map(|k| (k, combinations(layer_ids, k)))
            .collect();
        Self { groups }
    }

    /// Subsets with exactly `size` layers.
    #[must_use]
    pub fn get(&self, size: usize) -> &[Vec<i32>] {
        self.groups.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Subset sizes from largest to smallest.
    pub fn sizes_descending(&self) -> impl Iterator<Item = usize> + '_ {
        self.groups.keys().rev().copied()
    }

    /// Number of subsets across all sizes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns true if no subset qualifies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
