//! Possibly infinite integer sets as unions of disjoint closed intervals.
//!
//! An [`IntegerSet`] is a canonical list of closed intervals over
//! ℤ ∪ {−∞, +∞}: sorted by lower endpoint, pairwise disjoint, and never
//! adjacent (adjacent intervals are merged). Every operation re-establishes
//! the canonical form, so structural equality coincides with set equality.
//!
//! # Citations
//! - Interval arithmetic: Moore, "Interval Analysis" (1966)

use serde::{Deserialize, Serialize};
use std::fmt;

/// An interval endpoint over ℤ ∪ {−∞, +∞}.
///
/// The derived order relies on the variant order:
/// `NegInf < Finite(_) < PosInf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// −∞ (only meaningful as a lower endpoint).
    NegInf,
    /// A concrete integer.
    Finite(i64),
    /// +∞ (only meaningful as an upper endpoint).
    PosInf,
}

impl Endpoint {
    /// The next integer up, saturating into `PosInf` at the top of `i64`.
    fn succ(self) -> Endpoint {
        match self {
            Endpoint::Finite(i) => match i.checked_add(1) {
                Some(next) => Endpoint::Finite(next),
                None => Endpoint::PosInf,
            },
            other => other,
        }
    }

    /// The next integer down, saturating into `NegInf` at the bottom of `i64`.
    fn pred(self) -> Endpoint {
        match self {
            Endpoint::Finite(i) => match i.checked_sub(1) {
                Some(prev) => Endpoint::Finite(prev),
                None => Endpoint::NegInf,
            },
            other => other,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::NegInf => write!(f, "-inf"),
            Endpoint::Finite(i) => write!(f, "{}", i),
            Endpoint::PosInf => write!(f, "inf"),
        }
    }
}

/// A set of integers represented by disjoint closed intervals.
///
/// # Invariants
/// - Intervals satisfy `lo <= hi`, with `lo != PosInf` and `hi != NegInf`.
/// - Intervals are sorted by `lo` and separated by at least one missing
///   integer (no overlap, no adjacency).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntegerSet {
    intervals: Vec<(Endpoint, Endpoint)>,
}

impl IntegerSet {
    /// Creates the empty integer set.
    #[inline]
    pub fn empty() -> Self {
        Self { intervals: Vec::new() }
    }

    /// Creates the full set ℤ.
    #[inline]
    pub fn all() -> Self {
        Self {
            intervals: vec![(Endpoint::NegInf, Endpoint::PosInf)],
        }
    }

    /// Builds a set from arbitrary (possibly overlapping, unsorted) intervals.
    ///
    /// Intervals with `lo > hi` denote no integers and are dropped.
    pub fn from_intervals(intervals: impl IntoIterator<Item = (Endpoint, Endpoint)>) -> Self {
        let mut set = Self {
            intervals: intervals.into_iter().collect(),
        };
        set.normalize();
        set
    }

    /// Builds a set from individual integers.
    pub fn from_ints(values: impl IntoIterator<Item = i64>) -> Self {
        Self::from_intervals(
            values
                .into_iter()
                .map(|i| (Endpoint::Finite(i), Endpoint::Finite(i))),
        )
    }

    /// Returns the canonical interval list.
    #[inline]
    pub fn intervals(&self) -> &[(Endpoint, Endpoint)] {
        &self.intervals
    }

    /// Whether no integer is in the set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether the set is all of ℤ.
    #[inline]
    pub fn is_all(&self) -> bool {
        self.intervals == [(Endpoint::NegInf, Endpoint::PosInf)]
    }

    /// Membership test.
    pub fn contains(&self, value: i64) -> bool {
        let v = Endpoint::Finite(value);
        self.intervals.iter().any(|&(lo, hi)| lo <= v && v <= hi)
    }

    /// Whether the set is finite, i.e. every interval is bounded.
    pub fn is_finite(&self) -> bool {
        self.intervals
            .iter()
            .all(|&(lo, hi)| matches!(lo, Endpoint::Finite(_)) && matches!(hi, Endpoint::Finite(_)))
    }

    /// Enumerates the members of a finite set in ascending order.
    ///
    /// Returns `None` when the set is unbounded.
    pub fn iter_finite(&self) -> Option<Vec<i64>> {
        if !self.is_finite() {
            return None;
        }
        let mut out = Vec::new();
        for &(lo, hi) in &self.intervals {
            if let (Endpoint::Finite(a), Endpoint::Finite(b)) = (lo, hi) {
                for i in a..=b {
                    out.push(i);
                }
            }
        }
        Some(out)
    }

    /// Restores the canonical form: sorted, disjoint, non-adjacent.
    fn normalize(&mut self) {
        self.intervals.retain(|&(lo, hi)| {
            lo <= hi && lo != Endpoint::PosInf && hi != Endpoint::NegInf
        });
        self.intervals.sort();
        let mut merged: Vec<(Endpoint, Endpoint)> = Vec::with_capacity(self.intervals.len());
        for &(lo, hi) in &self.intervals {
            match merged.last_mut() {
                Some(last) if lo <= last.1.succ() => {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                }
                _ => merged.push((lo, hi)),
            }
        }
        self.intervals = merged;
    }

    /// Set union.
    pub fn union(&self, other: &IntegerSet) -> IntegerSet {
        IntegerSet::from_intervals(
            self.intervals
                .iter()
                .chain(other.intervals.iter())
                .copied(),
        )
    }

    /// Set intersection.
    pub fn intersection(&self, other: &IntegerSet) -> IntegerSet {
        let mut out = Vec::new();
        for &(lo1, hi1) in &self.intervals {
            for &(lo2, hi2) in &other.intervals {
                let lo = lo1.max(lo2);
                let hi = hi1.min(hi2);
                if lo <= hi {
                    out.push((lo, hi));
                }
            }
        }
        IntegerSet::from_intervals(out)
    }

    /// Complement over ℤ.
    pub fn complement(&self) -> IntegerSet {
        let mut gaps = Vec::new();
        let mut cursor = Endpoint::NegInf;
        for &(lo, hi) in &self.intervals {
            if lo != Endpoint::NegInf {
                let gap_hi = lo.pred();
                if cursor <= gap_hi {
                    gaps.push((cursor, gap_hi));
                }
            }
            cursor = hi.succ();
            if hi == Endpoint::PosInf {
                return IntegerSet::from_intervals(gaps);
            }
        }
        gaps.push((cursor, Endpoint::PosInf));
        IntegerSet::from_intervals(gaps)
    }

    /// Set difference `self ∖ other`.
    pub fn difference(&self, other: &IntegerSet) -> IntegerSet {
        self.intersection(&other.complement())
    }

    /// Interval-cover subset test.
    ///
    /// Because both sides are canonical, an interval of `self` is covered by
    /// `other` exactly when it fits inside a single interval of `other`.
    pub fn is_subset(&self, other: &IntegerSet) -> bool {
        self.intervals.iter().all(|&(lo, hi)| {
            other
                .intervals
                .iter()
                .any(|&(olo, ohi)| olo <= lo && hi <= ohi)
        })
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "{{}}");
        }
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|(lo, hi)| format!("[{}, {}]", lo, hi))
            .collect();
        write!(f, "{}", parts.join(" ∪ "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fin(lo: i64, hi: i64) -> (Endpoint, Endpoint) {
        (Endpoint::Finite(lo), Endpoint::Finite(hi))
    }

    #[test]
    fn normalization_merges_overlap_and_adjacency() {
        let set = IntegerSet::from_intervals([fin(5, 9), fin(1, 3), fin(4, 4)]);
        assert_eq!(set.intervals(), &[fin(1, 9)]);
    }

    #[test]
    fn empty_intervals_dropped() {
        let set = IntegerSet::from_intervals([fin(3, 1), (Endpoint::PosInf, Endpoint::PosInf)]);
        assert!(set.is_empty());
    }

    #[test]
    fn union_and_contains() {
        let a = IntegerSet::from_intervals([fin(0, 5)]);
        let b = IntegerSet::from_intervals([fin(10, 12)]);
        let u = a.union(&b);
        assert!(u.contains(0));
        assert!(u.contains(11));
        assert!(!u.contains(7));
        assert_eq!(u.intervals().len(), 2);
    }

    #[test]
    fn intersection_clips() {
        let a = IntegerSet::from_intervals([(Endpoint::NegInf, Endpoint::Finite(10))]);
        let b = IntegerSet::from_intervals([fin(5, 20)]);
        assert_eq!(a.intersection(&b).intervals(), &[fin(5, 10)]);
    }

    #[test]
    fn complement_round_trip() {
        let a = IntegerSet::from_intervals([fin(0, 10), fin(20, 30)]);
        let c = a.complement();
        assert!(!c.contains(5));
        assert!(c.contains(15));
        assert!(c.contains(-100));
        assert_eq!(c.complement(), a);
    }

    #[test]
    fn complement_of_all_is_empty() {
        assert!(IntegerSet::all().complement().is_empty());
        assert!(IntegerSet::empty().complement().is_all());
    }

    #[test]
    fn difference_removes() {
        let a = IntegerSet::from_intervals([fin(0, 10)]);
        let b = IntegerSet::from_intervals([fin(4, 6)]);
        let d = a.difference(&b);
        assert_eq!(d.intervals(), &[fin(0, 3), fin(7, 10)]);
    }

    #[test]
    fn subset_by_cover() {
        let small = IntegerSet::from_intervals([fin(2, 3), fin(8, 9)]);
        let big = IntegerSet::from_intervals([fin(0, 5), fin(7, 12)]);
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
        let split = IntegerSet::from_intervals([fin(0, 2), fin(4, 9)]);
        let spanning = IntegerSet::from_intervals([fin(1, 5)]);
        assert!(!spanning.is_subset(&split));
    }

    #[test]
    fn finite_enumeration() {
        let a = IntegerSet::from_intervals([fin(1, 3), fin(7, 7)]);
        assert_eq!(a.iter_finite(), Some(vec![1, 2, 3, 7]));
        assert_eq!(IntegerSet::all().iter_finite(), None);
    }

    #[test]
    fn saturation_at_i64_bounds() {
        let a = IntegerSet::from_ints([i64::MAX]);
        assert!(a.contains(i64::MAX));
        let c = a.complement();
        assert!(!c.contains(i64::MAX));
        assert!(c.contains(i64::MAX - 1));
    }
}
