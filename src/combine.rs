//! Dempster-Shafer combination over the exemplar frame of discernment.
//!
//! The frame is the set of exemplars of a [`ReferenceTable`](crate::reference::ReferenceTable).
//! Each feature with defined evidence `e` and hit list `H` becomes the simple
//! mass function `m(H) = e, m(frame) = 1 - e`. Mass functions are combined
//! with Dempster's rule, renormalizing away the conflicting mass.

use std::collections::BTreeMap;

use crate::error::{ClassifierError, Result};
use crate::hits::HitList;

/// Mass left below this after removing conflict counts as total conflict.
const CONFLICT_EPSILON: f64 = 1e-12;

/// A subset of the frame, one flag per exemplar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocalSet(Vec<bool>);

impl FocalSet {
    /// The whole frame.
    pub fn full(frame: usize) -> Self {
        Self(vec![true; frame])
    }

    pub fn from_hits(hits: &HitList) -> Self {
        Self(hits.as_bools().to_vec())
    }

    pub fn intersect(&self, other: &FocalSet) -> FocalSet {
        Self(self.0.iter().zip(&other.0).map(|(&a, &b)| a && b).collect())
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// True when no exemplar is a member.
    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&m| m)
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|&m| m)
    }

    /// Whether the set is exactly `{index}`.
    pub fn is_singleton(&self, index: usize) -> bool {
        self.contains(index) && self.0.iter().filter(|&&m| m).count() == 1
    }
}

/// Basic probability assignment over a frame of `frame` exemplars.
#[derive(Debug, Clone, PartialEq)]
pub struct MassFunction {
    frame: usize,
    masses: BTreeMap<FocalSet, f64>,
}

impl MassFunction {
    /// Total ignorance: all mass on the frame.
    pub fn vacuous(frame: usize) -> Self {
        let mut masses = BTreeMap::new();
        masses.insert(FocalSet::full(frame), 1.0);
        Self { frame, masses }
    }

    /// `m(hits) = evidence`, the remainder on the whole frame. `evidence` is
    /// clamped to `[0, 1]`.
    pub fn simple(hits: &HitList, evidence: f64) -> Self {
        let frame = hits.len();
        let evidence = evidence.clamp(0.0, 1.0);
        let focal = FocalSet::from_hits(hits);

        let mut masses = BTreeMap::new();
        if focal.is_full() {
            masses.insert(focal, 1.0);
        } else {
            if evidence > 0.0 {
                masses.insert(focal, evidence);
            }
            if evidence < 1.0 {
                masses.insert(FocalSet::full(frame), 1.0 - evidence);
            }
        }
        Self { frame, masses }
    }

    /// Dempster's rule of combination.
    pub fn combine(&self, other: &MassFunction) -> Result<MassFunction> {
        if self.frame != other.frame {
            return Err(ClassifierError::HitListLength {
                expected: self.frame,
                actual: other.frame,
            });
        }

        let mut conflict = 0.0;
        let mut masses: BTreeMap<FocalSet, f64> = BTreeMap::new();
        for (a, ma) in &self.masses {
            for (b, mb) in &other.masses {
                let product = ma * mb;
                let c = a.intersect(b);
                if c.is_empty() {
                    conflict += product;
                } else {
                    *masses.entry(c).or_insert(0.0) += product;
                }
            }
        }

        let norm = 1.0 - conflict;
        if norm <= CONFLICT_EPSILON {
            return Err(ClassifierError::TotalConflict { conflict });
        }
        for mass in masses.values_mut() {
            *mass /= norm;
        }
        Ok(Self {
            frame: self.frame,
            masses,
        })
    }

    /// Combine a sequence of mass functions, starting from total ignorance.
    pub fn combine_all<'a, I>(frame: usize, functions: I) -> Result<MassFunction>
    where
        I: IntoIterator<Item = &'a MassFunction>,
    {
        functions
            .into_iter()
            .try_fold(Self::vacuous(frame), |acc, m| acc.combine(m))
    }

    /// Mass committed exactly to `{index}`.
    pub fn belief(&self, index: usize) -> f64 {
        self.masses
            .iter()
            .filter(|(set, _)| set.is_singleton(index))
            .map(|(_, m)| m)
            .sum()
    }

    /// Mass of every focal set that does not exclude `index`.
    pub fn plausibility(&self, index: usize) -> f64 {
        self.masses
            .iter()
            .filter(|(set, _)| set.contains(index))
            .map(|(_, m)| m)
            .sum()
    }

    pub fn mass_of(&self, set: &FocalSet) -> f64 {
        self.masses.get(set).copied().unwrap_or(0.0)
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.values().sum()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}
