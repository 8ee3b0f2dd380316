//! Fuzzy normalization of raw feature columns.
//!
//! Each feature column gets its own [`Normalizer`]. Fitting derives four
//! frozen boundaries from a sample of the column:
//!
//! ```text
//!  min_small        min_medium            max_medium        max_large
//!     |---- small ----|-------- medium --------|---- large ----|
//! ```
//!
//! with `min_medium = avg - avg/3` and `max_medium = avg + (max - avg)/3`.
//! A value is then mapped to a [`Category`] and to a membership confidence in
//! `[0.5, 1.0]` that peaks at the center of its category's span.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::model::{Category, FeatureMatrix, LabelAssignment, NormalizedMatrix};
use crate::error::{ClassifierError, Result};

/// Lowest confidence a categorized value can carry ("as likely as chance").
pub const MIN_CONFIDENCE: f64 = 0.5;
/// Confidence at the exact center of a category span.
pub const MAX_CONFIDENCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Boundaries
// ---------------------------------------------------------------------------

/// Frozen category boundaries of one column.
///
/// Invariant: `min_small <= min_medium <= max_medium <= max_large`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub min_small: f64,
    pub min_medium: f64,
    pub max_medium: f64,
    pub max_large: f64,
}

impl Boundaries {
    /// Derive boundaries from a sample of `column`.
    pub fn fit(column: usize, sample: &[f64]) -> Result<Self> {
        if sample.is_empty() {
            return Err(ClassifierError::EmptySample { column });
        }
        if let Some(&value) = sample.iter().find(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteSample { column, value });
        }

        let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = sample.iter().sum::<f64>() / sample.len() as f64;

        if min == max {
            return Err(ClassifierError::ConstantSample { column, value: min });
        }

        let min_medium = average - average / 3.0;
        let max_medium = average + (max - average) / 3.0;
        if min_medium > max_medium {
            return Err(ClassifierError::InvertedBoundaries {
                column,
                min_medium,
                max_medium,
            });
        }

        // Narrow columns can have their observed min above min_medium; the
        // small span then collapses instead of turning negative.
        Ok(Self {
            min_small: min.min(min_medium),
            min_medium,
            max_medium,
            max_large: max.max(max_medium),
        })
    }

    /// Closed span `(lower, upper)` of a category.
    pub fn span(&self, category: Category) -> (f64, f64) {
        match category {
            Category::Small => (self.min_small, self.min_medium),
            Category::Medium => (self.min_medium, self.max_medium),
            Category::Large => (self.max_medium, self.max_large),
        }
    }

    /// Category of a finite value. Medium is closed on both ends.
    pub fn categorize(&self, value: f64) -> Category {
        if value < self.min_medium {
            Category::Small
        } else if value <= self.max_medium {
            Category::Medium
        } else {
            Category::Large
        }
    }
}

// ---------------------------------------------------------------------------
// BoundarySource
// ---------------------------------------------------------------------------

/// Which rows feed the boundary fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum BoundarySource {
    /// Every row of the column.
    #[default]
    #[serde(rename = "all", alias = "all_rows")]
    #[value(name = "all")]
    AllRows,
    /// Only rows carrying a ground-truth label.
    #[serde(rename = "labeled", alias = "labeled_rows")]
    #[value(name = "labeled")]
    LabeledRows,
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Normalizer of a single feature column. Only obtainable by fitting, so
/// boundaries always exist before the first categorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalizer {
    column: usize,
    boundaries: Boundaries,
}

impl Normalizer {
    pub fn fit(column: usize, sample: &[f64]) -> Result<Self> {
        let boundaries = Boundaries::fit(column, sample)?;
        debug!("column {column}: fitted {boundaries:?} from {} values", sample.len());
        Ok(Self { column, boundaries })
    }

    /// Replace the boundaries with ones fitted on `sample`. Nothing carries
    /// over from the previous fit; on error the old boundaries stay.
    pub fn refit(&mut self, sample: &[f64]) -> Result<()> {
        self.boundaries = Boundaries::fit(self.column, sample)?;
        Ok(())
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn categorize(&self, value: f64) -> Result<Category> {
        if !value.is_finite() {
            return Err(ClassifierError::NonFiniteValue {
                column: self.column,
                value,
            });
        }
        Ok(self.boundaries.categorize(value))
    }

    /// How centrally `value` sits inside its category.
    ///
    /// Ramps linearly from 0.5 at either edge of the category span to 1.0 at
    /// its center, with slope `0.5 / (width / 2)`, and is clamped to
    /// `[0.5, 1.0]` for values outside the fitted range.
    pub fn membership_confidence(&self, value: f64) -> Result<f64> {
        let category = self.categorize(value)?;
        let (lower, upper) = self.boundaries.span(category);
        let width = upper - lower;
        if width <= 0.0 {
            return Err(ClassifierError::ZeroWidthCategory {
                column: self.column,
                category,
            });
        }

        let center = lower + width / 2.0;
        let slope = 0.5 / (width / 2.0);
        let confidence = MAX_CONFIDENCE - (value - center).abs() * slope;
        Ok(confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
    }

    pub fn normalize_column(&self, values: &[f64]) -> Result<Vec<Category>> {
        values.iter().map(|&v| self.categorize(v)).collect()
    }
}

// ---------------------------------------------------------------------------
// NormalizerSet – one normalizer per column
// ---------------------------------------------------------------------------

/// The fitted normalizers of every feature column, indexed by column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizerSet {
    normalizers: Vec<Normalizer>,
}

impl NormalizerSet {
    /// Fit one normalizer per column of `raw`, sampling the rows selected by
    /// `source`.
    pub fn fit(raw: &FeatureMatrix, labels: &LabelAssignment, source: BoundarySource) -> Result<Self> {
        let sample_rows = match source {
            BoundarySource::AllRows => None,
            BoundarySource::LabeledRows => Some(labels.labeled_rows()),
        };

        let normalizers = (0..raw.columns())
            .map(|column| {
                let sample = match &sample_rows {
                    None => raw.column(column)?,
                    Some(rows) => raw.column_subset(column, rows)?,
                };
                Normalizer::fit(column, &sample)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { normalizers })
    }

    /// Category-code every row of `raw`. The raw matrix is left untouched.
    pub fn normalize(&self, raw: &FeatureMatrix) -> Result<NormalizedMatrix> {
        if raw.columns() != self.normalizers.len() && !raw.is_empty() {
            return Err(ClassifierError::RowLength {
                row: 0,
                expected: self.normalizers.len(),
                actual: raw.columns(),
            });
        }
        let rows = raw
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.normalizers)
                    .map(|(&v, n)| n.categorize(v))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        NormalizedMatrix::new(rows)
    }

    pub fn get(&self, column: usize) -> Result<&Normalizer> {
        self.normalizers
            .get(column)
            .ok_or(ClassifierError::ColumnOutOfRange {
                column,
                columns: self.normalizers.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Normalizer> {
        self.normalizers.iter()
    }

    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn fitted(sample: &[f64]) -> Normalizer {
        Normalizer::fit(0, sample).unwrap()
    }

    #[test]
    fn test_three_value_column_boundaries() {
        let n = fitted(&[10.0, 20.0, 30.0]);
        let b = n.boundaries();
        assert_relative_eq!(b.min_medium, 13.333_333, epsilon = 1e-5);
        assert_relative_eq!(b.max_medium, 23.333_333, epsilon = 1e-5);
        assert_eq!(b.min_small, 10.0);
        assert_eq!(b.max_large, 30.0);

        assert_eq!(n.categorize(10.0).unwrap(), Category::Small);
        assert_eq!(n.categorize(20.0).unwrap(), Category::Medium);
        assert_eq!(n.categorize(30.0).unwrap(), Category::Large);
    }

    #[test]
    fn test_medium_band_is_closed() {
        let n = fitted(&[10.0, 20.0, 30.0]);
        let b = *n.boundaries();
        assert_eq!(n.categorize(b.min_medium).unwrap(), Category::Medium);
        assert_eq!(n.categorize(b.max_medium).unwrap(), Category::Medium);
        assert_eq!(n.categorize(b.max_medium + 1e-9).unwrap(), Category::Large);
    }

    #[test]
    fn test_membership_confidence_ramps() {
        let n = fitted(&[10.0, 20.0, 30.0]);
        // small span [10, 13.33]: edge
        assert_relative_eq!(n.membership_confidence(10.0).unwrap(), 0.5, epsilon = 1e-9);
        // medium span [13.33, 23.33], center 18.33
        assert_relative_eq!(n.membership_confidence(20.0).unwrap(), 0.833_333, epsilon = 1e-5);
        // large span [23.33, 30], center 26.67: outer edge, then halfway in
        assert_relative_eq!(n.membership_confidence(30.0).unwrap(), 0.5, epsilon = 1e-9);
        assert_relative_eq!(n.membership_confidence(25.0).unwrap(), 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_membership_confidence_is_one_at_center() {
        let n = fitted(&[10.0, 20.0, 30.0]);
        for category in Category::ALL {
            let (lower, upper) = n.boundaries().span(category);
            let center = lower + (upper - lower) / 2.0;
            assert_eq!(n.membership_confidence(center).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_confidence_is_clamped_outside_fitted_range() {
        let n = fitted(&[10.0, 20.0, 30.0]);
        assert_eq!(n.membership_confidence(-500.0).unwrap(), MIN_CONFIDENCE);
        assert_eq!(n.membership_confidence(5_000.0).unwrap(), MIN_CONFIDENCE);
    }

    #[test]
    fn test_constant_sample_is_rejected() {
        assert_eq!(
            Normalizer::fit(4, &[7.0, 7.0, 7.0]).unwrap_err(),
            ClassifierError::ConstantSample { column: 4, value: 7.0 }
        );
    }

    #[test]
    fn test_empty_and_non_finite_samples_are_rejected() {
        assert!(matches!(
            Normalizer::fit(0, &[]),
            Err(ClassifierError::EmptySample { column: 0 })
        ));
        assert!(matches!(
            Normalizer::fit(1, &[1.0, f64::NAN]),
            Err(ClassifierError::NonFiniteSample { column: 1, .. })
        ));
    }

    #[test]
    fn test_negative_average_inverts_medium_band() {
        assert!(matches!(
            Normalizer::fit(0, &[-30.0, -20.0, -10.0]),
            Err(ClassifierError::InvertedBoundaries { .. })
        ));
    }

    #[test]
    fn test_narrow_column_collapses_small_span() {
        // average 11 -> min_medium 7.33 lies below the observed min of 10
        let n = fitted(&[10.0, 11.0, 12.0]);
        let b = n.boundaries();
        assert_eq!(b.min_small, b.min_medium);
        assert_eq!(n.categorize(10.0).unwrap(), Category::Medium);
        assert_eq!(
            n.membership_confidence(1.0).unwrap_err(),
            ClassifierError::ZeroWidthCategory {
                column: 0,
                category: Category::Small
            }
        );
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let n = fitted(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            n.categorize(f64::INFINITY),
            Err(ClassifierError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_refit_resets_boundaries() {
        let mut n = fitted(&[10.0, 20.0, 30.0]);
        n.refit(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(*n.boundaries(), *fitted(&[1.0, 2.0, 3.0]).boundaries());

        let before = *n.boundaries();
        assert!(n.refit(&[]).is_err());
        assert_eq!(*n.boundaries(), before);
    }

    #[test]
    fn test_set_fits_on_labeled_rows_only() {
        let raw = FeatureMatrix::new(vec![vec![10.0], vec![20.0], vec![30.0], vec![1000.0]]).unwrap();
        let labels = LabelAssignment::from_pairs([("joy", vec![0, 1, 2])]).unwrap();

        let all = NormalizerSet::fit(&raw, &labels, BoundarySource::AllRows).unwrap();
        let labeled = NormalizerSet::fit(&raw, &labels, BoundarySource::LabeledRows).unwrap();

        assert_eq!(all.get(0).unwrap().boundaries().max_large, 1000.0);
        assert_eq!(labeled.get(0).unwrap().boundaries().max_large, 30.0);
        assert_relative_eq!(
            labeled.get(0).unwrap().boundaries().min_medium,
            13.333_333,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_set_normalize_keeps_row_order() {
        let raw = FeatureMatrix::new(vec![vec![10.0, 1.0], vec![20.0, 2.0], vec![30.0, 3.0]]).unwrap();
        let set = NormalizerSet::fit(&raw, &LabelAssignment::new(), BoundarySource::AllRows).unwrap();
        let normalized = set.normalize(&raw).unwrap();
        assert_eq!(
            normalized,
            NormalizedMatrix::from_ids(&[&[1, 1], &[2, 2], &[3, 3]]).unwrap()
        );
        assert!(set.get(2).is_err());
    }

    proptest! {
        #[test]
        fn prop_boundaries_are_ordered(sample in prop::collection::vec(0.01f64..1_000.0, 2..60)) {
            let b = match Boundaries::fit(0, &sample) {
                Ok(b) => b,
                Err(ClassifierError::ConstantSample { .. }) => return Ok(()),
                Err(e) => panic!("unexpected error {e}"),
            };
            prop_assert!(b.min_small <= b.min_medium);
            prop_assert!(b.min_medium <= b.max_medium);
            prop_assert!(b.max_medium <= b.max_large);
        }

        #[test]
        fn prop_confidence_stays_in_range(
            sample in prop::collection::vec(0.01f64..1_000.0, 2..60),
            probe in 0.0f64..1_200.0,
        ) {
            let Ok(n) = Normalizer::fit(0, &sample) else { return Ok(()) };
            match n.membership_confidence(probe) {
                Ok(c) => prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c)),
                Err(ClassifierError::ZeroWidthCategory { .. }) => {}
                Err(e) => panic!("unexpected error {e}"),
            }
            prop_assert!(n.categorize(probe).is_ok());
        }
    }
}
