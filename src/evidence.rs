use serde::Serialize;

use crate::data::model::{Category, FeatureMatrix, LabelAssignment, NormalizedMatrix};
use crate::error::{ClassifierError, Result};
use crate::hits::HitList;
use crate::normalizer::Normalizer;
use crate::reference::ReferenceTable;

/// Read-only view over everything the evidence aggregation joins together.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceContext<'a> {
    pub raw: &'a FeatureMatrix,
    pub normalized: &'a NormalizedMatrix,
    pub table: &'a ReferenceTable,
    pub labels: &'a LabelAssignment,
}

impl<'a> EvidenceContext<'a> {
    /// Mean membership confidence of the ground-truth rows backing the hit
    /// exemplars on `column`.
    ///
    /// For each hit exemplar of label `L`, every row of `L` whose category at
    /// `column` equals the exemplar's contributes the confidence of its raw
    /// value. Rows are joined between the raw and normalized matrices by row
    /// index only. With no contributing row the result is
    /// [`ClassifierError::UndefinedEvidence`].
    ///
    /// The membership ramp is defined over raw units, so it is fed the raw
    /// value of each row and never its category id.
    pub fn evidence(&self, hits: &HitList, column: usize, normalizer: &Normalizer) -> Result<f64> {
        if hits.len() != self.table.len() {
            return Err(ClassifierError::HitListLength {
                expected: self.table.len(),
                actual: hits.len(),
            });
        }

        let mut total = 0.0;
        let mut count = 0usize;

        for index in hits.hit_indices() {
            let exemplar = self.table.get(index)?;
            let wanted = *exemplar.vector.get(column).ok_or(ClassifierError::ColumnOutOfRange {
                column,
                columns: exemplar.vector.len(),
            })?;

            for &row in self.labels.rows_for(&exemplar.label) {
                let category = self.normalized_at(&exemplar.label, row, column)?;
                if category != wanted {
                    continue;
                }
                let value = self.raw_at(&exemplar.label, row, column)?;
                total += normalizer.membership_confidence(value)?;
                count += 1;
            }
        }

        if count == 0 {
            return Err(ClassifierError::UndefinedEvidence { column });
        }
        Ok(total / count as f64)
    }

    fn normalized_at(&self, label: &str, row: usize, column: usize) -> Result<Category> {
        let values = self.normalized.row(row).ok_or_else(|| ClassifierError::RowOutOfRange {
            label: label.to_string(),
            row,
            rows: self.normalized.len(),
        })?;
        values.get(column).copied().ok_or(ClassifierError::ColumnOutOfRange {
            column,
            columns: values.len(),
        })
    }

    fn raw_at(&self, label: &str, row: usize, column: usize) -> Result<f64> {
        let values = self.raw.row(row).ok_or_else(|| ClassifierError::RowOutOfRange {
            label: label.to_string(),
            row,
            rows: self.raw.len(),
        })?;
        values.get(column).copied().ok_or(ClassifierError::ColumnOutOfRange {
            column,
            columns: values.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// EvidenceVector
// ---------------------------------------------------------------------------

/// One evidence value per feature column of a query row; `None` where the
/// column produced no evidence.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EvidenceVector {
    values: Vec<Option<f64>>,
}

impl EvidenceVector {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    /// `(column, evidence)` for every defined entry.
    pub fn defined(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(column, v)| v.map(|e| (column, e)))
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{BoundarySource, NormalizerSet};
    use approx::assert_relative_eq;

    struct Fixture {
        raw: FeatureMatrix,
        normalized: NormalizedMatrix,
        labels: LabelAssignment,
        table: ReferenceTable,
        normalizers: NormalizerSet,
    }

    impl Fixture {
        fn new(rows: Vec<Vec<f64>>, labels: LabelAssignment) -> Self {
            let raw = FeatureMatrix::new(rows).unwrap();
            let normalizers = NormalizerSet::fit(&raw, &labels, BoundarySource::AllRows).unwrap();
            let normalized = normalizers.normalize(&raw).unwrap();
            let table = ReferenceTable::build(&normalized, &labels).unwrap();
            Self {
                raw,
                normalized,
                labels,
                table,
                normalizers,
            }
        }

        fn context(&self) -> EvidenceContext<'_> {
            EvidenceContext {
                raw: &self.raw,
                normalized: &self.normalized,
                table: &self.table,
                labels: &self.labels,
            }
        }
    }

    // average 20.25 -> medium span [13.5, 23.5], center 18.5, slope 0.1
    fn single_column() -> Fixture {
        let labels = LabelAssignment::from_pairs([("joy", vec![1, 3]), ("anger", vec![2])]).unwrap();
        Fixture::new(vec![vec![10.0], vec![20.0], vec![30.0], vec![21.0]], labels)
    }

    #[test]
    fn test_evidence_averages_matching_ground_truth_rows() {
        let f = single_column();
        assert_eq!(f.table.len(), 2);

        let hits = HitList::generate(&[Category::Medium], &f.table, 0).unwrap();
        assert_eq!(hits.to_indicators(), vec![1, 0]);

        let e = f.context().evidence(&hits, 0, f.normalizers.get(0).unwrap()).unwrap();
        // (0.85 + 0.75) / 2
        assert_relative_eq!(e, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn test_no_hits_is_undefined_not_nan() {
        let f = single_column();
        let hits = HitList::generate(&[Category::Small], &f.table, 0).unwrap();
        assert_eq!(hits.hit_count(), 0);

        let result = f.context().evidence(&hits, 0, f.normalizers.get(0).unwrap());
        assert_eq!(result, Err(ClassifierError::UndefinedEvidence { column: 0 }));
    }

    #[test]
    fn test_evidence_stays_within_confidence_range() {
        let labels = LabelAssignment::from_pairs([
            ("joy", vec![0, 1, 2]),
            ("anger", vec![3, 4]),
            ("fear", vec![5]),
        ])
        .unwrap();
        let f = Fixture::new(
            vec![
                vec![3.0, 40.0],
                vec![5.0, 42.0],
                vec![9.0, 12.0],
                vec![11.0, 8.0],
                vec![2.0, 60.0],
                vec![7.0, 25.0],
            ],
            labels,
        );

        for row in f.normalized.rows() {
            for column in 0..2 {
                let hits = HitList::generate(row, &f.table, column).unwrap();
                let e = f
                    .context()
                    .evidence(&hits, column, f.normalizers.get(column).unwrap())
                    .unwrap();
                assert!((0.5..=1.0).contains(&e), "evidence {e} out of range");
            }
        }
    }

    #[test]
    fn test_rejects_misaligned_hit_list() {
        let f = single_column();
        let hits = HitList::from_bools(vec![true]);
        assert_eq!(
            f.context().evidence(&hits, 0, f.normalizers.get(0).unwrap()),
            Err(ClassifierError::HitListLength { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_evidence_vector_keeps_undefined_entries() {
        let v = EvidenceVector::new(vec![Some(0.7), None, Some(0.9)]);
        assert_eq!(v.get(1), None);
        assert_eq!(v.defined().collect::<Vec<_>>(), vec![(0, 0.7), (2, 0.9)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[0.7,null,0.9]");
    }
}
