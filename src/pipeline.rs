//! End-to-end classification of query rows.
//!
//! [`Classifier::fit`] runs the once-per-run stages (boundary fitting,
//! normalization, reference table construction). Afterwards every query row
//! goes through hit-list generation, evidence aggregation and Dempster-Shafer
//! combination independently of the others.

use log::{debug, info, warn};
use serde::Serialize;

use crate::combine::MassFunction;
use crate::data::filter::{RowSelection, selected_rows};
use crate::data::model::{Dataset, NormalizedMatrix};
use crate::error::{ClassifierError, Result};
use crate::evidence::{EvidenceContext, EvidenceVector};
use crate::hits::HitList;
use crate::normalizer::{BoundarySource, NormalizerSet};
use crate::reference::ReferenceTable;

// ---------------------------------------------------------------------------
// Row outcome
// ---------------------------------------------------------------------------

/// Hit lists and evidence of one query row, before combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowEvidence {
    pub row: usize,
    /// One hit list per feature column.
    pub hit_lists: Vec<HitList>,
    pub evidence: EvidenceVector,
}

/// Full classification result of one query row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub row: usize,
    /// Ground-truth label, when the row is pre-classified.
    pub known_label: Option<String>,
    pub hit_lists: Vec<HitList>,
    pub evidence: EvidenceVector,
    /// Plausibility per exemplar, by global index.
    pub plausibilities: Vec<f64>,
    /// Belief per exemplar, by global index.
    pub beliefs: Vec<f64>,
    /// Global index of the most plausible exemplar.
    pub best_exemplar: usize,
    pub best_name: String,
    pub best_label: String,
}

impl RowOutcome {
    pub fn best_plausibility(&self) -> f64 {
        self.plausibilities[self.best_exemplar]
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Fitted pipeline state. Immutable once [`Classifier::fit`] returns.
#[derive(Debug, Clone)]
pub struct Classifier {
    dataset: Dataset,
    normalizers: NormalizerSet,
    normalized: NormalizedMatrix,
    table: ReferenceTable,
}

impl Classifier {
    /// Fit boundaries, normalize every row and build the reference table.
    pub fn fit(dataset: Dataset, source: BoundarySource) -> Result<Self> {
        let normalizers = NormalizerSet::fit(&dataset.raw, &dataset.labels, source)?;
        for n in normalizers.iter() {
            let b = n.boundaries();
            debug!(
                "Normalizer for feature {} ({}): [{:.3} --- {:.3}][{:.3} --- {:.3}][{:.3} --- {:.3}]",
                n.column(),
                dataset.feature_names.get(n.column()).map_or("?", String::as_str),
                b.min_small,
                b.min_medium,
                b.min_medium,
                b.max_medium,
                b.max_medium,
                b.max_large
            );
        }

        let normalized = normalizers.normalize(&dataset.raw)?;
        let table = ReferenceTable::build(&normalized, &dataset.labels)?;
        info!(
            "Reference table holds {} exemplars over {} labels",
            table.len(),
            dataset.labels.len()
        );
        if table.is_empty() {
            warn!("No labeled rows: every query will lack evidence");
        }

        Ok(Self {
            dataset,
            normalizers,
            normalized,
            table,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn normalizers(&self) -> &NormalizerSet {
        &self.normalizers
    }

    pub fn normalized(&self) -> &NormalizedMatrix {
        &self.normalized
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    fn context(&self) -> EvidenceContext<'_> {
        EvidenceContext {
            raw: &self.dataset.raw,
            normalized: &self.normalized,
            table: &self.table,
            labels: &self.dataset.labels,
        }
    }

    /// Hit lists and per-feature evidence of `row`. Features without evidence
    /// are `None` in the evidence vector; every other error is returned.
    pub fn row_evidence(&self, row: usize) -> Result<RowEvidence> {
        let query = self
            .normalized
            .row(row)
            .ok_or_else(|| ClassifierError::RowOutOfRange {
                label: "<query>".to_string(),
                row,
                rows: self.normalized.len(),
            })?;

        let context = self.context();
        let mut hit_lists = Vec::with_capacity(query.len());
        let mut values = Vec::with_capacity(query.len());

        for column in 0..query.len() {
            let hits = HitList::generate(query, &self.table, column)?;
            let normalizer = self.normalizers.get(column)?;
            let value = match context.evidence(&hits, column, normalizer) {
                Ok(e) => Some(e),
                Err(ClassifierError::UndefinedEvidence { .. }) => {
                    debug!("row {row}: no evidence on column {column}, skipping feature");
                    None
                }
                Err(e) => return Err(e),
            };
            hit_lists.push(hits);
            values.push(value);
        }

        Ok(RowEvidence {
            row,
            hit_lists,
            evidence: EvidenceVector::new(values),
        })
    }

    /// Classify a single row: combine the defined per-feature evidence and
    /// pick the exemplar with the highest plausibility (first on ties).
    pub fn classify_row(&self, row: usize) -> Result<RowOutcome> {
        let RowEvidence {
            row,
            hit_lists,
            evidence,
        } = self.row_evidence(row)?;

        let masses: Vec<MassFunction> = evidence
            .defined()
            .map(|(column, e)| MassFunction::simple(&hit_lists[column], e))
            .collect();
        if masses.is_empty() {
            return Err(ClassifierError::NoUsableEvidence { row });
        }
        let combined = MassFunction::combine_all(self.table.len(), &masses)?;

        let plausibilities: Vec<f64> = (0..self.table.len()).map(|i| combined.plausibility(i)).collect();
        let beliefs: Vec<f64> = (0..self.table.len()).map(|i| combined.belief(i)).collect();

        let mut best_exemplar = 0;
        for (i, &p) in plausibilities.iter().enumerate() {
            if p > plausibilities[best_exemplar] {
                best_exemplar = i;
            }
        }
        let best = self.table.get(best_exemplar)?;

        Ok(RowOutcome {
            row,
            known_label: self.dataset.labels.label_of(row).map(str::to_string),
            hit_lists,
            evidence,
            plausibilities,
            beliefs,
            best_exemplar,
            best_name: best.name(),
            best_label: best.label.clone(),
        })
    }

    /// Classify every row passing `selection`. A failing row is reported in
    /// place and does not stop the others.
    pub fn classify(&self, selection: RowSelection) -> Vec<(usize, Result<RowOutcome>)> {
        selected_rows(&self.dataset, selection)
            .into_iter()
            .map(|row| {
                let outcome = self.classify_row(row);
                if let Err(e) = &outcome {
                    warn!("row {row}: {e}");
                }
                (row, outcome)
            })
            .collect()
    }
}
