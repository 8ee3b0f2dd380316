//! Reference table of categorized exemplars per label.
//!
//! The table is built once by a [`ReferenceTableBuilder`] and then frozen.
//! Exemplars live in a single arena ordered by their global index, which is
//! the concatenation of every label's exemplars in label order.

use std::ops::Range;

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::data::model::{Category, LabelAssignment, NormalizedMatrix};
use crate::error::{ClassifierError, Result};

/// A deduplicated, normalized feature vector of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exemplar {
    /// Global index across all labels.
    pub index: usize,
    pub label: String,
    /// Position inside the label's own exemplar list.
    pub position: usize,
    pub vector: Vec<Category>,
    /// First ground-truth row that produced this vector.
    pub source_row: usize,
}

impl Exemplar {
    /// Human-readable name, e.g. `anger_2`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.label, self.position)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Owns the exemplar lists while they are being collected.
#[derive(Debug, Default)]
pub struct ReferenceTableBuilder {
    groups: IndexMap<String, Vec<(Vec<Category>, usize)>>,
}

impl ReferenceTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `vector` under `label` unless the label already holds an identical
    /// vector. Returns whether the vector was added.
    pub fn insert(&mut self, label: &str, vector: &[Category], source_row: usize) -> bool {
        let group = self.groups.entry(label.to_string()).or_default();
        if group.iter().any(|(existing, _)| existing.as_slice() == vector) {
            return false;
        }
        group.push((vector.to_vec(), source_row));
        true
    }

    /// Insert every labeled row of `normalized`, label by label, rows in
    /// assignment order.
    pub fn extend(&mut self, normalized: &NormalizedMatrix, labels: &LabelAssignment) -> Result<()> {
        for (label, rows) in labels.iter() {
            for &row in rows {
                let vector = normalized.row(row).ok_or_else(|| ClassifierError::RowOutOfRange {
                    label: label.to_string(),
                    row,
                    rows: normalized.len(),
                })?;
                if !self.insert(label, vector, row) {
                    debug!("row {row} duplicates an existing '{label}' exemplar");
                }
            }
        }
        Ok(())
    }

    /// Freeze the table and assign global indices.
    pub fn finish(self) -> ReferenceTable {
        let mut exemplars = Vec::new();
        let mut ranges = IndexMap::with_capacity(self.groups.len());

        for (label, group) in self.groups {
            let start = exemplars.len();
            for (position, (vector, source_row)) in group.into_iter().enumerate() {
                exemplars.push(Exemplar {
                    index: exemplars.len(),
                    label: label.clone(),
                    position,
                    vector,
                    source_row,
                });
            }
            ranges.insert(label, start..exemplars.len());
        }

        ReferenceTable { exemplars, ranges }
    }
}

// ---------------------------------------------------------------------------
// ReferenceTable
// ---------------------------------------------------------------------------

/// Immutable exemplar table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceTable {
    exemplars: Vec<Exemplar>,
    #[serde(skip)]
    ranges: IndexMap<String, Range<usize>>,
}

impl ReferenceTable {
    /// Build the table from every ground-truth row in `labels`.
    pub fn build(normalized: &NormalizedMatrix, labels: &LabelAssignment) -> Result<Self> {
        let mut builder = ReferenceTableBuilder::new();
        builder.extend(normalized, labels)?;
        Ok(builder.finish())
    }

    pub fn get(&self, index: usize) -> Result<&Exemplar> {
        self.exemplars.get(index).ok_or(ClassifierError::NotFound {
            index,
            len: self.exemplars.len(),
        })
    }

    /// `"<label>_<position>"` of the exemplar at `index`.
    pub fn name_of(&self, index: usize) -> Result<String> {
        self.get(index).map(Exemplar::name)
    }

    pub fn label_of(&self, index: usize) -> Result<&str> {
        self.get(index).map(|e| e.label.as_str())
    }

    /// All exemplars in global-index order.
    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    /// Exemplars of one label (empty for unknown labels).
    pub fn exemplars_for(&self, label: &str) -> &[Exemplar] {
        self.ranges
            .get(label)
            .map(|range| &self.exemplars[range.clone()])
            .unwrap_or(&[])
    }

    /// Labels in table order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ranges.keys().map(String::as_str)
    }

    /// Total number of exemplars.
    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }
}
