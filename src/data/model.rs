use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

// ---------------------------------------------------------------------------
// Category – one fuzzy bucket of a feature column
// ---------------------------------------------------------------------------

/// Fuzzy category a raw value is discretized into.
///
/// Serialized as its numeric id (1, 2, 3) so normalized rows read the same in
/// JSON reports as in the console tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Category {
    Small = 1,
    Medium = 2,
    Large = 3,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Small, Category::Medium, Category::Large];

    /// Numeric category id.
    pub fn id(self) -> u8 {
        self as u8
    }
}

impl From<Category> for u8 {
    fn from(c: Category) -> u8 {
        c.id()
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(id: u8) -> std::result::Result<Self, Self::Error> {
        match id {
            1 => Ok(Category::Small),
            2 => Ok(Category::Medium),
            3 => Ok(Category::Large),
            other => Err(format!("invalid category id {other}, expected 1, 2 or 3")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Small => write!(f, "small"),
            Category::Medium => write!(f, "medium"),
            Category::Large => write!(f, "large"),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureMatrix – raw feature values, one row per observation
// ---------------------------------------------------------------------------

/// Rows of raw feature values. Every row has the same number of columns and
/// row identity is the row's position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl FeatureMatrix {
    /// Build a matrix, rejecting rows whose length differs from the first row.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        check_row_lengths(rows.iter().map(Vec::len), columns)?;
        Ok(Self { rows, columns })
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Values of one column in row order.
    pub fn column(&self, column: usize) -> Result<Vec<f64>> {
        self.check_column(column)?;
        Ok(self.rows.iter().map(|r| r[column]).collect())
    }

    /// Values of one column for the given rows only, in the given order.
    pub fn column_subset(&self, column: usize, rows: &[usize]) -> Result<Vec<f64>> {
        self.check_column(column)?;
        rows.iter()
            .map(|&r| {
                self.rows
                    .get(r)
                    .map(|row| row[column])
                    .ok_or_else(|| ClassifierError::RowOutOfRange {
                        label: format!("<column {column} sample>"),
                        row: r,
                        rows: self.rows.len(),
                    })
            })
            .collect()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check_column(&self, column: usize) -> Result<()> {
        if column >= self.columns {
            return Err(ClassifierError::ColumnOutOfRange {
                column,
                columns: self.columns,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NormalizedMatrix – category-coded copy of a FeatureMatrix
// ---------------------------------------------------------------------------

/// Category-coded rows, parallel to the raw [`FeatureMatrix`] they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMatrix {
    rows: Vec<Vec<Category>>,
    columns: usize,
}

impl NormalizedMatrix {
    pub fn new(rows: Vec<Vec<Category>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        check_row_lengths(rows.iter().map(Vec::len), columns)?;
        Ok(Self { rows, columns })
    }

    /// Convenience constructor from numeric ids, mostly for fixtures.
    pub fn from_ids(rows: &[&[u8]]) -> std::result::Result<Self, String> {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|&id| Category::try_from(id)).collect())
            .collect::<std::result::Result<Vec<Vec<Category>>, String>>()?;
        Self::new(rows).map_err(|e| e.to_string())
    }

    pub fn rows(&self) -> &[Vec<Category>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Category]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn check_row_lengths(lengths: impl Iterator<Item = usize>, expected: usize) -> Result<()> {
    for (row, actual) in lengths.enumerate() {
        if actual != expected {
            return Err(ClassifierError::RowLength {
                row,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// LabelAssignment – ground-truth rows per label
// ---------------------------------------------------------------------------

/// Ground-truth row indices per label.
///
/// Labels keep the order in which they were first inserted; that order is the
/// label order of the reference table and therefore of every global exemplar
/// index. A row belongs to at most one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelAssignment {
    labels: IndexMap<String, Vec<usize>>,
}

impl LabelAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(label, rows)` pairs, in the given label order.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<usize>)>,
        S: Into<String>,
    {
        let mut assignment = Self::new();
        for (label, rows) in pairs {
            let label = label.into();
            for row in rows {
                assignment.insert(&label, row)?;
            }
        }
        Ok(assignment)
    }

    /// Assign `row` to `label`. Re-inserting the same pair is a no-op; claiming
    /// a row already owned by another label is an error.
    pub fn insert(&mut self, label: &str, row: usize) -> Result<()> {
        if let Some(owner) = self.label_of(row) {
            if owner == label {
                return Ok(());
            }
            return Err(ClassifierError::ConflictingLabels {
                row,
                first: owner.to_string(),
                second: label.to_string(),
            });
        }
        self.labels.entry(label.to_string()).or_default().push(row);
        Ok(())
    }

    /// Label that owns `row`, if the row is pre-classified.
    pub fn label_of(&self, row: usize) -> Option<&str> {
        self.labels
            .iter()
            .find(|(_, rows)| rows.contains(&row))
            .map(|(label, _)| label.as_str())
    }

    pub fn is_labeled(&self, row: usize) -> bool {
        self.label_of(row).is_some()
    }

    /// Rows of `label` in insertion order (empty for unknown labels).
    pub fn rows_for(&self, label: &str) -> &[usize] {
        self.labels.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labels with their rows, in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.labels.iter().map(|(l, rows)| (l.as_str(), rows.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Every labeled row, grouped by label in label order.
    pub fn labeled_rows(&self) -> Vec<usize> {
        self.labels.values().flatten().copied().collect()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Check every referenced row exists in a matrix of `rows` rows.
    pub fn validate(&self, rows: usize) -> Result<()> {
        for (label, indices) in &self.labels {
            if let Some(&row) = indices.iter().find(|&&r| r >= rows) {
                return Err(ClassifierError::RowOutOfRange {
                    label: label.clone(),
                    row,
                    rows,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete ingested data set
// ---------------------------------------------------------------------------

/// Raw features plus ground-truth labels, as handed over by ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    /// One name per feature column.
    pub feature_names: Vec<String>,
    pub raw: FeatureMatrix,
    pub labels: LabelAssignment,
}

impl Dataset {
    /// Assemble a dataset, checking that names and labels fit the matrix.
    /// Missing feature names default to `feature_<n>`.
    pub fn new(
        mut feature_names: Vec<String>,
        raw: FeatureMatrix,
        labels: LabelAssignment,
    ) -> Result<Self> {
        labels.validate(raw.len())?;
        if feature_names.len() != raw.columns() {
            feature_names = (0..raw.columns()).map(|i| format!("feature_{i}")).collect();
        }
        Ok(Self {
            feature_names,
            raw,
            labels,
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
