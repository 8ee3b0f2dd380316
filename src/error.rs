use thiserror::Error;

use crate::data::model::Category;

/// Errors raised by the classification core.
///
/// Every variant is a local, deterministic failure: retrying the same call
/// with the same inputs always yields the same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    // ---- configuration ----
    /// A boundary fit was attempted on an empty sample.
    #[error("Cannot fit boundaries for column {column}: sample is empty")]
    EmptySample { column: usize },

    /// The sample contains NaN or an infinity.
    #[error("Cannot fit boundaries for column {column}: sample contains non-finite value {value}")]
    NonFiniteSample { column: usize, value: f64 },

    /// Every sampled value was identical, so the categories collapse.
    #[error("Cannot fit boundaries for column {column}: all sampled values equal {value}")]
    ConstantSample { column: usize, value: f64 },

    /// `minMedium > maxMedium`, only reachable with a negative average.
    #[error("Inverted medium band for column {column}: min_medium={min_medium}, max_medium={max_medium}")]
    InvertedBoundaries {
        column: usize,
        min_medium: f64,
        max_medium: f64,
    },

    /// A category span of zero length has no center to ramp towards.
    #[error("Category {category} of column {column} has zero width")]
    ZeroWidthCategory { column: usize, category: Category },

    #[error("Column {column} cannot categorize non-finite value {value}")]
    NonFiniteValue { column: usize, value: f64 },

    // ---- lookup ----
    #[error("Exemplar {index} not found (table holds {len} exemplars)")]
    NotFound { index: usize, len: usize },

    // ---- evidence ----
    /// No flagged exemplar had a matching ground-truth row for this column.
    #[error("No evidence for column {column}: no ground-truth row matched")]
    UndefinedEvidence { column: usize },

    /// Every feature of the row produced undefined evidence.
    #[error("Row {row} has no usable evidence on any feature")]
    NoUsableEvidence { row: usize },

    /// Two mass functions share no compatible focal element.
    #[error("Total conflict while combining evidence (conflict mass {conflict})")]
    TotalConflict { conflict: f64 },

    // ---- data shape ----
    #[error("Row {row} has {actual} columns, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Label '{label}' references row {row}, but the matrix has {rows} rows")]
    RowOutOfRange {
        label: String,
        row: usize,
        rows: usize,
    },

    #[error("Row {row} is labeled both '{first}' and '{second}'")]
    ConflictingLabels {
        row: usize,
        first: String,
        second: String,
    },

    #[error("Column {column} out of range (rows have {columns} columns)")]
    ColumnOutOfRange { column: usize, columns: usize },

    #[error("Hit list has {actual} entries, table holds {expected} exemplars")]
    HitListLength { expected: usize, actual: usize },
}

impl ClassifierError {
    /// Broad class of the error, used in reports and log lines.
    pub fn kind(&self) -> ErrorKind {
        use ClassifierError::*;
        match self {
            EmptySample { .. }
            | NonFiniteSample { .. }
            | ConstantSample { .. }
            | InvertedBoundaries { .. }
            | ZeroWidthCategory { .. }
            | NonFiniteValue { .. } => ErrorKind::Configuration,
            NotFound { .. } => ErrorKind::Lookup,
            UndefinedEvidence { .. } | NoUsableEvidence { .. } => ErrorKind::UndefinedEvidence,
            TotalConflict { .. } => ErrorKind::Combination,
            RowLength { .. }
            | RowOutOfRange { .. }
            | ConflictingLabels { .. }
            | ColumnOutOfRange { .. }
            | HitListLength { .. } => ErrorKind::DataShape,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Lookup,
    UndefinedEvidence,
    Combination,
    DataShape,
}

pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;
