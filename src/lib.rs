//! Case-based evidential emotion classification.
//!
//! Raw facial-measurement features are discretized into fuzzy
//! small/medium/large categories, labeled rows become reference exemplars,
//! and every query row yields per-feature hit lists and evidence values that
//! are combined with Dempster's rule into a plausibility per exemplar.
//!
//! ```text
//!  Dataset ─► NormalizerSet ─► NormalizedMatrix ─► ReferenceTable
//!                                                      │
//!            query row ─► HitList (per column) ─► evidence ─► MassFunction ─► plausibility
//! ```

pub mod combine;
pub mod config;
pub mod data;
pub mod error;
pub mod evidence;
pub mod hits;
pub mod normalizer;
pub mod pipeline;
pub mod reference;
pub mod report;

pub use data::model::{Category, Dataset, FeatureMatrix, LabelAssignment, NormalizedMatrix};
pub use error::{ClassifierError, ErrorKind};
pub use normalizer::{Boundaries, BoundarySource, Normalizer, NormalizerSet};
pub use pipeline::{Classifier, RowOutcome};
pub use reference::{ReferenceTable, ReferenceTableBuilder};
