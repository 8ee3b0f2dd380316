/// Data layer: core types, loading, and row selection.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Dataset     │  FeatureMatrix + LabelAssignment
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  row selection → query row indices
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
