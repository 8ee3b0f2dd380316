use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::RowSelection;
use crate::data::loader::IngestOptions;
use crate::normalizer::BoundarySource;

/// Settings of one classification run.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "boundaries": "labeled", "rows": "unlabeled",
///   "ingest": { "delimiter": ",", "feature_columns": { "first": 1, "last": 3 } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rows used to fit the category boundaries.
    pub boundaries: BoundarySource,
    /// Rows classified as queries.
    pub rows: RowSelection,
    pub ingest: IngestOptions,
}

impl PipelineConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::ColumnRange;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "boundaries": "labeled",
                 "ingest": { "delimiter": ",", "feature_columns": { "first": 1, "last": 3 } } }"#,
        )
        .unwrap();

        assert_eq!(cfg.boundaries, BoundarySource::LabeledRows);
        assert_eq!(cfg.rows, RowSelection::All);
        assert_eq!(cfg.ingest.delimiter, ',');
        assert_eq!(cfg.ingest.feature_columns, ColumnRange { first: 1, last: 3 });
        assert!(cfg.ingest.has_header);
        assert_eq!(cfg.ingest.label_column, Some(5));
    }

    #[test]
    fn test_empty_config_is_default() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }

    #[test]
    fn test_unknown_boundary_source() {
        assert!(serde_json::from_str::<PipelineConfig>(r#"{"boundaries": "median"}"#).is_err());
    }

    #[test]
    fn test_feature_columns_are_validated() {
        for bad in [r#"{"first": 0, "last": 3}"#, r#"{"first": 4, "last": 2}"#] {
            let json = format!(r#"{{ "ingest": {{ "feature_columns": {bad} }} }}"#);
            assert!(
                serde_json::from_str::<PipelineConfig>(&json).is_err(),
                "accepted {bad}"
            );
        }

        let cfg: PipelineConfig =
            serde_json::from_str(r#"{ "ingest": { "feature_columns": { "first": 3, "last": 3 } } }"#)
                .unwrap();
        assert_eq!(cfg.ingest.feature_columns.indices(), 2..3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "rows": "unlabeled" }"#).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap().rows, RowSelection::Unlabeled);
    }
}
