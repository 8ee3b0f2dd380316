use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, LargeStringArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, FeatureMatrix, LabelAssignment};

// ---------------------------------------------------------------------------
// Ingestion options
// ---------------------------------------------------------------------------

/// Inclusive, 1-based range of columns, e.g. `2..4` for the 2nd to 4th column.
///
/// Deserialized values go through [`ColumnRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnRange")]
pub struct ColumnRange {
    pub first: usize,
    pub last: usize,
}

#[derive(Deserialize)]
struct RawColumnRange {
    first: usize,
    last: usize,
}

impl TryFrom<RawColumnRange> for ColumnRange {
    type Error = anyhow::Error;

    fn try_from(raw: RawColumnRange) -> Result<Self> {
        Self::new(raw.first, raw.last)
    }
}

impl ColumnRange {
    pub fn new(first: usize, last: usize) -> Result<Self> {
        if first == 0 {
            bail!("Column numbers start at 1, got {first}");
        }
        if last < first {
            bail!("Column range {first}..{last} is empty");
        }
        Ok(Self { first, last })
    }

    /// 0-based record indices covered by the range.
    pub fn indices(&self) -> Range<usize> {
        self.first - 1..self.last
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

impl FromStr for ColumnRange {
    type Err = anyhow::Error;

    /// Accepts `2..4`, `2-4` or a single column `3`.
    fn from_str(s: &str) -> Result<Self> {
        let (first, last) = match s.split_once("..").or_else(|| s.split_once('-')) {
            Some((a, b)) => (a, b),
            None => (s, s),
        };
        let first = first
            .trim()
            .parse()
            .with_context(|| format!("'{first}' is not a column number"))?;
        let last = last
            .trim()
            .parse()
            .with_context(|| format!("'{last}' is not a column number"))?;
        Self::new(first, last)
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.first, self.last)
    }
}

/// How a CSV file is sliced into features and labels. Ignored by the JSON and
/// Parquet loaders, whose layout is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub delimiter: char,
    /// Treat the first line as column names.
    pub has_header: bool,
    pub feature_columns: ColumnRange,
    /// 1-based column holding the label; empty cells mean "unlabeled".
    pub label_column: Option<usize>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: ';',
            has_header: true,
            feature_columns: ColumnRange { first: 2, last: 4 },
            label_column: Some(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a labeled feature table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text, sliced according to `options`
/// * `.json`         – `[{ "features": [...], "label": "joy" }, ...]`
/// * `.parquet`      – `features` list column plus optional `label` column
pub fn load_file(path: &Path, options: &IngestOptions) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" | "txt" => load_csv(path, options),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        "Loaded {} rows with {} features and {} labels from {}",
        dataset.len(),
        dataset.raw.columns(),
        dataset.labels.len(),
        path.display()
    );
    Ok(dataset)
}

fn build_dataset(feature_names: Vec<String>, rows: Vec<Vec<f64>>, labels: LabelAssignment) -> Result<Dataset> {
    if rows.is_empty() {
        bail!("No data rows found");
    }
    let raw = FeatureMatrix::new(rows).context("building feature matrix")?;
    Dataset::new(feature_names, raw, labels).context("checking label rows")
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Default layout (the one written by `generate_sample`):
///   `id;eye_opening;mouth_opening;forehead_wrinkles;emotion`
/// Columns outside the feature range and the label column are ignored.
fn load_csv(path: &Path, options: &IngestOptions) -> Result<Dataset> {
    let delimiter = u8::try_from(options.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("Delimiter '{}' is not a single ASCII character", options.delimiter))?;
    let label_index = match options.label_column {
        Some(0) => bail!("Column numbers start at 1, got label column 0"),
        Some(c) => Some(c - 1),
        None => None,
    };
    let columns = options.feature_columns.indices();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(options.has_header)
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;

    let feature_names: Vec<String> = if options.has_header {
        let headers = reader.headers().context("reading CSV headers")?;
        columns
            .clone()
            .map(|i| headers.get(i).unwrap_or("").trim().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    let mut labels = LabelAssignment::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let row = columns
            .clone()
            .map(|i| {
                let cell = record
                    .get(i)
                    .with_context(|| format!("CSV row {row_no}: missing column {}", i + 1))?;
                cell.trim()
                    .parse::<f64>()
                    .with_context(|| format!("CSV row {row_no}, column {}: '{cell}' is not a number", i + 1))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);

        if let Some(label) = label_index.and_then(|i| record.get(i)).map(str::trim) {
            if !label.is_empty() {
                labels
                    .insert(label, row_no)
                    .with_context(|| format!("CSV row {row_no}"))?;
            }
        }
    }

    debug!("CSV feature columns {}: {:?}", options.feature_columns, feature_names);
    build_dataset(feature_names, rows, labels)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JsonRecord {
    features: Vec<f64>,
    #[serde(default)]
    label: Option<String>,
}

/// Either a bare records array or an object that also names the features:
///
/// ```json
/// { "feature_names": ["eye", "mouth"],
///   "records": [ { "features": [3.1, 0.4], "label": "joy" },
///                { "features": [2.7, 1.9], "label": null } ] }
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Records(Vec<JsonRecord>),
    Named {
        feature_names: Vec<String>,
        records: Vec<JsonRecord>,
    },
}

fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let document: JsonDocument = serde_json::from_str(&text).context("parsing JSON")?;

    let (feature_names, records) = match document {
        JsonDocument::Records(records) => (Vec::new(), records),
        JsonDocument::Named {
            feature_names,
            records,
        } => (feature_names, records),
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut labels = LabelAssignment::new();
    for (i, record) in records.into_iter().enumerate() {
        if let Some(label) = record.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            labels
                .insert(label, i)
                .with_context(|| format!("Row {i}"))?;
        }
        rows.push(record.features);
    }

    build_dataset(feature_names, rows, labels)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing feature vectors.
///
/// Expected schema:
/// - `features`: List<Float64|Float32> or LargeList – one vector per row
/// - `label`: optional Utf8 / LargeUtf8 column; nulls and empty strings are unlabeled
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    let mut labels = LabelAssignment::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let features_idx = schema
            .index_of("features")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'features' column"))?;
        let features_col = batch.column(features_idx);
        let label_col = schema.index_of("label").ok().map(|i| batch.column(i));

        for i in 0..batch.num_rows() {
            let row_no = rows.len();
            let features = extract_f64_list(features_col, i)
                .with_context(|| format!("Row {row_no}: failed to read 'features'"))?;
            rows.push(features);

            if let Some(col) = label_col {
                let label = extract_label(col, i)
                    .with_context(|| format!("Row {row_no}: failed to read 'label'"))?;
                if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
                    labels.insert(label.trim(), row_no)?;
                }
            }
        }
    }

    build_dataset(Vec::new(), rows, labels)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Missing feature values cannot be categorized, so nulls are rejected.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        f64_arr
            .iter()
            .enumerate()
            .map(|(j, v)| v.with_context(|| format!("null feature at position {j}")))
            .collect()
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        f32_arr
            .iter()
            .enumerate()
            .map(|(j, v)| {
                v.map(f64::from)
                    .with_context(|| format!("null feature at position {j}"))
            })
            .collect()
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

fn extract_label(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .context("expected StringArray")?
            .value(row),
        DataType::LargeUtf8 => col
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .context("expected LargeStringArray")?
            .value(row),
        other => bail!("Expected Utf8 label column, got {other:?}"),
    };
    Ok(Some(value.to_string()))
}
