//! Console and JSON rendering of a classification run.

use std::io::{self, Write};

use serde::Serialize;

use crate::data::model::Category;
use crate::error::{ClassifierError, Result};
use crate::normalizer::Boundaries;
use crate::pipeline::{Classifier, RowOutcome};

fn format_vector(vector: &[Category]) -> String {
    let ids: Vec<String> = vector.iter().map(|c| c.id().to_string()).collect();
    format!("[{}]", ids.join(", "))
}

// ---------------------------------------------------------------------------
// Console output
// ---------------------------------------------------------------------------

/// Ground-truth rows per label.
pub fn write_labels(out: &mut impl Write, classifier: &Classifier) -> io::Result<()> {
    writeln!(out, "Category labels in [rows]:")?;
    for (label, rows) in classifier.dataset().labels.iter() {
        writeln!(out, "{label} {rows:?}")?;
    }
    Ok(())
}

/// Fitted boundaries of every feature.
pub fn write_normalizers(out: &mut impl Write, classifier: &Classifier) -> io::Result<()> {
    let names = &classifier.dataset().feature_names;
    for n in classifier.normalizers().iter() {
        let b = n.boundaries();
        writeln!(
            out,
            "Normalizer for feature {} ({}): [{:.3} --- {:.3}][{:.3} --- {:.3}][{:.3} --- {:.3}]",
            n.column(),
            names.get(n.column()).map_or("?", String::as_str),
            b.min_small,
            b.min_medium,
            b.min_medium,
            b.max_medium,
            b.max_medium,
            b.max_large
        )?;
    }
    Ok(())
}

/// The reference table, grouped by label.
pub fn write_table(out: &mut impl Write, classifier: &Classifier) -> io::Result<()> {
    let table = classifier.table();
    for label in table.labels() {
        writeln!(out, "== Category: {label} ==")?;
        for exemplar in table.exemplars_for(label) {
            writeln!(out, "  {} {}", exemplar.name(), format_vector(&exemplar.vector))?;
        }
    }
    Ok(())
}

/// Plausibility of every exemplar and the detected one.
pub fn write_outcome(out: &mut impl Write, classifier: &Classifier, outcome: &RowOutcome) -> io::Result<()> {
    for exemplar in classifier.table().exemplars() {
        writeln!(
            out,
            "Plausibility of {}: {:.4}",
            exemplar.name(),
            outcome.plausibilities[exemplar.index]
        )?;
    }
    write!(
        out,
        "=> Detected category for input vector {}: {}",
        outcome.row, outcome.best_name
    )?;
    match &outcome.known_label {
        Some(known) => writeln!(out, " (labeled {known})"),
        None => writeln!(out),
    }
}

pub fn write_row_error(out: &mut impl Write, row: usize, error: &ClassifierError) -> io::Result<()> {
    writeln!(out, "=> Input vector {row} could not be classified: {error}")
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FeatureReport<'a> {
    pub name: &'a str,
    pub boundaries: &'a Boundaries,
}

#[derive(Debug, Serialize)]
pub struct ExemplarReport<'a> {
    pub index: usize,
    pub name: String,
    pub label: &'a str,
    pub vector: &'a [Category],
    pub source_row: usize,
}

#[derive(Debug, Serialize)]
pub struct RowReport<'a> {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'a RowOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a run produced, as one serializable document.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub features: Vec<FeatureReport<'a>>,
    pub exemplars: Vec<ExemplarReport<'a>>,
    pub rows: Vec<RowReport<'a>>,
}

impl<'a> Report<'a> {
    pub fn new(classifier: &'a Classifier, results: &'a [(usize, Result<RowOutcome>)]) -> Self {
        let names = &classifier.dataset().feature_names;
        let features = classifier
            .normalizers()
            .iter()
            .map(|n| FeatureReport {
                name: names.get(n.column()).map_or("?", String::as_str),
                boundaries: n.boundaries(),
            })
            .collect();

        let exemplars = classifier
            .table()
            .exemplars()
            .iter()
            .map(|e| ExemplarReport {
                index: e.index,
                name: e.name(),
                label: &e.label,
                vector: &e.vector,
                source_row: e.source_row,
            })
            .collect();

        let rows = results
            .iter()
            .map(|(row, result)| match result {
                Ok(outcome) => RowReport {
                    row: *row,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => RowReport {
                    row: *row,
                    outcome: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Self {
            features,
            exemplars,
            rows,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::RowSelection;
    use crate::data::model::{Dataset, FeatureMatrix, LabelAssignment};
    use crate::normalizer::BoundarySource;

    fn classifier() -> Classifier {
        let raw = FeatureMatrix::new(vec![vec![10.0, 1.0], vec![20.0, 2.0], vec![30.0, 3.0]]).unwrap();
        let labels = LabelAssignment::from_pairs([("joy", vec![0]), ("anger", vec![2])]).unwrap();
        let ds = Dataset::new(vec!["eye".into(), "mouth".into()], raw, labels).unwrap();
        Classifier::fit(ds, BoundarySource::AllRows).unwrap()
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_table() {
        let c = classifier();
        let text = render(|out| write_table(out, &c));
        assert_eq!(
            text,
            "== Category: joy ==\n  joy_0 [1, 1]\n== Category: anger ==\n  anger_0 [3, 3]\n"
        );
    }

    #[test]
    fn test_write_outcome() {
        let c = classifier();
        let outcome = c.classify_row(2).unwrap();
        let text = render(|out| write_outcome(out, &c, &outcome));
        assert!(text.contains("Plausibility of anger_0: 1.0000"));
        assert!(text.ends_with("=> Detected category for input vector 2: anger_0 (labeled anger)\n"));
    }

    #[test]
    fn test_json_report_marks_failed_rows() {
        let c = classifier();
        let results = c.classify(RowSelection::All);
        let json: serde_json::Value =
            serde_json::from_str(&Report::new(&c, &results).to_json().unwrap()).unwrap();

        assert_eq!(json["exemplars"][1]["name"], "anger_0");
        assert_eq!(json["features"][0]["name"], "eye");
        // row 1 is medium on both features, which no exemplar shares
        assert!(json["rows"][1]["error"].as_str().unwrap().contains("no usable evidence"));
        assert_eq!(json["rows"][0]["outcome"]["best_label"], "joy");
        assert_eq!(json["rows"][0]["outcome"]["hit_lists"][0], serde_json::json!([1, 0]));
    }
}
