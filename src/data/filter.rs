use serde::{Deserialize, Serialize};

use super::model::Dataset;

// ---------------------------------------------------------------------------
// Row selection: which rows are classified as queries
// ---------------------------------------------------------------------------

/// Which rows of a dataset are run through the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RowSelection {
    /// Every row, pre-classified ones included.
    #[default]
    All,
    /// Rows without a ground-truth label.
    Unlabeled,
    /// Ground-truth rows only, useful to check the classifier against itself.
    Labeled,
}

/// Indices of the rows passing `selection`, in row order.
pub fn selected_rows(dataset: &Dataset, selection: RowSelection) -> Vec<usize> {
    (0..dataset.len())
        .filter(|&row| match selection {
            RowSelection::All => true,
            RowSelection::Unlabeled => !dataset.labels.is_labeled(row),
            RowSelection::Labeled => dataset.labels.is_labeled(row),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FeatureMatrix, LabelAssignment};

    fn dataset() -> Dataset {
        let raw = FeatureMatrix::new(vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        let labels = LabelAssignment::from_pairs([("joy", vec![2]), ("fear", vec![0])]).unwrap();
        Dataset::new(vec!["eye".into()], raw, labels).unwrap()
    }

    #[test]
    fn test_selected_rows() {
        let ds = dataset();
        assert_eq!(selected_rows(&ds, RowSelection::All), vec![0, 1, 2, 3]);
        assert_eq!(selected_rows(&ds, RowSelection::Unlabeled), vec![1, 3]);
        assert_eq!(selected_rows(&ds, RowSelection::Labeled), vec![0, 2]);
    }
}
