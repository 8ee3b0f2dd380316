use serde::{Serialize, Serializer};

use crate::data::model::Category;
use crate::error::{ClassifierError, Result};
use crate::reference::ReferenceTable;

/// Which exemplars share the query's category on one column, aligned to the
/// table's global exemplar index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HitList {
    hits: Vec<bool>,
}

impl HitList {
    pub fn from_bools(hits: Vec<bool>) -> Self {
        Self { hits }
    }

    /// Compare `query[column]` against every exemplar's value at `column`.
    ///
    /// Categories are discrete, so plain equality is exact here.
    pub fn generate(query: &[Category], table: &ReferenceTable, column: usize) -> Result<Self> {
        let wanted = *query.get(column).ok_or(ClassifierError::ColumnOutOfRange {
            column,
            columns: query.len(),
        })?;

        let hits = table
            .exemplars()
            .iter()
            .map(|e| {
                e.vector
                    .get(column)
                    .map(|&c| c == wanted)
                    .ok_or(ClassifierError::ColumnOutOfRange {
                        column,
                        columns: e.vector.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { hits })
    }

    pub fn is_hit(&self, index: usize) -> bool {
        self.hits.get(index).copied().unwrap_or(false)
    }

    /// Global indices flagged as hits.
    pub fn hit_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.hits.iter().enumerate().filter(|&(_, &h)| h).map(|(i, _)| i)
    }

    pub fn hit_count(&self) -> usize {
        self.hits.iter().filter(|&&h| h).count()
    }

    pub fn as_bools(&self) -> &[bool] {
        &self.hits
    }

    /// The list as `0`/`1` indicators, e.g. `[1, 0, 1]`.
    pub fn to_indicators(&self) -> Vec<u8> {
        self.hits.iter().map(|&h| u8::from(h)).collect()
    }

    /// Length, always the table's exemplar count.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl Serialize for HitList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_indicators().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{LabelAssignment, NormalizedMatrix};

    fn table() -> ReferenceTable {
        let normalized = NormalizedMatrix::from_ids(&[&[2, 2], &[2, 2], &[3, 1]]).unwrap();
        let labels =
            LabelAssignment::from_pairs([("joy", vec![0, 1]), ("anger", vec![2])]).unwrap();
        ReferenceTable::build(&normalized, &labels).unwrap()
    }

    #[test]
    fn test_hit_list_matches_column_category() {
        let query = [Category::Medium, Category::Medium];
        let hits = HitList::generate(&query, &table(), 0).unwrap();
        assert_eq!(hits.to_indicators(), vec![1, 0]);
        assert_eq!(hits.hit_indices().collect::<Vec<_>>(), vec![0]);
        assert_eq!(hits.hit_count(), 1);
    }

    #[test]
    fn test_hit_list_length_is_exemplar_count() {
        let table = table();
        for a in Category::ALL {
            for b in Category::ALL {
                for column in 0..2 {
                    let hits = HitList::generate(&[a, b], &table, column).unwrap();
                    assert_eq!(hits.len(), table.len());
                }
            }
        }
    }

    #[test]
    fn test_second_column() {
        let hits = HitList::generate(&[Category::Small, Category::Small], &table(), 1).unwrap();
        assert_eq!(hits.to_indicators(), vec![0, 1]);
    }

    #[test]
    fn test_column_out_of_range() {
        assert!(matches!(
            HitList::generate(&[Category::Small], &table(), 1),
            Err(ClassifierError::ColumnOutOfRange { column: 1, columns: 1 })
        ));
    }

    #[test]
    fn test_serializes_as_indicators() {
        let hits = HitList::from_bools(vec![true, false, true]);
        assert_eq!(serde_json::to_string(&hits).unwrap(), "[1,0,1]");
    }
}
