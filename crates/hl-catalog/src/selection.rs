//! Slice specifications for bounded dataset reads.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Which part of a dataset to read.
///
/// Rows index dimension 0; columns index dimension 1 of 2-D datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    #[default]
    All,
    Rows(Range<usize>),
    Block { rows: Range<usize>, cols: Range<usize> },
}

/// A selection checked against a concrete shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub rows: Range<usize>,
    /// Column range within one row (flattened trailing dimensions).
    pub cols: Range<usize>,
    /// Number of values in one full row of the dataset.
    pub row_width: usize,
    /// Shape of the selected block.
    pub out_shape: Vec<usize>,
}

impl ResolvedSelection {
    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the selection covers whole rows.
    pub fn full_rows(&self) -> bool {
        self.cols.start == 0 && self.cols.end == self.row_width
    }
}

impl Selection {
    /// A single column of a 2-D dataset over a row range.
    pub fn column(rows: Range<usize>, col: usize) -> Self {
        Selection::Block {
            rows,
            cols: col..col + 1,
        }
    }

    /// Check the selection against `shape`.
    pub fn resolve(&self, shape: &[usize]) -> Result<ResolvedSelection, String> {
        let n_rows = shape.first().copied().unwrap_or(1);
        let row_width: usize = shape.iter().skip(1).product();
        let trailing: Vec<usize> = shape.iter().skip(1).copied().collect();

        let (rows, cols) = match self {
            Selection::All => (0..n_rows, 0..row_width),
            Selection::Rows(rows) => (rows.clone(), 0..row_width),
            Selection::Block { rows, cols } => {
                if shape.len() != 2 {
                    return Err(format!(
                        "block selection needs a 2-D dataset, shape is {shape:?}"
                    ));
                }
                (rows.clone(), cols.clone())
            }
        };

        if rows.start > rows.end || rows.end > n_rows {
            return Err(format!("rows {rows:?} out of range 0..{n_rows}"));
        }
        if cols.start > cols.end || cols.end > row_width {
            return Err(format!("columns {cols:?} out of range 0..{row_width}"));
        }

        let out_shape = if shape.is_empty() {
            vec![]
        } else if matches!(self, Selection::Block { .. }) {
            vec![rows.len(), cols.len()]
        } else {
            let mut s = vec![rows.len()];
            s.extend(trailing);
            s
        };

        Ok(ResolvedSelection {
            rows,
            cols,
            row_width,
            out_shape,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_on_matrix() {
        let r = Selection::All.resolve(&[4, 3]).unwrap();
        assert_eq!(r.rows, 0..4);
        assert_eq!(r.cols, 0..3);
        assert_eq!(r.out_shape, vec![4, 3]);
        assert!(r.full_rows());
    }

    #[test]
    fn rows_on_vector() {
        let r = Selection::Rows(2..5).resolve(&[10]).unwrap();
        assert_eq!(r.row_width, 1);
        assert_eq!(r.out_shape, vec![3]);
    }

    #[test]
    fn column_block() {
        let r = Selection::column(0..10, 2).resolve(&[10, 5]).unwrap();
        assert_eq!(r.out_shape, vec![10, 1]);
        assert!(!r.full_rows());
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(Selection::Rows(0..11).resolve(&[10]).is_err());
        assert!(Selection::column(0..2, 5).resolve(&[2, 5]).is_err());
        assert!(
            Selection::Block { rows: 0..1, cols: 0..1 }
                .resolve(&[2, 2, 2])
                .is_err()
        );
    }

    #[test]
    fn scalar_dataset() {
        let r = Selection::All.resolve(&[]).unwrap();
        assert_eq!(r.len(), 1);
        assert!(r.out_shape.is_empty());
    }
}
