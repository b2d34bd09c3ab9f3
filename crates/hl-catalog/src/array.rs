//! In-memory block of dataset values.

use hl_core::Point2;

/// A row-major block of values read from one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayChunk {
    /// Shape of this block (not of the whole dataset).
    pub shape: Vec<usize>,
    /// Index of the block's first row within the dataset.
    pub row_offset: usize,
    pub data: Vec<f64>,
}

impl ArrayChunk {
    pub fn new(shape: Vec<usize>, row_offset: usize, data: Vec<f64>) -> Self {
        Self {
            shape,
            row_offset,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    pub fn row_width(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let w = self.row_width();
        let start = i.checked_mul(w)?;
        self.data.get(start..start + w)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let w = self.row_width();
        if col >= w {
            return None;
        }
        self.data.get(row * w + col).copied()
    }

    /// Values of one column, in row order.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows()).filter_map(|r| self.get(r, col)).collect()
    }

    /// Interpret an `[n, >=2]` block as planar points (first two columns).
    pub fn to_points(&self) -> Option<Vec<Point2>> {
        if self.shape.len() != 2 || self.row_width() < 2 {
            return None;
        }
        Some(
            (0..self.rows())
                .filter_map(|r| self.row(r).map(|row| Point2::new(row[0], row[1])))
                .collect(),
        )
    }

    /// Append another chunk of the same row width below this one.
    pub fn append(&mut self, other: ArrayChunk) {
        if self.shape.is_empty() {
            *self = other;
            return;
        }
        let rows = self.rows() + other.rows();
        self.data.extend(other.data);
        self.shape[0] = rows;
    }
}
