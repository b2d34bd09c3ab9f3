//! Bounded, cancelable bulk reads.

use std::ops::Range;

use hl_core::CancelToken;
use tracing::debug;

use crate::array::ArrayChunk;
use crate::error::{CatalogError, CatalogResult};
use crate::handle::CatalogHandle;
use crate::node::CatalogNode;
use crate::selection::Selection;

/// Default rows per chunk for bulk reads.
pub const DEFAULT_CHUNK_ROWS: usize = 4096;

/// Iterator over a dataset in fixed row blocks.
///
/// The cancellation token is checked before every block; once it fires the
/// iterator yields one `Cancelled` error and then ends.
#[derive(Debug)]
pub struct ChunkedReader<'a> {
    handle: &'a CatalogHandle,
    path: String,
    total_rows: usize,
    rank: usize,
    chunk_rows: usize,
    next_row: usize,
    cols: Option<Range<usize>>,
    cancel: CancelToken,
    done: bool,
}

impl<'a> ChunkedReader<'a> {
    pub(crate) fn new(
        handle: &'a CatalogHandle,
        node: &CatalogNode,
        chunk_rows: usize,
        cancel: CancelToken,
    ) -> CatalogResult<Self> {
        if chunk_rows == 0 {
            return Err(CatalogError::InvalidSelection {
                path: node.path.clone(),
                reason: "chunk size must be at least one row".to_string(),
            });
        }
        Ok(Self {
            handle,
            path: node.path.clone(),
            total_rows: node.shape.first().copied().unwrap_or(1),
            rank: node.shape.len(),
            chunk_rows,
            next_row: 0,
            cols: None,
            cancel,
            done: false,
        })
    }

    /// Restrict each block to a column range of a 2-D dataset.
    pub fn columns(mut self, cols: Range<usize>) -> Self {
        self.cols = Some(cols);
        self
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Drain the reader into one block.
    pub fn collect_all(self) -> CatalogResult<ArrayChunk> {
        let mut out: Option<ArrayChunk> = None;
        for chunk in self {
            let chunk = chunk?;
            match out.as_mut() {
                Some(acc) => acc.append(chunk),
                None => out = Some(chunk),
            }
        }
        Ok(out.unwrap_or_else(|| ArrayChunk::new(vec![0], 0, Vec::new())))
    }

    fn selection(&self, rows: Range<usize>) -> Selection {
        match &self.cols {
            Some(cols) => Selection::Block {
                rows,
                cols: cols.clone(),
            },
            None if self.rank == 0 => Selection::All,
            None => Selection::Rows(rows),
        }
    }
}

impl Iterator for ChunkedReader<'_> {
    type Item = CatalogResult<ArrayChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_row >= self.total_rows {
            return None;
        }
        if let Err(e) = self.cancel.check() {
            self.done = true;
            return Some(Err(e.into()));
        }
        let end = (self.next_row + self.chunk_rows).min(self.total_rows);
        let rows = self.next_row..end;
        debug!(path = %self.path, start = rows.start, end = rows.end, "read chunk");
        let selection = self.selection(rows);
        self.next_row = end;
        let result = self.handle.read_array(&self.path, Some(&selection));
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
