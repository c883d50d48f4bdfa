//! Forward-only, single-pass result cursors.

use std::collections::VecDeque;

use crate::driver::Row;
use crate::error::Error;

/// The rows of one executed statement, iterable exactly once.
#[derive(Debug, Default)]
pub struct RowCursor {
    rows: VecDeque<Row>,
    started: bool,
}

impl RowCursor {
    pub fn new(rows: impl Into<VecDeque<Row>>) -> Self {
        RowCursor {
            rows: rows.into(),
            started: false,
        }
    }

    /// Start iterating. Fails if iteration was started before, even if it was not finished.
    pub fn iterate(&mut self) -> Result<RowIter<'_>, Error> {
        if self.started {
            return Err(Error::IterationReuse);
        }
        self.started = true;
        Ok(RowIter {
            cursor: self,
            position: 0,
        })
    }

    /// Rows not consumed yet.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

/// Iterator over a [`RowCursor`], yielding each row with its position.
#[derive(Debug)]
pub struct RowIter<'a> {
    cursor: &'a mut RowCursor,
    position: usize,
}

impl Iterator for RowIter<'_> {
    type Item = (usize, Row);

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.cursor.rows.pop_front()?;
        let position = self.position;
        self.position += 1;
        Some((position, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.rows.len(), Some(self.cursor.rows.len()))
    }
}
