//! Nested transactions sharing one physical transaction.
//!
//! Only the outermost `begin` and the outermost `commit`/`rollback` reach the database. A
//! rollback of a nested transaction cannot be undone by the database on its own, so it marks
//! the stack uncommitable and the eventual outermost commit is refused.

use crate::error::Error;

/// A statement that opens or closes the physical transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Begin,
    Commit,
    Rollback,
}

impl Boundary {
    pub fn sql(self) -> &'static str {
        match self {
            Boundary::Begin => "BEGIN",
            Boundary::Commit => "COMMIT",
            Boundary::Rollback => "ROLLBACK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    Active,
    ActiveUncommitable,
}

/// The per-connection transaction stack.
///
/// Each operation comes in two halves: `plan_*` says which statement, if any, must be sent to
/// the database, and `finish_*` updates the stack once that statement succeeded. A failed
/// statement leaves the stack as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionStack {
    depth: usize,
    uncommitable: bool,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_uncommitable(&self) -> bool {
        self.uncommitable
    }

    pub fn state(&self) -> TransactionState {
        match (self.depth, self.uncommitable) {
            (0, _) => TransactionState::Idle,
            (_, false) => TransactionState::Active,
            (_, true) => TransactionState::ActiveUncommitable,
        }
    }

    pub fn plan_begin(&self) -> Option<Boundary> {
        (self.depth == 0).then_some(Boundary::Begin)
    }

    pub fn finish_begin(&mut self) {
        if self.depth == 0 {
            self.uncommitable = false;
        }
        self.depth += 1;
    }

    /// The outermost commit is refused when a nested transaction rolled back.
    pub fn plan_commit(&self) -> Result<Option<Boundary>, Error> {
        if self.depth > 1 {
            return Ok(None);
        }
        if self.uncommitable {
            return Err(Error::TransactionIntegrity);
        }
        Ok(Some(Boundary::Commit))
    }

    pub fn finish_commit(&mut self) {
        self.pop();
    }

    pub fn plan_rollback(&self) -> Option<Boundary> {
        (self.depth <= 1).then_some(Boundary::Rollback)
    }

    pub fn finish_rollback(&mut self) {
        if self.depth > 1 {
            self.uncommitable = true;
        }
        self.pop();
    }

    fn pop(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.uncommitable = false;
        }
    }
}
