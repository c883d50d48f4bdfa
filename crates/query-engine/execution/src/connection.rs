//! A session on one database: the driver, its transaction stack and the metadata of the last
//! statement it ran.

use std::collections::VecDeque;
use std::time::Duration;

use query_engine_sql::sql::helpers::{self, Record, SearchOptions, Statement};
use query_engine_sql::sql::{Params, Value};

use crate::cursor::RowCursor;
use crate::driver::{Driver, Row};
use crate::error::Error;
use crate::executor;
use crate::interceptor::{Execution, InterceptorChain, SessionInfo};
use crate::transaction::{Boundary, TransactionStack, TransactionState};

/// What the most recent statement left behind.
#[derive(Debug, Default)]
struct LastStatement {
    rows: VecDeque<Row>,
    rows_affected: u64,
    elapsed: Duration,
}

/// A live connection to one destination.
///
/// All queries, transaction boundaries included, go through the shared interceptor chain.
/// Once disconnected, every operation that needs the database fails with
/// [`Error::NotConnected`].
pub struct Connection {
    session: SessionInfo,
    driver: Option<Box<dyn Driver>>,
    interceptors: InterceptorChain,
    transactions: TransactionStack,
    last: Option<LastStatement>,
}

impl Connection {
    pub fn new(session: SessionInfo, driver: Box<dyn Driver>, interceptors: InterceptorChain) -> Self {
        Connection {
            session,
            driver: Some(driver),
            interceptors,
            transactions: TransactionStack::new(),
            last: None,
        }
    }

    pub fn destination(&self) -> Option<&str> {
        self.session.destination.as_deref()
    }

    pub fn dsn(&self) -> &str {
        &self.session.dsn
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    fn run(&mut self, sql: &str, params: Params) -> Result<Execution, Error> {
        let driver = self.driver.as_deref_mut().ok_or(Error::NotConnected)?;
        let execution = executor::execute(&self.interceptors, driver, &self.session, sql, params)?;
        Ok(execution)
    }

    fn record(&mut self, execution: Execution) -> &mut LastStatement {
        self.last.insert(LastStatement {
            rows: execution.result.rows.into(),
            rows_affected: execution.result.rows_affected,
            elapsed: execution.elapsed,
        })
    }

    /// Execute a statement and return the number of rows it affected.
    pub fn execute(&mut self, sql: &str, params: Params) -> Result<u64, Error> {
        let execution = self.run(sql, params)?;
        Ok(self.record(execution).rows_affected)
    }

    /// Execute a query and return all of its rows.
    pub fn rows(&mut self, sql: &str, params: Params) -> Result<Vec<Row>, Error> {
        let execution = self.run(sql, params)?;
        let last = self.record(execution);
        Ok(std::mem::take(&mut last.rows).into())
    }

    /// Execute a query and return its first row, if there is one.
    pub fn row(&mut self, sql: &str, params: Params) -> Result<Option<Row>, Error> {
        let execution = self.run(sql, params)?;
        Ok(self.record(execution).rows.pop_front())
    }

    /// Execute a query and return the first column of its first row.
    pub fn value(&mut self, sql: &str, params: Params) -> Result<Option<Value>, Error> {
        Ok(self
            .row(sql, params)?
            .and_then(|row| row.into_iter().next())
            .map(|(_, value)| value))
    }

    /// Execute a query and return a cursor that can be iterated once.
    pub fn cursor(&mut self, sql: &str, params: Params) -> Result<RowCursor, Error> {
        let execution = self.run(sql, params)?;
        let last = self.record(execution);
        Ok(RowCursor::new(std::mem::take(&mut last.rows)))
    }

    fn execute_statement(&mut self, statement: Statement) -> Result<u64, Error> {
        self.execute(&statement.sql, statement.params)
    }

    /// Insert one record. Returns the number of rows affected.
    pub fn insert(&mut self, table: &str, record: &Record) -> Result<u64, Error> {
        self.execute_statement(helpers::insert(table, record)?)
    }

    /// Insert or replace one record. Returns the number of rows affected.
    pub fn replace(&mut self, table: &str, record: &Record) -> Result<u64, Error> {
        self.execute_statement(helpers::replace(table, record)?)
    }

    /// Update the rows matching every column of `filter`.
    pub fn update(&mut self, table: &str, set: &Record, filter: &Record) -> Result<u64, Error> {
        self.execute_statement(helpers::update(table, set, filter)?)
    }

    pub fn search(
        &mut self,
        table: &str,
        condition: &str,
        params: Params,
        options: &SearchOptions,
    ) -> Result<Vec<Row>, Error> {
        let statement = helpers::search(table, condition, params, options);
        self.rows(&statement.sql, statement.params)
    }

    fn boundary(&mut self, boundary: Option<Boundary>) -> Result<(), Error> {
        if let Some(boundary) = boundary {
            let execution = self.run(boundary.sql(), Params::none())?;
            self.record(execution);
        }
        Ok(())
    }

    /// Open a transaction. Only the outermost one reaches the database.
    pub fn begin(&mut self) -> Result<(), Error> {
        self.boundary(self.transactions.plan_begin())?;
        self.transactions.finish_begin();
        tracing::debug!(depth = self.transactions.depth(), "begin");
        Ok(())
    }

    /// Commit the innermost transaction.
    ///
    /// The outermost commit fails with [`Error::TransactionIntegrity`] if a nested transaction
    /// was rolled back; the transaction then stays open so it can be rolled back.
    pub fn commit(&mut self) -> Result<(), Error> {
        self.boundary(self.transactions.plan_commit()?)?;
        self.transactions.finish_commit();
        tracing::debug!(depth = self.transactions.depth(), "commit");
        Ok(())
    }

    /// Roll back the innermost transaction.
    ///
    /// A nested rollback does not reach the database; it makes the outermost commit fail.
    pub fn rollback(&mut self) -> Result<(), Error> {
        self.boundary(self.transactions.plan_rollback())?;
        self.transactions.finish_rollback();
        tracing::debug!(depth = self.transactions.depth(), "rollback");
        Ok(())
    }

    /// Run `work` inside a transaction: commit if it succeeds, roll back if it fails or the
    /// commit is refused.
    pub fn transaction<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<Error>,
    {
        self.begin()?;
        let outcome = work(self).and_then(|value| {
            self.commit()?;
            Ok(value)
        });
        if outcome.is_err() {
            if let Err(err) = self.rollback() {
                tracing::error!(
                    meta.signal_type = "log",
                    event.domain = crate::EVENT_DOMAIN,
                    event.name = "Rollback failed",
                    name = "Rollback failed",
                    body = %err,
                    dsn = %self.session.dsn,
                    error = true,
                );
            }
        }
        outcome
    }

    pub fn transaction_depth(&self) -> usize {
        self.transactions.depth()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transactions.state()
    }

    /// The id generated by the most recent insert.
    pub fn last_insert_id(&mut self) -> Result<Option<i64>, Error> {
        let driver = self.driver.as_deref_mut().ok_or(Error::NotConnected)?;
        Ok(driver.last_insert_id()?)
    }

    /// Rows affected by the most recent statement, `0` before the first one.
    pub fn row_count(&self) -> u64 {
        self.last.as_ref().map_or(0, |last| last.rows_affected)
    }

    /// Driver time of the most recent statement.
    pub fn last_exec_time(&self) -> Option<Duration> {
        self.last.as_ref().map(|last| last.elapsed)
    }

    /// Close the connection. Fails while a transaction is open; disconnecting twice is a no-op.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if self.transactions.depth() > 0 {
            return Err(Error::TransactionState);
        }
        self.last = None;
        match self.driver.take() {
            None => Ok(()),
            Some(mut driver) => {
                tracing::debug!(dsn = %self.session.dsn, "disconnect");
                Ok(driver.close()?)
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("connected", &self.is_connected())
            .field("transactions", &self.transactions)
            .finish_non_exhaustive()
    }
}
