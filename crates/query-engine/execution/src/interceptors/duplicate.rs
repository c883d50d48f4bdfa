use query_engine_sql::sql::Query;

use super::statement::{write_target, WriteKind};
use crate::error::Error;
use crate::interceptor::{Execution, Interceptor, Next};

/// Copies every successful `INSERT INTO <from>` into `<to>` by re-issuing the statement with
/// the table swapped.
///
/// The copy goes straight to the driver, so no interceptor sees it. The caller gets the result
/// of the original insert; a failed copy fails the query.
#[derive(Debug, Clone)]
pub struct WriteDuplicator {
    from: String,
    to: String,
}

impl WriteDuplicator {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        WriteDuplicator {
            from: from.into(),
            to: to.into(),
        }
    }

    fn copy_of(&self, query: &Query) -> Option<Query> {
        let target = write_target(&query.sql)?;
        if target.kind != WriteKind::Insert || !target.table.eq_ignore_ascii_case(&self.from) {
            return None;
        }
        let mut sql = query.sql.clone();
        sql.replace_range(target.span, &self.to);
        Some(Query {
            sql,
            params: query.params.clone(),
        })
    }
}

impl Interceptor for WriteDuplicator {
    fn intercept(&self, mut next: Next<'_>, query: Query) -> Result<Execution, Error> {
        let copy = self.copy_of(&query);
        let execution = next.run(query)?;
        if let Some(copy) = copy {
            tracing::debug!(from = %self.from, to = %self.to, "duplicating insert");
            next.bypass(&copy)?;
        }
        Ok(execution)
    }
}
