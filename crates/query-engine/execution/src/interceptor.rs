//! The interceptor chain.
//!
//! Every query a connection executes (transaction boundaries included) runs through the
//! registered interceptors before it reaches the driver. The first registered interceptor is
//! the outermost: it runs first, and its call to [`Next::run`] invokes the second one, and so
//! on, until the last one's `Next::run` calls the driver.
//!
//! An interceptor may pass the query through, change the query or the result, skip
//! `Next::run` entirely (serving a result from elsewhere), or issue further statements with
//! [`Next::bypass`], which goes straight to the driver without re-entering the chain.
//!
//! Interceptors are shared by every connection of a registry. Any state an interceptor keeps
//! (a cache it invalidates, say) is its own to synchronise.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use query_engine_sql::sql::Query;

use crate::driver::{Driver, ResultSet};
use crate::error::Error;

/// A statement's result together with the time the driver spent on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    pub result: ResultSet,
    /// Wall-clock time of the driver call only, excluding interceptors.
    pub elapsed: Duration,
}

impl Execution {
    /// A result produced without touching the driver.
    pub fn synthetic(result: ResultSet) -> Self {
        Execution {
            result,
            elapsed: Duration::ZERO,
        }
    }

    pub fn rows_affected(&self) -> u64 {
        self.result.rows_affected
    }
}

/// What an interceptor can know about the connection a query runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// The destination the connection was requested for, `None` for the default one.
    pub destination: Option<String>,
    pub dsn: String,
}

/// A unit of cross-cutting logic wrapped around query execution.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, next: Next<'_>, query: Query) -> Result<Execution, Error>;
}

/// The rest of the chain, ending in the driver.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Interceptor>],
    driver: &'a mut (dyn Driver + 'static),
    session: &'a SessionInfo,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        chain: &'a [Arc<dyn Interceptor>],
        driver: &'a mut (dyn Driver + 'static),
        session: &'a SessionInfo,
    ) -> Self {
        Next {
            remaining: chain,
            driver,
            session,
        }
    }

    /// Hand the query to the next interceptor, or to the driver if this is the last one.
    pub fn run(&mut self, query: Query) -> Result<Execution, Error> {
        match self.remaining.split_first() {
            Some((interceptor, rest)) => interceptor.intercept(
                Next {
                    remaining: rest,
                    driver: &mut *self.driver,
                    session: self.session,
                },
                query,
            ),
            None => raw_execute(&mut *self.driver, &query),
        }
    }

    /// Execute a statement directly against the driver, skipping every interceptor.
    pub fn bypass(&mut self, query: &Query) -> Result<Execution, Error> {
        raw_execute(&mut *self.driver, query)
    }

    pub fn session(&self) -> &SessionInfo {
        self.session
    }
}

/// The innermost call into the driver. Only this call is timed.
pub fn raw_execute(driver: &mut dyn Driver, query: &Query) -> Result<Execution, Error> {
    let started = Instant::now();
    let result = driver.execute(query);
    let elapsed = started.elapsed();

    match result {
        Ok(result) => Ok(Execution { result, elapsed }),
        Err(source) => Err(Error::QueryFailed {
            sql: query.sql.clone(),
            source,
        }),
    }
}

/// The ordered set of registered interceptors.
///
/// Cloning yields another handle to the same registrations, so adding or clearing through any
/// handle affects every connection holding one. Registration is expected to happen during
/// setup; the chain is snapshotted at the start of every query.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<RwLock<Vec<Arc<dyn Interceptor>>>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor. It wraps every interceptor registered after it.
    pub fn register(&self, interceptor: impl Interceptor + 'static) {
        self.register_shared(Arc::new(interceptor));
    }

    pub fn register_shared(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(interceptor);
    }

    pub fn clear(&self) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Interceptor>> {
        self.interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a query through every registered interceptor and finally the driver.
    pub fn execute(
        &self,
        driver: &mut (dyn Driver + 'static),
        session: &SessionInfo,
        query: Query,
    ) -> Result<Execution, Error> {
        let chain = self.snapshot();
        Next::new(&chain, driver, session).run(query)
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.len())
            .finish()
    }
}

/// An interceptor backed by a closure.
pub struct FnInterceptor<F>(F);

/// Build an interceptor from a closure taking the continuation and the query.
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: for<'a> Fn(Next<'a>, Query) -> Result<Execution, Error> + Send + Sync,
{
    FnInterceptor(f)
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: for<'a> Fn(Next<'a>, Query) -> Result<Execution, Error> + Send + Sync,
{
    fn intercept(&self, next: Next<'_>, query: Query) -> Result<Execution, Error> {
        (self.0)(next, query)
    }
}
