//! Interceptors shipped with the crate.

mod duplicate;
mod invalidate;
mod logging;
mod metering;
pub mod statement;

pub use duplicate::WriteDuplicator;
pub use invalidate::InvalidateOnWrite;
pub use logging::TracingInterceptor;
pub use metering::MetricsInterceptor;
