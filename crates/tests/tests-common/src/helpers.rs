//! Helpers used across test cases.

/// Route `tracing` events through `env_logger`, captured per test. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
