//! Common functions used across test cases.

pub mod fake;
pub mod helpers;
