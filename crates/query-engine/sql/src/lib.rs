//! SQL text and parameter handling: the values we bind, the parameter sets callers hand us,
//! list-placeholder expansion and the small statement builders used by the convenience
//! operations of a connection.

pub mod sql;
