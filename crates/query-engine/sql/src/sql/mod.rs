//! SQL text, parameters and their expansion.

pub mod expand;
pub mod helpers;
pub mod params;
pub mod scan;
pub mod value;

pub use expand::{expand, ExpandError};
pub use params::{BoundParams, ListKey, Param, ParamList, Params, ParamsError, Query};
pub use value::Value;
