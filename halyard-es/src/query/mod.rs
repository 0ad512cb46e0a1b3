//! Query and aggregation DSL

mod types;

pub use types::*;
