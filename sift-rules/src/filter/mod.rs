//! Filter compilation: rule-driven conditions, composition and ordering.

mod compose;
mod condition;
mod order_by;
pub(crate) mod scan;

pub use compose::{compose, Condition};
pub use condition::{
    build_conditions, compile_filters, resolve_column, CompiledFilters, ConditionFragment, Value,
};
pub use order_by::compile_order_by;
