//! Declarative per-field rules and their preparation for search requests.

mod prepare;
mod types;

pub use prepare::prepare_rules_for_search;
pub use types::{
    BetweenOperand, ChoiceGroup, ConditionCallback, CustomValidator, FieldType, Predicate, Rule,
    RuleMap, RuleShape, SortColumn,
};
