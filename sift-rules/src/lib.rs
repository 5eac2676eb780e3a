// =============================================================================
// CRATE-LEVEL QUALITY LINTS (following Tokio/Serde standards)
// =============================================================================
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
// =============================================================================
// CLIPPY CONFIGURATION
// =============================================================================
// Pedantic lints that are too verbose to fix individually in a rules-heavy crate
#![allow(clippy::doc_markdown)] // Code items in docs - extensive doc changes needed
#![allow(clippy::missing_errors_doc)] // # Errors sections - doc-heavy
#![allow(clippy::missing_panics_doc)] // # Panics sections - doc-heavy
#![allow(clippy::module_name_repetitions)] // Type names matching module - acceptable
#![allow(clippy::return_self_not_must_use)] // Builder pattern methods return Self by design
#![allow(clippy::must_use_candidate)] // Builder methods - fluent API doesn't need must_use
#![allow(clippy::match_same_arms)] // Intentional for clarity in some match expressions
#![allow(clippy::format_push_string)] // String building style preference
#![allow(clippy::cast_precision_loss)] // Numeric bounds compared as f64 by design
#![allow(clippy::struct_excessive_bools)] // Capability snapshots are flag sets

//! # sift-rules - Declarative validation & query-filter compilation
//!
//! One rule map per API field drives three things at once: how the field's
//! value is **validated**, how a user-supplied filter expression on the field
//! compiles into a **parameterized boolean condition**, and how the field can
//! be **sorted**. The crate is a pure, synchronous library: it never touches
//! a database. A downstream query builder receives the composed expression
//! plus its `:name` parameter bindings and executes them.
//!
//! ## Quick Start
//!
//! ```
//! use miniserde::json::{Object, Value};
//! use sift_rules::prelude::*;
//!
//! // One rule map, declared once per endpoint.
//! let rules = RuleMap::new()
//!     .with("name", Rule::string())
//!     .with("age", Rule::integer())
//!     .with("active", Rule::boolean());
//! let rules = prepare_rules_for_search(&rules, Some(&SearchValidators::new()));
//!
//! // Raw request input (the boundary layer parses the transport).
//! let mut data = Object::new();
//! data.insert("name".to_string(), Value::String("%ada%".to_string()));
//! data.insert("age".to_string(), Value::String("18|65".to_string()));
//!
//! // 1. Validate.
//! let errors = Validator::with_prefix("search.").validate(&data, &rules);
//! assert!(errors.is_empty());
//!
//! // 2. Compile filters.
//! let compiled = compile_filters(&data, &rules, "t").unwrap();
//! let where_clause = compiled.compose().unwrap();
//! assert!(where_clause.contains("t.age BETWEEN :tage1 AND :tage2"));
//!
//! // 3. Compile ordering.
//! let order = compile_order_by(Some("name|DESC"), &rules, "t").unwrap();
//! assert_eq!(order.as_deref(), Some("t.name DESC"));
//! ```
//!
//! ## Filter micro-grammar
//!
//! | Shape | Example | Condition |
//! |-------|---------|-----------|
//! | range | `10\|20` | `col BETWEEN :p1 AND :p2` |
//! | comparison | `>=18`, `<5` | `col >= :p1`, `col < :p1` |
//! | negation | `!5` | `col <> :p1` |
//! | wildcard | `%abc%` | `UPPER(UNACCENT(col)) LIKE UPPER(UNACCENT(:p1))` |
//! | list | `a,b,"c,d"` | `col IN (:p1)` |
//! | plain | `abc` | `col = :p1` |
//!
//! Operator precedence is fixed (range, `<=`/`>=`, `<`/`>`, `!`, wildcard,
//! plain) and each operator only applies where the field's rule allows it.
//!
//! ## Concurrency
//!
//! Rule maps are read-only after preparation; prepare them once per endpoint
//! (e.g. in a `std::sync::OnceLock`) and share them freely. Validation and
//! compilation are stateless per call.

mod filter;
mod rules;
mod validate;

pub use filter::{
    build_conditions, compile_filters, compile_order_by, compose, resolve_column, CompiledFilters,
    Condition, ConditionFragment, Value,
};
pub use rules::{
    prepare_rules_for_search, BetweenOperand, ChoiceGroup, ConditionCallback, CustomValidator,
    FieldType, Predicate, Rule, RuleMap, RuleShape, SortColumn,
};
pub use validate::{
    CommonValidators, ConfigError, FieldError, FieldTable, SearchValidators, ValidationErrors,
    Validator, DEFAULT_DATE_FMT,
};

/// Re-export miniserde's json module: input data maps are
/// `miniserde::json::Object` values.
///
/// ```
/// use sift_rules::json;
///
/// let value: json::Value = json::from_str(r#"{"age": "18|65"}"#).unwrap();
/// ```
pub use miniserde::json;

/// Prelude module for convenient imports.
///
/// ```
/// use sift_rules::prelude::*;
///
/// let rules = RuleMap::new().with("id", Rule::integer());
/// let prepared = prepare_rules_for_search(&rules, None);
/// assert!(prepared.contains("orderBy"));
/// ```
pub mod prelude {
    pub use crate::{
        build_conditions, compile_filters, compile_order_by, compose, prepare_rules_for_search,
        resolve_column, BetweenOperand, ChoiceGroup, CommonValidators, CompiledFilters, Condition,
        ConditionCallback, ConditionFragment, ConfigError, CustomValidator, FieldError, FieldTable,
        FieldType, Predicate, Rule, RuleMap, RuleShape, SearchValidators, SortColumn,
        ValidationErrors, Validator, Value, DEFAULT_DATE_FMT,
    };
}

// ============================================================================
// API Contract Tests (compile-time assertions)
// ============================================================================
