//! Building parameterized condition fragments from filter values.
//!
//! One rule plus one raw filter value yields one or more
//! [`ConditionFragment`]s; the [`compile_filters`] driver runs every ruled
//! field of a request and assembles the per-field fragments into a
//! [`Condition`] list ready for [`compose`](crate::filter::compose::compose).

use crate::filter::compose::Condition;
use crate::filter::scan::{self, Caps, ScalarOp};
use crate::rules::{FieldType, Rule, RuleMap};
use crate::validate::ConfigError;
use miniserde::json::{Number, Object, Value as JsonValue};

/// SQL parameter values bound to `:name` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    Int(i64),
    /// Double precision float.
    Float(f64),
    /// Text.
    String(String),
    /// Array binding, expanded by the downstream query layer (`IN`).
    Array(Vec<Value>),
}

impl Value {
    /// Convert from a runtime JSON value. Objects have no parameter
    /// representation and yield `None`.
    #[must_use]
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Null => Some(Self::Null),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Number(n) => match n {
                Number::I64(i) => Some(Self::Int(*i)),
                Number::U64(u) => i64::try_from(*u).ok().map(Self::Int),
                Number::F64(f) => Some(Self::Float(*f)),
            },
            JsonValue::String(s) => Some(Self::String(s.clone())),
            JsonValue::Array(arr) => {
                let values: Option<Vec<Self>> = arr.iter().map(Self::from_json).collect();
                values.map(Self::Array)
            },
            JsonValue::Object(_) => None,
        }
    }
}

/// One parameterized boolean expression.
///
/// `expression` contains `:name` placeholders; `params` holds the matching
/// bindings. Parameter names derive from the resolved column (with
/// non-alphanumeric characters stripped) plus a 1-based suffix, so they are
/// collision-free within a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionFragment {
    /// Boolean SQL expression with `:name` placeholders.
    pub expression: String,
    /// Placeholder name → bound value.
    pub params: Vec<(String, Value)>,
}

impl ConditionFragment {
    /// Fragment without parameters.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            params: Vec::new(),
        }
    }

    /// Fragment with its parameter bindings.
    pub fn with_params(expression: impl Into<String>, params: Vec<(String, Value)>) -> Self {
        Self {
            expression: expression.into(),
            params,
        }
    }
}

/// Output of [`compile_filters`]: per-field conditions plus the merged
/// parameter bindings.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    /// One entry per filtered field; multi-fragment fields become
    /// [`Condition::Any`] groups.
    pub conditions: Vec<Condition>,
    /// All parameter bindings across the conditions.
    pub params: Vec<(String, Value)>,
}

impl CompiledFilters {
    /// Render the conditions into one expression (implicit top-level `AND`).
    #[must_use]
    pub fn compose(&self) -> Option<String> {
        crate::filter::compose::compose(&self.conditions)
    }

    /// Whether no field produced a condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Compile every filtered field of a request into conditions.
///
/// Skips the paging/sorting fields (`limit`, `offset`, `orderBy`), fields
/// whose rule sets `ignore_filter`, fields absent from the input and `null`
/// values. Fields present in the input but absent from the rule map are
/// ignored; structural validation happens at the boundary.
///
/// # Errors
///
/// Propagates `ConfigError` from condition callbacks.
///
/// # Example
///
/// ```
/// use miniserde::json::{Object, Value};
/// use sift_rules::prelude::*;
///
/// let rules = prepare_rules_for_search(
///     &RuleMap::new().with("age", Rule::integer()),
///     None,
/// );
/// let mut data = Object::new();
/// data.insert("age".to_string(), Value::String(">=18".to_string()));
///
/// let compiled = compile_filters(&data, &rules, "t").unwrap();
/// assert_eq!(compiled.compose().as_deref(), Some("t.age >= :tage1"));
/// ```
pub fn compile_filters(
    data: &Object,
    rules: &RuleMap,
    default_alias: &str,
) -> Result<CompiledFilters, ConfigError> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    for (field, rule) in rules.iter() {
        if matches!(field, "limit" | "offset" | "orderBy") || rule.ignore_filter {
            continue;
        }
        let Some(value) = data.get(field) else {
            continue;
        };
        if matches!(value, JsonValue::Null) {
            continue;
        }
        let column = resolve_column(field, rule, default_alias);
        let mut fragments = build_conditions(&column, value, rule)?;
        if fragments.len() == 1 {
            if let Some(fragment) = fragments.pop() {
                params.extend(fragment.params);
                conditions.push(Condition::Expr(fragment.expression));
            }
        } else if !fragments.is_empty() {
            let mut group = Vec::with_capacity(fragments.len());
            for fragment in fragments {
                params.extend(fragment.params);
                group.push(Condition::Expr(fragment.expression));
            }
            conditions.push(Condition::Any(group));
        }
    }

    Ok(CompiledFilters { conditions, params })
}

/// Column expression for a field: explicit `column`, else
/// `alias.field` with the rule's or the default alias.
#[must_use]
pub fn resolve_column(field: &str, rule: &Rule, default_alias: &str) -> String {
    if let Some(column) = &rule.column {
        return column.clone();
    }
    let alias = rule
        .alias
        .as_deref()
        .unwrap_or(default_alias)
        .trim_end_matches('.');
    format!("{alias}.{field}")
}

/// Build the condition fragment(s) for one field's raw filter value.
///
/// Multiple fragments for the same field are OR-combined by the driver.
///
/// # Errors
///
/// Propagates `ConfigError` from a condition callback.
pub fn build_conditions(
    column: &str,
    value: &JsonValue,
    rule: &Rule,
) -> Result<Vec<ConditionFragment>, ConfigError> {
    // Booleans compare against a literal, no parameter involved.
    if rule.semantic_type() == FieldType::Boolean {
        let lit = if truthy(value) { "true" } else { "false" };
        return Ok(vec![ConditionFragment::new(format!("{column} = {lit}"))]);
    }

    let Some(raw) = scalar_to_string(value) else {
        return Ok(Vec::new());
    };

    let quoted = rule.semantic_type() == FieldType::String
        && rule.enum_values.is_none()
        && !rule.date;
    let values = if rule.list.unwrap_or(false) {
        scan::split_list(&raw, quoted)
    } else {
        vec![raw]
    };
    let base = param_base(column);

    if let Some(callback) = &rule.condition_callback {
        return Ok(callback.run(&values, rule)?.into_iter().collect());
    }
    if let Some(template) = &rule.condition_template {
        return Ok(vec![build_from_template(template, &base, &values, rule)]);
    }
    if rule.enum_values.is_some() {
        return Ok(vec![enum_fragment(column, &base, values, rule)]);
    }
    Ok(generic_fragments(column, &base, &values, rule))
}

/// `:name` base derived from the column with non-alphanumerics stripped.
fn param_base(column: &str) -> String {
    let mut base = String::with_capacity(column.len() + 1);
    base.push(':');
    base.extend(column.chars().filter(char::is_ascii_alphanumeric));
    base
}

/// Stringified scalar for grammar scanning; arrays/objects do not filter.
fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(Number::I64(i)) => Some(i.to_string()),
        JsonValue::Number(Number::U64(u)) => Some(u.to_string()),
        JsonValue::Number(Number::F64(f)) => Some(f.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(Number::I64(i)) => *i != 0,
        JsonValue::Number(Number::U64(u)) => *u != 0,
        JsonValue::Number(Number::F64(f)) => *f != 0.0,
        JsonValue::String(s) => !s.is_empty() && s != "0",
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

/// Single `IN`/`NOT IN` fragment for an enum-typed field.
fn enum_fragment(
    column: &str,
    base: &str,
    mut values: Vec<String>,
    rule: &Rule,
) -> ConditionFragment {
    let mut not = "";
    if rule.negation.unwrap_or(false)
        && values.first().is_some_and(|v| v.starts_with('!'))
    {
        not = " NOT";
        if let Some(first) = values.first_mut() {
            first.remove(0);
        }
    }
    let name = format!("{base}1");
    ConditionFragment::with_params(
        format!("{column}{not} IN ({name})"),
        vec![(
            name,
            Value::Array(values.into_iter().map(Value::String).collect()),
        )],
    )
}

/// Generic scalar path: one fragment per recognized operator value, plus one
/// equality/`IN` fragment for the plain-value bucket.
fn generic_fragments(
    column: &str,
    base: &str,
    values: &[String],
    rule: &Rule,
) -> Vec<ConditionFragment> {
    let caps = Caps::of(rule);
    let mut fragments = Vec::new();
    let mut bucket: Vec<String> = Vec::new();
    let mut idx = 1usize;

    for val in values {
        match scan::scan_value(val, &caps) {
            ScalarOp::Range { low, high } => {
                let p1 = format!("{base}{idx}");
                let p2 = format!("{base}{}", idx + 1);
                idx += 2;
                let expression = match &rule.avoid_between_operand {
                    Some(operand) => {
                        format!("{p1} <= {} AND {p2} >= {}", operand.low(), operand.high())
                    },
                    None => format!("{column} BETWEEN {p1} AND {p2}"),
                };
                fragments.push(ConditionFragment::with_params(
                    expression,
                    vec![(p1, Value::String(low)), (p2, Value::String(high))],
                ));
            },
            ScalarOp::Cmp { op, rest } => {
                let name = format!("{base}{idx}");
                idx += 1;
                fragments.push(ConditionFragment::with_params(
                    format!("{column} {} {name}", op.sql()),
                    vec![(name, Value::String(rest))],
                ));
            },
            ScalarOp::Ne { rest } => {
                let name = format!("{base}{idx}");
                idx += 1;
                fragments.push(ConditionFragment::with_params(
                    format!("{column} <> {name}"),
                    vec![(name, Value::String(rest))],
                ));
            },
            ScalarOp::Like { pattern } => {
                let name = format!("{base}{idx}");
                idx += 1;
                fragments.push(ConditionFragment::with_params(
                    format!("UPPER(UNACCENT({column})) LIKE UPPER(UNACCENT({name}))"),
                    vec![(name, Value::String(pattern))],
                ));
            },
            ScalarOp::Plain { value } => bucket.push(value),
        }
    }

    if let [single] = bucket.as_slice() {
        let name = format!("{base}{idx}");
        fragments.push(ConditionFragment::with_params(
            format!("{column} = {name}"),
            vec![(name, Value::String(single.clone()))],
        ));
    } else if !bucket.is_empty() {
        let name = format!("{base}{idx}");
        fragments.push(ConditionFragment::with_params(
            format!("{column} IN ({name})"),
            vec![(
                name,
                Value::Array(bucket.into_iter().map(Value::String).collect()),
            )],
        ));
    }

    fragments
}

/// Fragment from a `{VALUE}` / `{OPERATION_VALUE}` condition template.
fn build_from_template(
    template: &str,
    base: &str,
    values: &[String],
    rule: &Rule,
) -> ConditionFragment {
    if template.contains("{OPERATION_VALUE}") {
        let (operation, params, replace_whole) = operation_for(base, values, rule);
        let expression = if replace_whole {
            operation
        } else {
            template.replace("{OPERATION_VALUE}", &operation)
        };
        return ConditionFragment::with_params(expression, params);
    }

    if template.contains("{VALUE}") {
        let name = format!("{base}1");
        let value = if values.len() > 1 {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        } else {
            Value::String(values.first().cloned().unwrap_or_default())
        };
        return ConditionFragment::with_params(
            template.replace("{VALUE}", &name),
            vec![(name, value)],
        );
    }

    ConditionFragment::new(template)
}

/// Operation + value for an `{OPERATION_VALUE}` template. The bool marks the
/// inverse-range case, where the operation replaces the template entirely
/// (the range comparison already embeds its own operand expressions).
fn operation_for(
    base: &str,
    values: &[String],
    rule: &Rule,
) -> (String, Vec<(String, Value)>, bool) {
    if values.len() > 1 {
        let name = format!("{base}1");
        let params = vec![(
            name.clone(),
            Value::Array(values.iter().cloned().map(Value::String).collect()),
        )];
        return (format!("IN ({name})"), params, false);
    }

    let val = values.first().cloned().unwrap_or_default();
    let name = format!("{base}1");
    match scan::scan_value(&val, &Caps::of(rule)) {
        ScalarOp::Range { low, high } => {
            let p2 = format!("{base}2");
            let params = vec![
                (name.clone(), Value::String(low)),
                (p2.clone(), Value::String(high)),
            ];
            match &rule.avoid_between_operand {
                Some(operand) => (
                    format!("{name} <= {} AND {p2} >= {}", operand.low(), operand.high()),
                    params,
                    true,
                ),
                None => (format!("BETWEEN {name} AND {p2}"), params, false),
            }
        },
        ScalarOp::Cmp { op, rest } => (
            format!("{} {name}", op.sql()),
            vec![(name, Value::String(rest))],
            false,
        ),
        ScalarOp::Ne { rest } => (
            format!("<> {name}"),
            vec![(name, Value::String(rest))],
            false,
        ),
        ScalarOp::Like { pattern } => (
            format!("LIKE UPPER(UNACCENT({name}))"),
            vec![(name, Value::String(pattern))],
            false,
        ),
        ScalarOp::Plain { value } => (
            format!("= {name}"),
            vec![(name, Value::String(value))],
            false,
        ),
    }
}
