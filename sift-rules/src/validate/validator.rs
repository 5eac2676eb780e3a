//! Recursive validation of input maps against rule maps.

use crate::rules::{FieldType, Rule, RuleMap, RuleShape};
use crate::validate::{ConfigError, FieldError, ValidationErrors};
use miniserde::json::{Number, Object, Value as JsonValue};
use regex::Regex;
use std::fmt;

/// Validates input maps against [`RuleMap`]s, collecting every field error
/// instead of failing fast.
///
/// The validator itself only holds the error-code prefix; each
/// [`validate`](Self::validate) call owns a fresh accumulator, so one
/// instance can serve concurrent validations.
///
/// # Example
///
/// ```
/// use miniserde::json::{Object, Value};
/// use sift_rules::prelude::*;
///
/// let rules = RuleMap::new()
///     .with("name", Rule::string().require_filled(true).length(1, 60))
///     .with("age", Rule::integer());
///
/// let mut data = Object::new();
/// data.insert("name".to_string(), Value::String("Ada".to_string()));
///
/// let errors = Validator::new().validate(&data, &rules);
/// assert!(errors.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    prefix: String,
}

/// Per-entity accessor table: field name → getter producing the field's
/// runtime value. Built once at registration time and reused for every
/// validation of that entity type.
pub struct FieldTable<T> {
    getters: Vec<(String, fn(&T) -> JsonValue)>,
}

impl<T> FieldTable<T> {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            getters: Vec::new(),
        }
    }

    /// Register a field accessor, fluently.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, getter: fn(&T) -> JsonValue) -> Self {
        self.getters.push((field.into(), getter));
        self
    }

    /// Accessor for a field, if registered.
    #[must_use]
    pub fn getter(&self, field: &str) -> Option<fn(&T) -> JsonValue> {
        self.getters
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, getter)| *getter)
    }
}

impl<T> Default for FieldTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FieldTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldTable({} fields)", self.getters.len())
    }
}

/// Per-group bookkeeping for the choice-group pass.
struct GroupState {
    chosen: Option<u32>,
    required: bool,
}

impl Validator {
    /// Validator with no error-code prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator whose error codes render under `prefix` (e.g. `"search."`).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured error-code prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Validate a data map against a rule map. Only ruled fields are
    /// checked; an empty result means the input is valid.
    #[must_use]
    pub fn validate(&self, data: &Object, rules: &RuleMap) -> ValidationErrors {
        let mut errors = ValidationErrors::with_prefix(self.prefix.clone());
        self.validate_into(data, rules, "", &mut errors);
        errors
    }

    /// Like [`validate`](Self::validate), for call sites where rules are
    /// mandatory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingRules`] when `rules` is absent or empty;
    /// validating nothing where rules were required is a programming
    /// mistake, not a clean pass.
    pub fn validate_mandatory(
        &self,
        data: &Object,
        rules: Option<&RuleMap>,
    ) -> Result<ValidationErrors, ConfigError> {
        match rules {
            Some(rules) if !rules.is_empty() => Ok(self.validate(data, rules)),
            _ => Err(ConfigError::MissingRules),
        }
    }

    /// Validate an entity through its accessor table: each ruled field is
    /// read via its registered getter (fields without a getter read as
    /// `null`) and the resulting map is validated normally.
    #[must_use]
    pub fn validate_fields_with<T>(
        &self,
        entity: &T,
        table: &FieldTable<T>,
        rules: &RuleMap,
    ) -> ValidationErrors {
        let mut data = Object::new();
        for (field, _) in rules.iter() {
            let value = table
                .getter(field)
                .map_or(JsonValue::Null, |getter| getter(entity));
            data.insert(field.to_string(), value);
        }
        self.validate(&data, rules)
    }

    /// Recursive worker. `parent` is either empty or a path prefix ending in
    /// `.` / `[i].`.
    fn validate_into(
        &self,
        data: &Object,
        rules: &RuleMap,
        parent: &str,
        errors: &mut ValidationErrors,
    ) {
        // Choice-group pass: the first present field (in rule-map order)
        // decides each group's chosen option.
        let mut groups: Vec<(String, GroupState)> = Vec::new();
        for (field, rule) in rules.iter() {
            let Some(cg) = &rule.choice_group else {
                continue;
            };
            let pos = groups.iter().position(|(group, _)| group == &cg.group);
            let pos = pos.unwrap_or_else(|| {
                groups.push((
                    cg.group.clone(),
                    GroupState {
                        chosen: None,
                        required: cg.required.unwrap_or(true),
                    },
                ));
                groups.len() - 1
            });
            if !data.contains_key(field) {
                continue;
            }
            let state = &mut groups[pos].1;
            match state.chosen {
                None => state.chosen = Some(cg.option),
                Some(chosen) if chosen != cg.option => {
                    let label = rule
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("{parent}{field}"));
                    errors.add(
                        format!("{parent}{field}"),
                        FieldError::MultipleOptionsChosen {
                            label,
                            group: cg.group.clone(),
                        },
                    );
                },
                Some(_) => {},
            }
        }
        for (group, state) in &groups {
            if state.chosen.is_none() && state.required {
                errors.add(
                    format!("{parent}_choice_group_{group}"),
                    FieldError::NoOptionChosen {
                        group: group.clone(),
                    },
                );
            }
        }

        // Per-field pass, skipping fields of unchosen options.
        for (field, rule) in rules.iter() {
            if let Some(cg) = &rule.choice_group {
                let chosen = groups
                    .iter()
                    .find(|(group, _)| group == &cg.group)
                    .and_then(|(_, state)| state.chosen);
                if chosen != Some(cg.option) {
                    continue;
                }
            }
            let path = format!("{parent}{field}");
            let label = rule.label.clone().unwrap_or_else(|| path.clone());
            self.check_field(field, &path, &label, data, rule, errors);
        }
    }

    /// Run all checks for one field; records at most one error for the
    /// field itself (nested recursion records under nested paths).
    #[allow(clippy::too_many_lines)]
    fn check_field(
        &self,
        field: &str,
        path: &str,
        label: &str,
        data: &Object,
        rule: &Rule,
        errors: &mut ValidationErrors,
    ) {
        // `required`/`empty` always win over the requireFilled shorthand.
        let required_literal = match (&rule.required_if, rule.required) {
            (Some(predicate), _) => Some(predicate.eval(data)),
            (None, literal) => literal,
        };
        let require_filled = if required_literal.is_some() || rule.empty.is_some() {
            None
        } else {
            rule.require_filled
        };
        let is_required = required_literal.unwrap_or(false) || require_filled.is_some();
        let informed = data.contains_key(field);
        if is_required && !informed {
            errors.add(
                path,
                FieldError::MissingRequired {
                    label: label.to_string(),
                },
            );
            return;
        }

        let can_be_empty = (require_filled.is_none() && rule.empty.is_none())
            || require_filled.is_some_and(|filled| !filled)
            || rule.empty.unwrap_or(false);
        let value = data.get(field);
        let is_empty = value.is_none_or(is_empty_value);
        if informed && !can_be_empty && is_empty {
            errors.add(
                path,
                FieldError::Empty {
                    label: label.to_string(),
                },
            );
            return;
        }
        // Empty and allowed to be: nothing further to check.
        let Some(value) = value else {
            return;
        };
        if is_empty {
            return;
        }

        if let Some(error) = check_type(label, value, rule.field_type, true) {
            errors.add(path, error);
            return;
        }

        let shape = rule.shape();
        let is_array_multi = matches!(
            shape,
            RuleShape::ArrayOfScalar(_) | RuleShape::ArrayOfStruct
        );
        if is_array_multi
            && let Some(elem_type) = rule.of
            && let JsonValue::Array(items) = value
        {
            for (i, item) in items.iter().enumerate() {
                // Array elements may not be null.
                if let Some(error) =
                    check_type(&format!("{label}[{i}]"), item, elem_type, false)
                {
                    errors.add(format!("{path}[{i}]"), error);
                    return;
                }
            }
        }

        let is_numeric = matches!(rule.field_type, FieldType::Integer | FieldType::Float);
        let is_string = rule.field_type == FieldType::String;

        if let Some((min, max)) = rule.length
            && (is_numeric || is_string || is_array_multi)
            && let Some(error) = check_length(label, value, min, max, rule.field_type)
        {
            errors.add(path, error);
            return;
        }

        if let Some(pattern) = &rule.regex
            && (is_numeric || is_string)
        {
            match Regex::new(pattern) {
                Err(_) => {
                    errors.add(
                        path,
                        FieldError::Internal(ConfigError::InvalidRegex {
                            label: label.to_string(),
                            pattern: pattern.clone(),
                        }),
                    );
                    return;
                },
                Ok(re) => {
                    if !re.is_match(&stringify(value)) {
                        errors.add(
                            path,
                            FieldError::InvalidFormat {
                                label: label.to_string(),
                            },
                        );
                        return;
                    }
                },
            }
        }

        if let Some(hook) = &rule.custom
            && let Err(error) = hook.run(field, data, rule)
        {
            errors.add(path, error);
            return;
        }

        match shape {
            RuleShape::Struct => {
                if let Some(nested) = &rule.nested
                    && let JsonValue::Object(obj) = value
                {
                    self.validate_into(obj, nested, &format!("{path}."), errors);
                }
            },
            RuleShape::ArrayOfStruct => {
                if let Some(nested) = &rule.nested
                    && let JsonValue::Array(items) = value
                {
                    for (i, item) in items.iter().enumerate() {
                        if let JsonValue::Object(obj) = item {
                            self.validate_into(obj, nested, &format!("{path}[{i}]."), errors);
                        }
                    }
                }
            },
            RuleShape::Scalar(_) | RuleShape::ArrayOfScalar(_) => {},
        }
    }
}

/// Empty means `null`, `""`, `[]` or `{}`.
fn is_empty_value(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}

/// Type-check a value; `null` satisfies any type unless `allow_null` is off.
fn check_type(
    label: &str,
    value: &JsonValue,
    expected: FieldType,
    allow_null: bool,
) -> Option<FieldError> {
    if matches!(value, JsonValue::Null) {
        if allow_null {
            return None;
        }
        return Some(FieldError::WrongType {
            label: label.to_string(),
            expected,
            got: "null",
        });
    }
    let ok = match (expected, value) {
        (FieldType::String, JsonValue::String(_))
        | (FieldType::Boolean, JsonValue::Bool(_))
        | (FieldType::Float, JsonValue::Number(_))
        | (FieldType::Object, JsonValue::Object(_))
        | (FieldType::Array, JsonValue::Array(_)) => true,
        (FieldType::Integer, JsonValue::Number(n)) => match n {
            Number::I64(_) | Number::U64(_) => true,
            // An integral float still counts as an integer.
            Number::F64(f) => f.fract() == 0.0,
        },
        _ => false,
    };
    if ok {
        None
    } else {
        Some(FieldError::WrongType {
            label: label.to_string(),
            expected,
            got: json_type_name(value),
        })
    }
}

/// Length semantics per declared type: the value itself for numbers,
/// character count for strings, element count for arrays.
fn check_length(
    label: &str,
    value: &JsonValue,
    min: f64,
    max: f64,
    field_type: FieldType,
) -> Option<FieldError> {
    let (len, numeric) = match field_type {
        FieldType::Integer | FieldType::Float => match value {
            JsonValue::Number(n) => (number_as_f64(n), true),
            _ => return None,
        },
        FieldType::String => match value {
            JsonValue::String(s) => (approx_len(s.chars().count()), false),
            _ => return None,
        },
        FieldType::Array => match value {
            JsonValue::Array(a) => (approx_len(a.len()), false),
            _ => return None,
        },
        FieldType::Boolean | FieldType::Object => return None,
    };
    if len >= min && len <= max {
        return None;
    }
    Some(if numeric {
        FieldError::InvalidNumericLength {
            label: label.to_string(),
            min,
            max,
        }
    } else {
        FieldError::InvalidStringLength {
            label: label.to_string(),
            min,
            max,
        }
    })
}

fn number_as_f64(n: &Number) -> f64 {
    match n {
        Number::I64(i) => *i as f64,
        Number::U64(u) => *u as f64,
        Number::F64(f) => *f,
    }
}

fn approx_len(len: usize) -> f64 {
    u32::try_from(len).map_or(f64::MAX, f64::from)
}

/// String form used for regex matching.
fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(Number::I64(i)) => i.to_string(),
        JsonValue::Number(Number::U64(u)) => u.to_string(),
        JsonValue::Number(Number::F64(f)) => f.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => String::new(),
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(Number::I64(_) | Number::U64(_)) => "integer",
        JsonValue::Number(Number::F64(_)) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
