//! Commonly reused validation hooks for non-search requests.

use crate::rules::{CustomValidator, Rule};
use crate::validate::search::{is_date_str, DEFAULT_DATE_FMT};
use crate::validate::FieldError;
use miniserde::json::{Number, Object, Value as JsonValue};

/// Provider of plain (non-grammar) hooks for create/update style requests.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct CommonValidators;

impl CommonValidators {
    /// New provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hook checking the whole value is a date in the rule's format.
    #[must_use]
    pub fn date(&self) -> CustomValidator {
        CustomValidator::new("common.date", check_date)
    }

    /// Hook checking the whole value belongs to the rule's enum set.
    #[must_use]
    pub fn enumerated(&self) -> CustomValidator {
        CustomValidator::new("common.enum", check_enum)
    }
}

fn invalid(field: &str, rule: &Rule) -> FieldError {
    FieldError::InvalidFormat {
        label: rule.label.clone().unwrap_or_else(|| field.to_string()),
    }
}

fn plain_string(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(Number::I64(i)) => Some(i.to_string()),
        JsonValue::Number(Number::U64(u)) => Some(u.to_string()),
        JsonValue::Number(Number::F64(f)) => Some(f.to_string()),
        _ => None,
    }
}

fn check_date(field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
    let Some(raw) = plain_string(data.get(field)) else {
        return Ok(());
    };
    let fmt = rule.date_fmt.as_deref().unwrap_or(DEFAULT_DATE_FMT);
    if is_date_str(&raw, fmt) {
        Ok(())
    } else {
        Err(invalid(field, rule))
    }
}

fn check_enum(field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
    let Some(raw) = plain_string(data.get(field)) else {
        return Ok(());
    };
    match &rule.enum_values {
        Some(allowed) if !allowed.contains(&raw) => Err(invalid(field, rule)),
        _ => Ok(()),
    }
}
