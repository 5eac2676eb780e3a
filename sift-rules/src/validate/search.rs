//! Built-in validation hooks for search request parameters.
//!
//! Filter values arrive as strings carrying the filter micro-grammar
//! (ranges, lists, comparison prefixes, negation, wildcards). These hooks
//! reject values whose grammar the rule does not permit or whose payload
//! does not parse as the semantic type, before any condition is compiled.

use crate::filter::scan::split_quoted_csv;
use crate::rules::{CustomValidator, Rule};
use crate::validate::FieldError;
use chrono::NaiveDate;
use miniserde::json::{Number, Object, Value as JsonValue};

/// Default `chrono` format for date rules.
pub const DEFAULT_DATE_FMT: &str = "%Y-%m-%d";

/// Provider of the built-in search-time hooks.
///
/// Passed to [`prepare_rules_for_search`](crate::prepare_rules_for_search),
/// which picks the hook matching each rule (enum, date, then semantic type).
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct SearchValidators;

impl SearchValidators {
    /// New provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hook for enum-typed fields: every (list-split) value must belong to
    /// the declared set; a leading `!` on the first value is accepted when
    /// negation is allowed.
    #[must_use]
    pub fn enumerated(&self) -> CustomValidator {
        CustomValidator::new("search.enum", check_enum)
    }

    /// Hook for free-text string fields: wildcard markers are only accepted
    /// on the sides the rule allows.
    #[must_use]
    pub fn string(&self) -> CustomValidator {
        CustomValidator::new("search.string", check_string)
    }

    /// Hook for integer fields: grammar walk plus canonical integer parse.
    #[must_use]
    pub fn integer(&self) -> CustomValidator {
        CustomValidator::new("search.integer", |field, data, rule| {
            check_scalar(field, data, rule, Payload::Int)
        })
    }

    /// Hook for float fields: grammar walk plus canonical float parse.
    #[must_use]
    pub fn float(&self) -> CustomValidator {
        CustomValidator::new("search.float", |field, data, rule| {
            check_scalar(field, data, rule, Payload::Float)
        })
    }

    /// Hook for date fields: grammar walk plus `chrono` date parse.
    #[must_use]
    pub fn date(&self) -> CustomValidator {
        CustomValidator::new("search.date", |field, data, rule| {
            check_scalar(field, data, rule, Payload::Date)
        })
    }

    /// Hook for the implicit `orderBy` field: each `field|DIRECTION`
    /// segment must name an allow-listed column and a valid direction.
    #[must_use]
    pub fn order_by(&self) -> CustomValidator {
        CustomValidator::new("search.order_by", check_order_by)
    }
}

/// What the payload (after grammar stripping) must parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    Int,
    Float,
    Date,
}

fn invalid(field: &str, rule: &Rule) -> FieldError {
    FieldError::InvalidFormat {
        label: rule.label.clone().unwrap_or_else(|| field.to_string()),
    }
}

/// Raw string form of a submitted scalar; `None` skips the check (the type
/// pass reports non-scalars).
fn raw_string(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(Number::I64(i)) => Some(i.to_string()),
        JsonValue::Number(Number::U64(u)) => Some(u.to_string()),
        JsonValue::Number(Number::F64(f)) => Some(f.to_string()),
        _ => None,
    }
}

fn check_enum(field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
    let Some(raw) = raw_string(data.get(field)) else {
        return Ok(());
    };
    let Some(allowed) = &rule.enum_values else {
        return Ok(());
    };
    let mut values: Vec<String> = if rule.list.unwrap_or(false) {
        raw.split(',').map(str::to_string).collect()
    } else {
        vec![raw]
    };
    if rule.negation.unwrap_or(false)
        && let Some(first) = values.first_mut()
        && first.starts_with('!')
    {
        first.remove(0);
    }
    for value in &values {
        if !allowed.contains(value) {
            return Err(invalid(field, rule));
        }
    }
    Ok(())
}

fn check_string(field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
    let Some(raw) = raw_string(data.get(field)) else {
        return Ok(());
    };
    let values = if rule.list.unwrap_or(false) {
        split_quoted_csv(&raw)
    } else {
        vec![raw]
    };
    let (front, back) = rule.wildcard.unwrap_or((false, false));
    for value in &values {
        if (value.starts_with('%') && !front) || (value.ends_with('%') && !back) {
            return Err(invalid(field, rule));
        }
    }
    Ok(())
}

fn check_scalar(
    field: &str,
    data: &Object,
    rule: &Rule,
    payload: Payload,
) -> Result<(), FieldError> {
    let Some(raw) = raw_string(data.get(field)) else {
        return Ok(());
    };
    let values: Vec<&str> = if rule.list.unwrap_or(false) {
        raw.split(',').collect()
    } else {
        vec![raw.as_str()]
    };
    let fmt = rule.date_fmt.as_deref().unwrap_or(DEFAULT_DATE_FMT);
    let parses = |s: &str| match payload {
        Payload::Int => is_int_str(s),
        Payload::Float => is_float_str(s),
        Payload::Date => is_date_str(s, fmt),
    };

    for value in values {
        if rule.range.unwrap_or(false) && value.contains('|') {
            let bounds: Vec<&str> = value.split('|').collect();
            if bounds.len() != 2 || !parses(bounds[0]) || !parses(bounds[1]) {
                return Err(invalid(field, rule));
            }
            continue;
        }

        let payload_str = if let Some(rest) = value.strip_prefix("<=") {
            if !rule.lt.unwrap_or(false) {
                return Err(invalid(field, rule));
            }
            rest
        } else if let Some(rest) = value.strip_prefix(">=") {
            if !rule.gt.unwrap_or(false) {
                return Err(invalid(field, rule));
            }
            rest
        } else if let Some(rest) = value.strip_prefix('!') {
            if !rule.negation.unwrap_or(false) {
                return Err(invalid(field, rule));
            }
            rest
        } else if let Some(rest) = value.strip_prefix('<') {
            if !rule.lt.unwrap_or(false) {
                return Err(invalid(field, rule));
            }
            rest
        } else if let Some(rest) = value.strip_prefix('>') {
            if !rule.gt.unwrap_or(false) {
                return Err(invalid(field, rule));
            }
            rest
        } else {
            value
        };

        if !parses(payload_str) {
            return Err(invalid(field, rule));
        }
    }
    Ok(())
}

fn check_order_by(field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
    let Some(raw) = raw_string(data.get(field)) else {
        return Ok(());
    };
    for segment in raw.split(',') {
        let parts: Vec<&str> = segment.split('|').collect();
        if parts.is_empty() || parts.len() > 2 || parts[0].is_empty() {
            return Err(invalid(field, rule));
        }
        if !rule.columns.iter().any(|c| c.name == parts[0]) {
            return Err(invalid(field, rule));
        }
        if parts.len() == 2 {
            let dir = parts[1].to_ascii_uppercase();
            if dir != "ASC" && dir != "DESC" {
                return Err(invalid(field, rule));
            }
        }
    }
    Ok(())
}

/// Canonical decimal integer: an optional sign, no leading zeros, parses as
/// `i64`.
pub(crate) fn is_int_str(s: &str) -> bool {
    let t = s.strip_prefix('+').unwrap_or(s);
    match t.parse::<i64>() {
        Ok(n) => n.to_string() == t,
        Err(_) => false,
    }
}

/// Canonical decimal float: trailing fractional zeros tolerated, exponents
/// and other non-canonical spellings rejected.
pub(crate) fn is_float_str(s: &str) -> bool {
    let t = s.strip_prefix('+').unwrap_or(s);
    let canonical = if t.contains('.') {
        t.trim_end_matches('0').trim_end_matches('.')
    } else {
        t
    };
    match t.parse::<f64>() {
        Ok(v) => v.to_string() == canonical,
        Err(_) => false,
    }
}

/// Whether the string is a date in the given `chrono` format.
pub(crate) fn is_date_str(s: &str, fmt: &str) -> bool {
    NaiveDate::parse_from_str(s, fmt).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{prepare_rules_for_search, Rule, RuleMap, SortColumn};

    fn data_with(field: &str, value: &str) -> Object {
        let mut data = Object::new();
        data.insert(field.to_string(), JsonValue::String(value.to_string()));
        data
    }

    fn prepared(rule: Rule) -> Rule {
        let map = prepare_rules_for_search(&RuleMap::new().with("f", rule), None);
        map.get("f").unwrap().clone()
    }

    #[test]
    fn test_int_str_accepts_canonical_integers() {
        assert!(is_int_str("0"));
        assert!(is_int_str("42"));
        assert!(is_int_str("-7"));
        assert!(is_int_str("+7"));
    }

    #[test]
    fn test_int_str_rejects_non_canonical() {
        assert!(!is_int_str("007"));
        assert!(!is_int_str("1.5"));
        assert!(!is_int_str(""));
        assert!(!is_int_str("abc"));
        assert!(!is_int_str("1e3"));
    }

    #[test]
    fn test_float_str() {
        assert!(is_float_str("1.5"));
        assert!(is_float_str("1.50"));
        assert!(is_float_str("-1.15"));
        assert!(is_float_str("25"));
        assert!(is_float_str("2.0"));
        assert!(!is_float_str("1e3"));
        assert!(!is_float_str("abc"));
        assert!(!is_float_str(""));
        assert!(!is_float_str("1.2.3"));
    }

    #[test]
    fn test_date_str() {
        assert!(is_date_str("2018-01-20", DEFAULT_DATE_FMT));
        assert!(!is_date_str("2018-13-20", DEFAULT_DATE_FMT));
        assert!(!is_date_str("20/01/2018", DEFAULT_DATE_FMT));
        assert!(is_date_str("20/01/2018", "%d/%m/%Y"));
    }

    #[test]
    fn test_integer_hook_accepts_grammar() {
        let rule = prepared(Rule::integer());
        let hook = SearchValidators::new().integer();
        for ok in ["5", "1,3,15", "0|100", "-5|5", "<=10", ">=50", "<-1", ">34", "!5"] {
            assert!(
                hook.run("f", &data_with("f", ok), &rule).is_ok(),
                "expected `{ok}` to validate"
            );
        }
    }

    #[test]
    fn test_integer_hook_rejects_bad_payloads() {
        let rule = prepared(Rule::integer());
        let hook = SearchValidators::new().integer();
        for bad in ["abc", "1|2|3", "1|", "<=x", "5,abc", "%5"] {
            assert!(
                hook.run("f", &data_with("f", bad), &rule).is_err(),
                "expected `{bad}` to be rejected"
            );
        }
    }

    #[test]
    fn test_integer_hook_honors_disabled_operators() {
        let rule = prepared(Rule::integer().lt(false).negation(false));
        let hook = SearchValidators::new().integer();
        assert!(hook.run("f", &data_with("f", "<5"), &rule).is_err());
        assert!(hook.run("f", &data_with("f", "<=5"), &rule).is_err());
        assert!(hook.run("f", &data_with("f", "!5"), &rule).is_err());
        assert!(hook.run("f", &data_with("f", ">5"), &rule).is_ok());
    }

    #[test]
    fn test_range_disabled_means_pipe_is_not_a_range() {
        let rule = prepared(Rule::integer().range(false));
        let hook = SearchValidators::new().integer();
        // Without ranges the pipe is just part of an unparseable payload.
        assert!(hook.run("f", &data_with("f", "1|5"), &rule).is_err());
    }

    #[test]
    fn test_float_hook_range() {
        let rule = prepared(Rule::float());
        let hook = SearchValidators::new().float();
        assert!(hook.run("f", &data_with("f", "-1.15|25.5"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "1.3,1.4,1.6|2.0"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "a|2.0"), &rule).is_err());
    }

    #[test]
    fn test_date_hook() {
        let rule = prepared(Rule::date());
        let hook = SearchValidators::new().date();
        assert!(hook
            .run("f", &data_with("f", "2018-01-20|2018-10-15"), &rule)
            .is_ok());
        assert!(hook.run("f", &data_with("f", "<2018-05-25"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "not-a-date"), &rule).is_err());
    }

    #[test]
    fn test_date_hook_custom_format() {
        let rule = prepared(Rule::date().date_fmt("%d/%m/%Y"));
        let hook = SearchValidators::new().date();
        assert!(hook.run("f", &data_with("f", "20/01/2018"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "2018-01-20"), &rule).is_err());
    }

    #[test]
    fn test_string_hook_wildcard_flags() {
        let both = prepared(Rule::string());
        let hook = SearchValidators::new().string();
        assert!(hook.run("f", &data_with("f", "%abc%"), &both).is_ok());

        let back_only = prepared(Rule::string().wildcard(false, true));
        assert!(hook.run("f", &data_with("f", "abc%"), &back_only).is_ok());
        assert!(hook.run("f", &data_with("f", "%abc"), &back_only).is_err());
    }

    #[test]
    fn test_string_hook_quoted_list() {
        let rule = prepared(Rule::string());
        let hook = SearchValidators::new().string();
        // The quoted comma is literal, so three values, none with wildcards.
        assert!(hook
            .run("f", &data_with("f", "name1,name2,\"name,with,comma\""), &rule)
            .is_ok());
    }

    #[test]
    fn test_enum_hook() {
        let rule = prepared(Rule::string().enum_values(["new", "open"]));
        let hook = SearchValidators::new().enumerated();
        assert!(hook.run("f", &data_with("f", "new"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "new,open"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "!new,open"), &rule).is_ok());
        assert!(hook.run("f", &data_with("f", "closed"), &rule).is_err());
        assert!(hook.run("f", &data_with("f", "new,closed"), &rule).is_err());
    }

    #[test]
    fn test_order_by_hook() {
        let rule = Rule::string().columns(vec![
            SortColumn::new("name"),
            SortColumn::with_expr("full", "CONCAT(a, b)"),
        ]);
        let hook = SearchValidators::new().order_by();
        assert!(hook.run("orderBy", &data_with("orderBy", "name"), &rule).is_ok());
        assert!(hook
            .run("orderBy", &data_with("orderBy", "name|DESC,full|asc"), &rule)
            .is_ok());
        assert!(hook
            .run("orderBy", &data_with("orderBy", "missing"), &rule)
            .is_err());
        assert!(hook
            .run("orderBy", &data_with("orderBy", "name|SIDEWAYS"), &rule)
            .is_err());
        assert!(hook
            .run("orderBy", &data_with("orderBy", "name|ASC|extra"), &rule)
            .is_err());
    }

    #[test]
    fn test_empty_value_is_accepted() {
        let rule = prepared(Rule::integer());
        let hook = SearchValidators::new().integer();
        assert!(hook.run("f", &data_with("f", ""), &rule).is_ok());
        assert!(hook.run("f", &Object::new(), &rule).is_ok());
    }
}
