//! Preparation of rule maps for search requests.

use crate::rules::types::{FieldType, Rule, RuleMap, SortColumn};
use crate::validate::SearchValidators;

/// Fields every search request understands implicitly.
const IMPLICIT_FIELDS: [&str; 3] = ["limit", "offset", "orderBy"];

/// Annotate a rule map for filter compilation, returning a prepared copy.
///
/// For every field not already prepared:
///
/// - preserves the semantic type under `filter_type`, then widens the
///   working type to `String` (filter values arrive as strings); booleans
///   stay `Boolean`;
/// - fills operator defaults: wildcard both ends, list, range, `>`/`>=`,
///   `<`/`<=`, negation and sortable all allowed;
/// - when a [`SearchValidators`] provider is given, attaches the built-in
///   validation hook by precedence: enum, date, then the semantic type's
///   grammar check (string/integer/float);
/// - strips annotations meaningless for the resolved type: non-string types
///   lose wildcard; string and boolean types lose range/`>`/`<`; booleans
///   additionally lose list.
///
/// The implicit `limit`/`offset` rules are placed first and an `orderBy`
/// rule is appended whose `columns` allow-list holds every sortable field
/// followed by any caller-declared columns.
///
/// Preparing an already-prepared map is a no-op (detected via
/// `filter_type`), so callers can memoize the result per endpoint (e.g. in
/// a `std::sync::OnceLock`) and share it across requests.
///
/// # Example
///
/// ```
/// use sift_rules::prelude::*;
///
/// let rules = RuleMap::new()
///     .with("name", Rule::string())
///     .with("age", Rule::integer().sortable(false));
/// let prepared = prepare_rules_for_search(&rules, None);
///
/// assert_eq!(prepared.get("name").unwrap().filter_type, Some(FieldType::String));
/// assert!(prepared.contains("limit"));
/// let order_by = prepared.get("orderBy").unwrap();
/// assert_eq!(order_by.columns.len(), 1); // age is not sortable
/// ```
#[must_use]
pub fn prepare_rules_for_search(
    rules: &RuleMap,
    validators: Option<&SearchValidators>,
) -> RuleMap {
    let mut sortable: Vec<SortColumn> = Vec::new();
    let mut fields = RuleMap::new();
    for (field, rule) in rules.iter() {
        if IMPLICIT_FIELDS.contains(&field) {
            continue;
        }
        let prepared = prepare_rule(rule.clone(), validators);
        if prepared.sortable == Some(true) {
            sortable.push(SortColumn::new(field));
        }
        fields.insert(field, prepared);
    }

    let mut out = RuleMap::new();
    out.insert(
        "limit",
        rules.get("limit").cloned().unwrap_or_else(Rule::integer),
    );
    out.insert(
        "offset",
        rules.get("offset").cloned().unwrap_or_else(Rule::integer),
    );
    for (field, rule) in fields.iter() {
        out.insert(field, rule.clone());
    }

    let mut order_by = rules.get("orderBy").cloned().unwrap_or_else(Rule::string);
    if order_by.custom.is_none()
        && let Some(sv) = validators
    {
        order_by.custom = Some(sv.order_by());
    }
    let caller_columns = std::mem::take(&mut order_by.columns);
    sortable.extend(caller_columns);
    // First declaration of a name wins; deduping keeps re-preparation a no-op.
    let mut columns: Vec<SortColumn> = Vec::new();
    for col in sortable {
        if !columns.iter().any(|c| c.name == col.name) {
            columns.push(col);
        }
    }
    order_by.columns = columns;
    out.insert("orderBy", order_by);

    out
}

/// Prepare a single rule. Already-prepared rules pass through untouched.
fn prepare_rule(mut rule: Rule, validators: Option<&SearchValidators>) -> Rule {
    if rule.filter_type.is_some() {
        return rule;
    }
    rule.filter_type = Some(rule.field_type);
    if rule.field_type != FieldType::Boolean {
        rule.field_type = FieldType::String;
    }

    // Operator defaults: everything allowed unless the author said otherwise.
    rule.wildcard.get_or_insert((true, true));
    rule.list.get_or_insert(true);
    rule.range.get_or_insert(true);
    rule.gt.get_or_insert(true);
    rule.lt.get_or_insert(true);
    rule.negation.get_or_insert(true);
    rule.sortable.get_or_insert(true);

    if let Some(sv) = validators {
        let hook = if rule.enum_values.is_some() {
            Some(sv.enumerated())
        } else if rule.date {
            Some(sv.date())
        } else {
            match rule.semantic_type() {
                FieldType::String => Some(sv.string()),
                FieldType::Integer => Some(sv.integer()),
                FieldType::Float => Some(sv.float()),
                _ => None,
            }
        };
        if let Some(hook) = hook {
            rule.custom = Some(hook);
        }
    }

    // Strip annotations the resolved type cannot honor.
    let non_string = rule.semantic_type() != FieldType::String
        || rule.enum_values.is_some()
        || rule.date;
    if non_string {
        rule.wildcard = None;
    }
    if !non_string || rule.semantic_type() == FieldType::Boolean {
        rule.range = None;
        rule.gt = None;
        rule.lt = None;
        if rule.semantic_type() == FieldType::Boolean {
            rule.list = None;
        }
    }

    rule
}
