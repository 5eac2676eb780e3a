//! Compilation of order-by strings into column ordering clauses.

use crate::rules::RuleMap;
use crate::validate::ConfigError;

/// Compile a raw `field1|ASC,field2|DESC,field3` string into ordering
/// clauses, joined with `", "`.
///
/// Resolution per field, in order: the rule's `sort_expr` (with
/// `{DIRECTION}`/`{INVERSE_DIRECTION}` substituted, direction cleared), the
/// rule's `column`, `alias.field`, `default_alias.field`. Fields without a
/// rule must match the `orderBy` rule's compiled `columns` allow-list; an
/// allow-listed column sorts by its declared expression (or
/// `default_alias.field` when it has none).
///
/// # Errors
///
/// - [`ConfigError::InvalidSortSegment`] for malformed segments or unknown
///   directions; the order-by validator rejects these upstream, so hitting
///   one here means the input skipped validation.
/// - [`ConfigError::UnknownSortField`] for fields neither ruled nor
///   allow-listed; unknown fields never fall through to a column expression.
///
/// # Example
///
/// ```
/// use sift_rules::prelude::*;
///
/// let rules = prepare_rules_for_search(
///     &RuleMap::new()
///         .with("name", Rule::string())
///         .with("age", Rule::integer()),
///     None,
/// );
/// let order = compile_order_by(Some("name|DESC,age"), &rules, "t").unwrap();
/// assert_eq!(order.as_deref(), Some("t.name DESC, t.age ASC"));
/// ```
pub fn compile_order_by(
    raw_order: Option<&str>,
    rules: &RuleMap,
    default_alias: &str,
) -> Result<Option<String>, ConfigError> {
    let raw = match raw_order {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(None),
    };
    let alias = default_alias.trim_end_matches('.');

    let mut clauses = Vec::new();
    for segment in raw.split(',') {
        let mut parts = segment.split('|');
        let field = parts.next().unwrap_or_default();
        let direction = match parts.next() {
            None => "ASC".to_string(),
            Some(d) => {
                let upper = d.to_ascii_uppercase();
                if upper != "ASC" && upper != "DESC" {
                    return Err(ConfigError::InvalidSortSegment {
                        segment: segment.to_string(),
                    });
                }
                upper
            },
        };
        if field.is_empty() || parts.next().is_some() {
            return Err(ConfigError::InvalidSortSegment {
                segment: segment.to_string(),
            });
        }

        let clause = if let Some(rule) = rules.get(field) {
            if let Some(sort_expr) = &rule.sort_expr {
                let inverse = if direction == "ASC" { "DESC" } else { "ASC" };
                // Direction is baked into the expression, nothing to append.
                sort_expr
                    .replace("{DIRECTION}", &direction)
                    .replace("{INVERSE_DIRECTION}", inverse)
            } else if let Some(column) = &rule.column {
                format!("{column} {direction}")
            } else if let Some(rule_alias) = &rule.alias {
                format!("{}.{field} {direction}", rule_alias.trim_end_matches('.'))
            } else {
                format!("{alias}.{field} {direction}")
            }
        } else {
            let allowed = rules
                .get("orderBy")
                .and_then(|r| r.columns.iter().find(|c| c.name == field));
            match allowed {
                Some(col) => match &col.expr {
                    Some(expr) => format!("{expr} {direction}"),
                    None => format!("{alias}.{field} {direction}"),
                },
                None => {
                    return Err(ConfigError::UnknownSortField {
                        field: field.to_string(),
                    });
                },
            }
        };
        clauses.push(clause);
    }

    Ok(Some(clauses.join(", ")))
}
