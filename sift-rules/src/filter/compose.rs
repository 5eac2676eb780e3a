//! Composition of condition fragments into one boolean expression.

/// A node of the boolean condition tree.
///
/// Leaves are raw expression strings (typically a
/// [`ConditionFragment`](crate::filter::ConditionFragment)'s expression, but
/// callers may add hand-written conditions); groups combine children with
/// `AND`/`OR`. Sibling groups of the same kind are simply separate vector
/// elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// A single boolean expression.
    Expr(String),
    /// All children must hold.
    All(Vec<Condition>),
    /// At least one child must hold.
    Any(Vec<Condition>),
}

impl Condition {
    /// Leaf condition from any string-ish expression.
    pub fn expr(expression: impl Into<String>) -> Self {
        Self::Expr(expression.into())
    }

    /// Render this node, skipping empty leaves and empty groups.
    fn render(&self) -> Option<String> {
        match self {
            Self::Expr(s) => {
                if s.trim().is_empty() {
                    None
                } else {
                    Some(s.clone())
                }
            },
            Self::All(children) => render_group(children, " AND "),
            Self::Any(children) => render_group(children, " OR "),
        }
    }
}

/// Render a group's surviving children; single survivors collapse without
/// parentheses.
fn render_group(children: &[Condition], sep: &str) -> Option<String> {
    let mut parts = children.iter().filter_map(Condition::render);
    let first = parts.next()?;
    let rest: Vec<String> = parts.collect();
    if rest.is_empty() {
        return Some(first);
    }
    let mut sql = String::from("(");
    sql.push_str(&first);
    for part in rest {
        sql.push_str(sep);
        sql.push_str(&part);
    }
    sql.push(')');
    Some(sql)
}

/// Combine conditions into one expression with an implicit top-level `AND`.
///
/// Empty/blank entries are skipped. Returns `None` when nothing remains.
///
/// # Example
///
/// ```
/// use sift_rules::Condition;
///
/// let expr = sift_rules::compose(&[
///     Condition::expr("t.token IS NULL"),
///     Condition::Any(vec![
///         Condition::expr("t.uri IS NULL"),
///         Condition::All(vec![
///             Condition::expr("t.sso IS NOT NULL"),
///             Condition::expr("t.ip IS NULL"),
///         ]),
///     ]),
/// ]);
/// assert_eq!(
///     expr.as_deref(),
///     Some("t.token IS NULL AND (t.uri IS NULL OR (t.sso IS NOT NULL AND t.ip IS NULL))")
/// );
/// ```
#[must_use]
pub fn compose(conditions: &[Condition]) -> Option<String> {
    let parts: Vec<String> = conditions.iter().filter_map(Condition::render).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}
