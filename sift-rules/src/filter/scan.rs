//! Scanning of scalar filter values into operator tokens.
//!
//! Each scalar value (after optional list splitting) is matched against an
//! ordered table of matchers. First match wins, so precedence is explicit
//! and testable in isolation:
//!
//! 1. `low|high` range
//! 2. `<=` / `>=` inclusive comparison
//! 3. `<` / `>` exclusive comparison
//! 4. `!` negation
//! 5. `%...` / `...%` wildcard (length > 1; a lone `%` is literal)
//! 6. plain value

use crate::rules::Rule;

/// Capability snapshot of a rule: which operators its annotations permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caps {
    pub(crate) range: bool,
    pub(crate) gt: bool,
    pub(crate) lt: bool,
    pub(crate) negation: bool,
    pub(crate) wildcard: (bool, bool),
}

impl Caps {
    /// Snapshot a rule's annotations; undeclared annotations permit nothing.
    pub(crate) fn of(rule: &Rule) -> Self {
        Self {
            range: rule.range.unwrap_or(false),
            gt: rule.gt.unwrap_or(false),
            lt: rule.lt.unwrap_or(false),
            negation: rule.negation.unwrap_or(false),
            wildcard: rule.wildcard.unwrap_or((false, false)),
        }
    }
}

/// Comparison operator carried by a [`ScalarOp::Cmp`] token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
}

impl CmpOp {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Gt => ">",
        }
    }
}

/// One scanned scalar filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScalarOp {
    /// `low|high` inclusive range.
    Range { low: String, high: String },
    /// Comparison prefix with the remainder of the value.
    Cmp { op: CmpOp, rest: String },
    /// `!` negation with the remainder of the value.
    Ne { rest: String },
    /// Wildcard match; `pattern` is the fully escaped LIKE pattern.
    Like { pattern: String },
    /// No operator recognized.
    Plain { value: String },
}

type Matcher = fn(&str, &Caps) -> Option<ScalarOp>;

/// Ordered dispatcher: precedence is the table order.
const MATCHERS: &[Matcher] = &[
    match_range,
    match_cmp_inclusive,
    match_cmp_exclusive,
    match_negation,
    match_wildcard,
];

/// Scan one scalar value against the capability snapshot.
pub(crate) fn scan_value(val: &str, caps: &Caps) -> ScalarOp {
    for matcher in MATCHERS {
        if let Some(op) = matcher(val, caps) {
            return op;
        }
    }
    ScalarOp::Plain {
        value: val.to_string(),
    }
}

fn match_range(val: &str, caps: &Caps) -> Option<ScalarOp> {
    if !caps.range || !val.contains('|') {
        return None;
    }
    let mut parts = val.split('|');
    let low = parts.next().unwrap_or_default().to_string();
    let high = parts.next().unwrap_or_default().to_string();
    Some(ScalarOp::Range { low, high })
}

fn match_cmp_inclusive(val: &str, caps: &Caps) -> Option<ScalarOp> {
    let op = if caps.lt && val.starts_with("<=") {
        CmpOp::Le
    } else if caps.gt && val.starts_with(">=") {
        CmpOp::Ge
    } else {
        return None;
    };
    Some(ScalarOp::Cmp {
        op,
        rest: val[2..].to_string(),
    })
}

fn match_cmp_exclusive(val: &str, caps: &Caps) -> Option<ScalarOp> {
    let op = if caps.lt && val.starts_with('<') {
        CmpOp::Lt
    } else if caps.gt && val.starts_with('>') {
        CmpOp::Gt
    } else {
        return None;
    };
    Some(ScalarOp::Cmp {
        op,
        rest: val[1..].to_string(),
    })
}

fn match_negation(val: &str, caps: &Caps) -> Option<ScalarOp> {
    if caps.negation && val.starts_with('!') {
        return Some(ScalarOp::Ne {
            rest: val[1..].to_string(),
        });
    }
    None
}

fn match_wildcard(val: &str, caps: &Caps) -> Option<ScalarOp> {
    let leading = val.starts_with('%');
    let trailing = val.ends_with('%');
    let allowed = (caps.wildcard.0 && leading) || (caps.wildcard.1 && trailing);
    // A lone `%` is a literal value, not a wildcard.
    if !allowed || val.chars().count() <= 1 {
        return None;
    }
    Some(ScalarOp::Like {
        pattern: escape_wildcard(val, leading, trailing),
    })
}

/// Strip boundary markers, escape interior `%`, re-add the markers.
fn escape_wildcard(val: &str, leading: bool, trailing: bool) -> String {
    let mut inner = val;
    if leading {
        inner = &inner[1..];
    }
    if trailing {
        inner = &inner[..inner.len() - 1];
    }
    let mut pattern = String::with_capacity(val.len() + 2);
    if leading {
        pattern.push('%');
    }
    pattern.push_str(&inner.replace('%', "\\%"));
    if trailing {
        pattern.push('%');
    }
    pattern
}

/// Split a raw list value into discrete values.
///
/// Free-text string filters use quoted-CSV splitting (commas inside `"…"`
/// are literal); every other list splits on bare commas.
pub(crate) fn split_list(raw: &str, quoted: bool) -> Vec<String> {
    if quoted {
        split_quoted_csv(raw)
    } else {
        raw.split(',').map(str::to_string).collect()
    }
}

/// Quoted-CSV splitting: `"` encloses a field when it opens one, `""` inside
/// an enclosure is a literal quote, commas inside an enclosure are literal.
pub(crate) fn split_quoted_csv(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut field = String::new();
    let mut chars = raw.chars().peekable();
    let mut at_start = true;
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && at_start {
            in_quotes = true;
            at_start = false;
        } else if c == ',' {
            out.push(std::mem::take(&mut field));
            at_start = true;
        } else {
            field.push(c);
            at_start = false;
        }
    }
    out.push(field);
    out
}
