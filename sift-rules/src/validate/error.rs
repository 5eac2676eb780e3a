//! Error types for validation and filter compilation.
//!
//! Two families with very different audiences:
//!
//! - [`FieldError`]: expected, per-field outcomes of validating user input.
//!   Collected into a [`ValidationErrors`] map and rendered as a 4xx
//!   response by the caller.
//! - [`ConfigError`]: programming mistakes in rule declarations (bad regex,
//!   unknown sort column, callback failures). Surfaced distinctly so callers
//!   can map them to 5xx instead of blaming the user.

use crate::rules::FieldType;
use std::fmt;

/// A mistake in the rule declarations themselves, not in user input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A rule's regex failed to compile.
    InvalidRegex {
        /// Label of the field carrying the regex.
        label: String,
        /// The offending pattern.
        pattern: String,
    },
    /// Validation was requested with a missing/empty rule set.
    MissingRules,
    /// The order-by string names a field that is neither ruled nor
    /// allow-listed.
    UnknownSortField {
        /// The rejected field name.
        field: String,
    },
    /// An order-by segment is malformed (`field|DIR|extra`, bad direction).
    InvalidSortSegment {
        /// The rejected segment.
        segment: String,
    },
    /// A condition callback reported a configuration problem.
    Callback {
        /// Diagnostic name of the callback.
        name: String,
        /// What went wrong.
        message: String,
    },
}

impl ConfigError {
    /// Stable error code. Configuration codes always live under the
    /// `internal.` namespace, independent of any validator prefix.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegex { .. } => "internal.validator.invalid_regex",
            Self::MissingRules => "internal.validator.missing_rules",
            Self::UnknownSortField { .. } => "internal.filter.unknown_sort_field",
            Self::InvalidSortSegment { .. } => "internal.filter.invalid_sort_segment",
            Self::Callback { .. } => "internal.filter.callback",
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { label, pattern } => {
                write!(f, "invalid regex `{pattern}` declared for `{label}`")
            },
            Self::MissingRules => write!(f, "validation requested without rules"),
            Self::UnknownSortField { field } => {
                write!(f, "field `{field}` is not sortable")
            },
            Self::InvalidSortSegment { segment } => {
                write!(f, "malformed order-by segment `{segment}`")
            },
            Self::Callback { name, message } => {
                write!(f, "condition callback `{name}` failed: {message}")
            },
        }
    }
}

impl std::error::Error for ConfigError {}

/// Outcome of validating one field of user input.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldError {
    /// A required field is absent.
    MissingRequired {
        /// Field label.
        label: String,
    },
    /// The field is present but empty and emptiness is not allowed.
    Empty {
        /// Field label.
        label: String,
    },
    /// The value has the wrong type.
    WrongType {
        /// Field label.
        label: String,
        /// Declared type.
        expected: FieldType,
        /// Name of the type actually received.
        got: &'static str,
    },
    /// A numeric value is outside its declared bounds.
    InvalidNumericLength {
        /// Field label.
        label: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A string/array length is outside its declared bounds.
    InvalidStringLength {
        /// Field label.
        label: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// The value does not match the declared format (regex, enum, filter
    /// micro-grammar, date).
    InvalidFormat {
        /// Field label.
        label: String,
    },
    /// Two different options of the same choice group were supplied.
    MultipleOptionsChosen {
        /// Label of the field selecting the second option.
        label: String,
        /// Choice group id.
        group: String,
    },
    /// A required choice group received no option at all.
    NoOptionChosen {
        /// Choice group id.
        group: String,
    },
    /// A custom hook rejected the field under its own code.
    Custom {
        /// Hook-defined error code (rendered under the validator prefix).
        code: String,
        /// Field label.
        label: String,
    },
    /// A configuration error surfaced while validating this field.
    Internal(ConfigError),
}

impl FieldError {
    /// Stable error code without the validator prefix;
    /// [`FieldError::Internal`] codes come fully qualified from
    /// [`ConfigError::code`].
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::MissingRequired { .. } => "validator.missing_required_info",
            Self::Empty { .. } => "validator.empty_info",
            Self::WrongType { .. } => "validator.wrong_type",
            Self::InvalidNumericLength { .. } => "validator.invalid_numeric_length",
            Self::InvalidStringLength { .. } => "validator.invalid_string_length",
            Self::InvalidFormat { .. } => "validator.invalid_format",
            Self::MultipleOptionsChosen { .. } => "validator.multiple_options_chosen",
            Self::NoOptionChosen { .. } => "validator.no_option_chosen",
            Self::Custom { code, .. } => code,
            Self::Internal(e) => e.code(),
        }
    }

    /// Whether this error denotes a programming mistake rather than bad
    /// user input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired { label } => write!(f, "`{label}` is required"),
            Self::Empty { label } => write!(f, "`{label}` must not be empty"),
            Self::WrongType {
                label,
                expected,
                got,
            } => write!(
                f,
                "`{label}` expects {}, got {got}",
                expected.name()
            ),
            Self::InvalidNumericLength { label, min, max } => {
                write!(f, "`{label}` must be between {min} and {max}")
            },
            Self::InvalidStringLength { label, min, max } => {
                write!(f, "`{label}` length must be between {min} and {max}")
            },
            Self::InvalidFormat { label } => write!(f, "`{label}` has an invalid format"),
            Self::MultipleOptionsChosen { label, group } => {
                write!(
                    f,
                    "`{label}` selects a second option of choice group `{group}`"
                )
            },
            Self::NoOptionChosen { group } => {
                write!(f, "no option supplied for choice group `{group}`")
            },
            Self::Custom { code, label } => write!(f, "`{label}` rejected ({code})"),
            Self::Internal(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for FieldError {}

impl From<ConfigError> for FieldError {
    fn from(e: ConfigError) -> Self {
        Self::Internal(e)
    }
}

/// Collected validation errors, keyed by field path.
///
/// Paths use dotted segments and bracketed indices (`a.b[2].c`). At most one
/// error is kept per path; a later error for the same path replaces the
/// earlier one. An empty set means the input is valid.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    prefix: String,
    errors: Vec<(String, FieldError)>,
}

impl ValidationErrors {
    /// Empty error set with no code prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty error set whose codes render under `prefix` (e.g. `"search."`).
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            errors: Vec::new(),
        }
    }

    /// Record an error for a field path, replacing any earlier one.
    pub fn add(&mut self, path: impl Into<String>, error: FieldError) {
        let path = path.into();
        if let Some(entry) = self.errors.iter_mut().find(|(p, _)| *p == path) {
            entry.1 = error;
        } else {
            self.errors.push((path, error));
        }
    }

    /// Error recorded for a path, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FieldError> {
        self.errors
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, e)| e)
    }

    /// Iterate `(path, error)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.errors.iter().map(|(p, e)| (p.as_str(), e))
    }

    /// Number of failed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the input validated cleanly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any recorded error is a configuration error. Callers should
    /// answer 5xx instead of 4xx when this is set.
    #[must_use]
    pub fn has_internal(&self) -> bool {
        self.errors.iter().any(|(_, e)| e.is_internal())
    }

    /// `(path, fully-prefixed code)` pairs for response building. Internal
    /// codes are never prefixed: they already live under `internal.`.
    #[must_use]
    pub fn codes(&self) -> Vec<(String, String)> {
        self.errors
            .iter()
            .map(|(path, e)| {
                let code = if e.is_internal() {
                    e.code().to_string()
                } else {
                    format!("{}{}", self.prefix, e.code())
                };
                (path.clone(), code)
            })
            .collect()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Err` with the collected errors when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, e)) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{path}: {e}")?;
        }
        Ok(())
    }
}
