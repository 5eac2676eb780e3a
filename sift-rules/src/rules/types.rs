//! Core types for the declarative rule model.

use crate::filter::ConditionFragment;
use crate::validate::{ConfigError, FieldError};
use miniserde::json::Object;
use std::fmt;
use std::sync::Arc;

/// Declared data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// Whole number (an integral float is accepted too).
    Integer,
    /// Floating point number (an int is accepted too).
    Float,
    /// `true` / `false`.
    Boolean,
    /// Nested key/value structure, validated via nested rules.
    Object,
    /// JSON array, either a struct-per-element or an array of scalars.
    Array,
}

impl FieldType {
    /// Lowercase name used in error parameters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Resolved recursion shape of a rule.
///
/// Rules are consumed through this closed set of variants instead of probing
/// the value shape at every step: exactly one variant governs how (and
/// whether) validation recurses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleShape {
    /// A plain scalar (`String`, `Integer`, `Float`, `Boolean`).
    Scalar(FieldType),
    /// An `Object` (or keyed `Array`) validated against `nested` rules.
    Struct,
    /// An `Array` whose elements are scalars of the given type.
    ArrayOfScalar(FieldType),
    /// An `Array` whose elements are structs validated against `nested`.
    ArrayOfStruct,
}

/// Mutually-exclusive option membership for a field.
///
/// All fields sharing a `group` belong to the same choice group; each carries
/// the `option` it selects. At most one option may be present in the input,
/// and (unless the group is optional) at least one must be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceGroup {
    /// Group identifier.
    pub group: String,
    /// Option this field selects within the group.
    pub option: u32,
    /// Whether the group must be supplied. Only read from the first field
    /// declaring the group; `None` means required.
    pub required: Option<bool>,
}

/// A sortable column exposed through the `orderBy` allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortColumn {
    /// Name accepted in the order-by string.
    pub name: String,
    /// Real column expression to sort by; defaults to `alias.name`.
    pub expr: Option<String>,
}

impl SortColumn {
    /// Column sorted as `alias.name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: None,
        }
    }

    /// Column whose order-by expression differs from its exposed name.
    pub fn with_expr(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: Some(expr.into()),
        }
    }
}

/// Operand override for range filters against computed expressions.
///
/// Some query layers reject a computed expression (or subquery) as the left
/// operand of `BETWEEN`; declaring an operand switches the fragment to the
/// inverse form `:lo <= expr AND :hi >= expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetweenOperand {
    /// One expression compared against both bounds.
    Single(String),
    /// Distinct expressions for the low and high comparisons.
    Pair(String, String),
}

impl BetweenOperand {
    /// Expression compared against the low bound.
    #[must_use]
    pub fn low(&self) -> &str {
        match self {
            Self::Single(e) | Self::Pair(e, _) => e,
        }
    }

    /// Expression compared against the high bound.
    #[must_use]
    pub fn high(&self) -> &str {
        match self {
            Self::Single(e) | Self::Pair(_, e) => e,
        }
    }
}

/// A named boolean predicate over the input map.
///
/// Replaces expression-from-configuration evaluation for conditional
/// `required` rules: the author registers a plain function, the name exists
/// for `Debug` output only.
#[derive(Clone)]
pub struct Predicate {
    name: &'static str,
    func: Arc<dyn Fn(&Object) -> bool + Send + Sync>,
}

impl Predicate {
    /// Wrap a function under a diagnostic name.
    pub fn new(name: &'static str, func: impl Fn(&Object) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    /// Evaluate the predicate against the input map.
    #[must_use]
    pub fn eval(&self, data: &Object) -> bool {
        (self.func)(data)
    }

    /// Diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

/// A named per-field validation hook.
///
/// Receives the field name, the full input map and the rule, so hooks can
/// read sibling fields and any rule annotation.
#[derive(Clone)]
pub struct CustomValidator {
    name: &'static str,
    #[allow(clippy::type_complexity)]
    func: Arc<dyn Fn(&str, &Object, &Rule) -> Result<(), FieldError> + Send + Sync>,
}

impl CustomValidator {
    /// Wrap a function under a diagnostic name.
    pub fn new(
        name: &'static str,
        func: impl Fn(&str, &Object, &Rule) -> Result<(), FieldError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    /// Run the hook for one field.
    ///
    /// # Errors
    ///
    /// Returns the hook's `FieldError` verbatim; internal errors are carried
    /// through [`FieldError::Internal`].
    pub fn run(&self, field: &str, data: &Object, rule: &Rule) -> Result<(), FieldError> {
        (self.func)(field, data, rule)
    }

    /// Diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomValidator({})", self.name)
    }
}

/// A named callback producing a custom condition fragment for a field.
///
/// Receives the (list-split) filter values and the rule. Returning
/// `Ok(None)` drops the field from the compiled filter.
#[derive(Clone)]
pub struct ConditionCallback {
    name: &'static str,
    #[allow(clippy::type_complexity)]
    func: Arc<dyn Fn(&[String], &Rule) -> Result<Option<ConditionFragment>, ConfigError> + Send + Sync>,
}

impl ConditionCallback {
    /// Wrap a function under a diagnostic name.
    pub fn new(
        name: &'static str,
        func: impl Fn(&[String], &Rule) -> Result<Option<ConditionFragment>, ConfigError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    /// Build the fragment for one field's values.
    ///
    /// # Errors
    ///
    /// Propagates any `ConfigError` raised by the callback.
    pub fn run(&self, values: &[String], rule: &Rule) -> Result<Option<ConditionFragment>, ConfigError> {
        (self.func)(values, rule)
    }

    /// Diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ConditionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConditionCallback({})", self.name)
    }
}

/// Per-field declarative rule driving validation, filtering and sorting.
///
/// Filter annotations (`wildcard`, `list`, `range`, `gt`, `lt`, `negation`,
/// `sortable`) are tri-state: `None` means "not declared", which the
/// preparer fills with defaults and the condition builder treats as
/// disabled.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Declared type. Widened to `String` by the preparer for all filter
    /// purposes except booleans.
    pub field_type: FieldType,
    /// Original semantic type, set by the preparer. Doubles as the
    /// already-prepared marker.
    pub filter_type: Option<FieldType>,
    /// Literal required flag.
    pub required: Option<bool>,
    /// Conditional required: overrides `required` when present.
    pub required_if: Option<Predicate>,
    /// Whether an empty value (`null`, `""`, `[]`, `{}`) is acceptable.
    pub empty: Option<bool>,
    /// Shorthand: `true` ⇒ required and non-empty, `false` ⇒ required but
    /// may be empty. Overridden by `required`/`empty`.
    pub require_filled: Option<bool>,
    /// Human label used in error parameters; defaults to the field path.
    pub label: Option<String>,
    /// Inclusive bounds: the value itself for numbers, character count for
    /// strings, element count for arrays.
    pub length: Option<(f64, f64)>,
    /// Regex the (stringified) value must match.
    pub regex: Option<String>,
    /// Mutually-exclusive option membership.
    pub choice_group: Option<ChoiceGroup>,
    /// Rules for nested object/array-of-object values.
    pub nested: Option<RuleMap>,
    /// Element type for `Array` rules holding multiple elements.
    pub of: Option<FieldType>,
    /// Date-typed string filter (validated and range-compared as a date).
    pub date: bool,
    /// `chrono` format for date rules; defaults to `%Y-%m-%d`.
    pub date_fmt: Option<String>,
    /// Closed set of accepted values.
    pub enum_values: Option<Vec<String>>,
    /// Wildcard markers allowed at the (front, back) of the value.
    pub wildcard: Option<(bool, bool)>,
    /// Comma-separated multi-value filters allowed.
    pub list: Option<bool>,
    /// `low|high` range filters allowed.
    pub range: Option<bool>,
    /// `>` / `>=` prefixes allowed.
    pub gt: Option<bool>,
    /// `<` / `<=` prefixes allowed.
    pub lt: Option<bool>,
    /// `!` prefix allowed.
    pub negation: Option<bool>,
    /// Field may appear in the order-by string.
    pub sortable: Option<bool>,
    /// Validation hook.
    pub custom: Option<CustomValidator>,
    /// Full column expression (with alias) overriding the default.
    pub column: Option<String>,
    /// Table alias overriding the default when `column` is unset.
    pub alias: Option<String>,
    /// Condition template with `{VALUE}` / `{OPERATION_VALUE}` placeholders.
    pub condition_template: Option<String>,
    /// Condition-building callback; wins over the template.
    pub condition_callback: Option<ConditionCallback>,
    /// Skip this field entirely during filter compilation.
    pub ignore_filter: bool,
    /// Sort expression with `{DIRECTION}` / `{INVERSE_DIRECTION}`.
    pub sort_expr: Option<String>,
    /// Inverse-form range operands for computed columns.
    pub avoid_between_operand: Option<BetweenOperand>,
    /// Order-by allow-list; populated by the preparer on the `orderBy` rule.
    pub columns: Vec<SortColumn>,
}

impl Rule {
    /// New rule of the given type with nothing declared.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            filter_type: None,
            required: None,
            required_if: None,
            empty: None,
            require_filled: None,
            label: None,
            length: None,
            regex: None,
            choice_group: None,
            nested: None,
            of: None,
            date: false,
            date_fmt: None,
            enum_values: None,
            wildcard: None,
            list: None,
            range: None,
            gt: None,
            lt: None,
            negation: None,
            sortable: None,
            custom: None,
            column: None,
            alias: None,
            condition_template: None,
            condition_callback: None,
            ignore_filter: false,
            sort_expr: None,
            avoid_between_operand: None,
            columns: Vec::new(),
        }
    }

    /// String-typed rule.
    #[must_use]
    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Integer-typed rule.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    /// Float-typed rule.
    #[must_use]
    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    /// Boolean-typed rule.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Object-typed rule validated against nested rules.
    #[must_use]
    pub fn object(nested: RuleMap) -> Self {
        Self::new(FieldType::Object).nested(nested)
    }

    /// Array-typed rule; combine with [`of`](Self::of) and/or
    /// [`nested`](Self::nested).
    #[must_use]
    pub fn array() -> Self {
        Self::new(FieldType::Array)
    }

    /// Date-typed string rule (default format `%Y-%m-%d`).
    #[must_use]
    pub fn date() -> Self {
        let mut r = Self::new(FieldType::String);
        r.date = true;
        r
    }

    /// Resolve the recursion shape from `field_type` and `of`.
    #[must_use]
    pub fn shape(&self) -> RuleShape {
        match (self.field_type, self.of) {
            (FieldType::Array, Some(FieldType::Object | FieldType::Array)) => {
                RuleShape::ArrayOfStruct
            },
            (FieldType::Array, Some(elem)) => RuleShape::ArrayOfScalar(elem),
            (FieldType::Object | FieldType::Array, None) => RuleShape::Struct,
            (scalar, _) => RuleShape::Scalar(scalar),
        }
    }

    /// Semantic type for filter purposes: the preserved original type when
    /// prepared, the declared type otherwise.
    #[must_use]
    pub fn semantic_type(&self) -> FieldType {
        self.filter_type.unwrap_or(self.field_type)
    }

    /// Set the literal required flag.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Make `required` conditional on the input map.
    #[must_use]
    pub fn required_if(mut self, predicate: Predicate) -> Self {
        self.required_if = Some(predicate);
        self
    }

    /// Allow or forbid empty values.
    #[must_use]
    pub fn empty_allowed(mut self, empty: bool) -> Self {
        self.empty = Some(empty);
        self
    }

    /// Shorthand for required-and-filled (`true`) or required-but-may-be-
    /// empty (`false`).
    #[must_use]
    pub fn require_filled(mut self, filled: bool) -> Self {
        self.require_filled = Some(filled);
        self
    }

    /// Human label for error messages.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Inclusive value/length bounds.
    #[must_use]
    pub fn length(mut self, min: impl Into<f64>, max: impl Into<f64>) -> Self {
        self.length = Some((min.into(), max.into()));
        self
    }

    /// Fixed value/length.
    #[must_use]
    pub fn exact_length(mut self, len: impl Into<f64> + Copy) -> Self {
        self.length = Some((len.into(), len.into()));
        self
    }

    /// Regex the value must match.
    #[must_use]
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    /// Join a required choice group under the given option.
    #[must_use]
    pub fn choice_group(mut self, group: impl Into<String>, option: u32) -> Self {
        self.choice_group = Some(ChoiceGroup {
            group: group.into(),
            option,
            required: None,
        });
        self
    }

    /// Join an optional choice group under the given option. Only the first
    /// field declaring the group decides whether it is optional.
    #[must_use]
    pub fn choice_group_optional(mut self, group: impl Into<String>, option: u32) -> Self {
        self.choice_group = Some(ChoiceGroup {
            group: group.into(),
            option,
            required: Some(false),
        });
        self
    }

    /// Rules applied to the nested object (or to each struct element).
    #[must_use]
    pub fn nested(mut self, rules: RuleMap) -> Self {
        self.nested = Some(rules);
        self
    }

    /// Element type for a multi-element array.
    #[must_use]
    pub fn of(mut self, elem: FieldType) -> Self {
        self.of = Some(elem);
        self
    }

    /// `chrono` format used by date validation.
    #[must_use]
    pub fn date_fmt(mut self, fmt: impl Into<String>) -> Self {
        self.date_fmt = Some(fmt.into());
        self
    }

    /// Restrict values to a closed set.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Allow wildcard markers at the front and/or back.
    #[must_use]
    pub fn wildcard(mut self, front: bool, back: bool) -> Self {
        self.wildcard = Some((front, back));
        self
    }

    /// Allow comma-separated multi-value filters.
    #[must_use]
    pub fn list(mut self, list: bool) -> Self {
        self.list = Some(list);
        self
    }

    /// Allow `low|high` range filters.
    #[must_use]
    pub fn range(mut self, range: bool) -> Self {
        self.range = Some(range);
        self
    }

    /// Allow `>` / `>=` prefixes.
    #[must_use]
    pub fn gt(mut self, gt: bool) -> Self {
        self.gt = Some(gt);
        self
    }

    /// Allow `<` / `<=` prefixes.
    #[must_use]
    pub fn lt(mut self, lt: bool) -> Self {
        self.lt = Some(lt);
        self
    }

    /// Allow the `!` negation prefix.
    #[must_use]
    pub fn negation(mut self, negation: bool) -> Self {
        self.negation = Some(negation);
        self
    }

    /// Allow/forbid sorting by this field.
    #[must_use]
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = Some(sortable);
        self
    }

    /// Attach a validation hook.
    #[must_use]
    pub fn custom(mut self, validator: CustomValidator) -> Self {
        self.custom = Some(validator);
        self
    }

    /// Full column expression (with alias).
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Table alias used when `column` is unset.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Condition template with `{VALUE}` or `{OPERATION_VALUE}`.
    #[must_use]
    pub fn condition_template(mut self, template: impl Into<String>) -> Self {
        self.condition_template = Some(template.into());
        self
    }

    /// Condition-building callback.
    #[must_use]
    pub fn condition_callback(mut self, callback: ConditionCallback) -> Self {
        self.condition_callback = Some(callback);
        self
    }

    /// Exclude the field from filter compilation.
    #[must_use]
    pub fn ignore_filter(mut self) -> Self {
        self.ignore_filter = true;
        self
    }

    /// Sort expression with `{DIRECTION}` / `{INVERSE_DIRECTION}`.
    #[must_use]
    pub fn sort_expr(mut self, expr: impl Into<String>) -> Self {
        self.sort_expr = Some(expr.into());
        self
    }

    /// Inverse-form range comparison against one operand expression.
    #[must_use]
    pub fn avoid_between(mut self, operand: impl Into<String>) -> Self {
        self.avoid_between_operand = Some(BetweenOperand::Single(operand.into()));
        self
    }

    /// Inverse-form range comparison with distinct low/high operands.
    #[must_use]
    pub fn avoid_between_pair(mut self, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.avoid_between_operand = Some(BetweenOperand::Pair(low.into(), high.into()));
        self
    }

    /// Declare extra order-by columns (meaningful on the `orderBy` rule).
    #[must_use]
    pub fn columns(mut self, columns: Vec<SortColumn>) -> Self {
        self.columns = columns;
        self
    }
}

/// Insertion-ordered map of field name → [`Rule`].
///
/// Order is semantic: the choice-group pass and error reporting follow
/// rule-map order, so the map preserves the order fields were declared in.
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    entries: Vec<(String, Rule)>,
}

impl RuleMap {
    /// Empty rule map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add (or replace) a field's rule, fluently.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, rule: Rule) -> Self {
        self.insert(field, rule);
        self
    }

    /// Add (or replace) a field's rule.
    pub fn insert(&mut self, field: impl Into<String>, rule: Rule) {
        let field = field.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == field) {
            entry.1 = rule;
        } else {
            self.entries.push((field, rule));
        }
    }

    /// Remove and return a field's rule.
    pub fn remove(&mut self, field: &str) -> Option<Rule> {
        let pos = self.entries.iter().position(|(name, _)| name == field)?;
        Some(self.entries.remove(pos).1)
    }

    /// Look up a field's rule.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Rule> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rule)| rule)
    }

    /// Whether a rule exists for the field.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    /// Iterate rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.entries.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Rule)> for RuleMap {
    fn from_iter<T: IntoIterator<Item = (String, Rule)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (field, rule) in iter {
            map.insert(field, rule);
        }
        map
    }
}
