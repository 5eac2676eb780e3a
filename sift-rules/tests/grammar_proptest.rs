//! Property-based tests for the filter grammar, validation and preparation.
//!
//! Random inputs hunt for panics and for drift between what the validator
//! accepts and what the condition builder compiles.

use miniserde::json::{Object, Value as JsonValue};
use proptest::prelude::*;
use sift_rules::prelude::*;

fn endpoint(rule: Rule) -> RuleMap {
    prepare_rules_for_search(
        &RuleMap::new().with("f", rule),
        Some(&SearchValidators::new()),
    )
}

fn data_with(value: &str) -> Object {
    let mut data = Object::new();
    data.insert("f".to_string(), JsonValue::String(value.to_string()));
    data
}

proptest! {
    /// The condition builder is total over arbitrary string filters.
    #[test]
    fn string_conditions_never_panic(value in ".{0,40}") {
        let rules = endpoint(Rule::string());
        let rule = rules.get("f").unwrap();
        let _ = build_conditions("t.f", &JsonValue::String(value), rule);
    }

    /// ... and over arbitrary integer-ish filters.
    #[test]
    fn integer_conditions_never_panic(value in "[-a-zA-Z0-9%!<>=|,.\"]{0,40}") {
        let rules = endpoint(Rule::integer());
        let rule = rules.get("f").unwrap();
        let _ = build_conditions("t.f", &JsonValue::String(value), rule);
    }

    /// Every parameter bound by a fragment appears in its expression.
    #[test]
    fn bound_params_appear_in_expressions(value in "[-a-zA-Z0-9%!<>=|,]{1,30}") {
        let rules = endpoint(Rule::integer());
        let rule = rules.get("f").unwrap();
        let fragments = build_conditions("t.f", &JsonValue::String(value), rule).unwrap();
        for fragment in fragments {
            for (name, _) in &fragment.params {
                prop_assert!(
                    fragment.expression.contains(name.as_str()),
                    "parameter {} missing from `{}`", name, fragment.expression
                );
            }
        }
    }

    /// The validator is total over arbitrary input strings.
    #[test]
    fn validation_never_panics(value in ".{0,40}") {
        let rules = endpoint(Rule::integer());
        let _ = Validator::new().validate(&data_with(&value), &rules);
    }

    /// Canonical integers always pass the integer grammar and compile to
    /// exactly one equality fragment.
    #[test]
    fn canonical_integers_validate_and_compile(n in any::<i64>()) {
        let rules = endpoint(Rule::integer());
        let data = data_with(&n.to_string());

        let errors = Validator::new().validate(&data, &rules);
        prop_assert!(errors.is_empty(), "unexpected errors: {}", errors);

        let compiled = compile_filters(&data, &rules, "t").unwrap();
        prop_assert_eq!(compiled.conditions.len(), 1);
        prop_assert_eq!(compiled.params.len(), 1);
    }

    /// Inclusive ranges of canonical integers validate and produce two
    /// bindings.
    #[test]
    fn integer_ranges_validate_and_compile(a in -10_000i64..10_000, b in -10_000i64..10_000) {
        let rules = endpoint(Rule::integer());
        let data = data_with(&format!("{a}|{b}"));

        prop_assert!(Validator::new().validate(&data, &rules).is_empty());

        let compiled = compile_filters(&data, &rules, "t").unwrap();
        prop_assert_eq!(compiled.params.len(), 2);
    }

    /// Rule preparation is a fixpoint regardless of declared annotations.
    #[test]
    fn preparation_fixpoint(
        list in any::<bool>(),
        range in any::<bool>(),
        negation in any::<bool>(),
        sortable in any::<bool>(),
    ) {
        let rules = RuleMap::new().with(
            "f",
            Rule::integer().list(list).range(range).negation(negation).sortable(sortable),
        );
        let once = prepare_rules_for_search(&rules, None);
        let twice = prepare_rules_for_search(&once, None);

        let a = once.get("f").unwrap();
        let b = twice.get("f").unwrap();
        prop_assert_eq!(a.field_type, b.field_type);
        prop_assert_eq!(a.filter_type, b.filter_type);
        prop_assert_eq!(a.list, b.list);
        prop_assert_eq!(a.range, b.range);
        prop_assert_eq!(a.negation, b.negation);
        prop_assert_eq!(a.sortable, b.sortable);
        prop_assert_eq!(
            &once.get("orderBy").unwrap().columns,
            &twice.get("orderBy").unwrap().columns
        );
    }

    /// Quoted-CSV splitting round-trips values containing commas: each
    /// quoted field reappears verbatim in the compiled `IN` binding.
    #[test]
    fn quoted_csv_round_trips(parts in prop::collection::vec("[a-z,]{1,8}", 2..5)) {
        let rules = endpoint(Rule::string());
        let rule = rules.get("f").unwrap();
        let raw: Vec<String> = parts.iter().map(|p| format!("\"{p}\"")).collect();
        let fragments =
            build_conditions("t.f", &JsonValue::String(raw.join(",")), rule).unwrap();

        prop_assert_eq!(fragments.len(), 1);
        let expected: Vec<Value> = parts.iter().cloned().map(Value::String).collect();
        prop_assert_eq!(&fragments[0].params[0].1, &Value::Array(expected));
    }

    /// Composition is total over arbitrary leaf strings.
    #[test]
    fn compose_never_panics(parts in prop::collection::vec(".{0,20}", 0..5)) {
        let conditions: Vec<Condition> = parts.into_iter().map(Condition::expr).collect();
        let _ = compose(&conditions);
    }

    /// The order-by compiler is total: arbitrary strings either compile or
    /// error, never panic.
    #[test]
    fn order_by_never_panics(raw in ".{0,30}") {
        let rules = endpoint(Rule::string());
        let _ = compile_order_by(Some(&raw), &rules, "t");
    }
}
