//! Benchmarks for condition building and composition.
//!
//! Run with: cargo bench -p sift-rules

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use miniserde::json::Value as JsonValue;
use sift_rules::prelude::*;
use std::hint::black_box;

fn bench_build_conditions(c: &mut Criterion) {
    let rules = prepare_rules_for_search(
        &RuleMap::new()
            .with("age", Rule::integer())
            .with("name", Rule::string()),
        None,
    );
    let age = rules.get("age").unwrap();
    let name = rules.get("name").unwrap();

    let mut group = c.benchmark_group("build_conditions");

    let integer_cases = [
        ("plain", "42"),
        ("range", "10|20"),
        ("comparison", ">=18"),
        ("negation", "!5"),
        ("list", "1,2,3,4,5,6,7,8"),
        ("mixed_list", "1,>5,8|9,!3"),
    ];
    for (label, value) in integer_cases {
        group.bench_with_input(BenchmarkId::new("integer", label), value, |b, v| {
            b.iter(|| {
                build_conditions(
                    black_box("t.age"),
                    &JsonValue::String((*v).to_string()),
                    age,
                )
            });
        });
    }

    let string_cases = [
        ("wildcard", "%abc%"),
        ("quoted_list", "a,b,\"c,d\",e"),
    ];
    for (label, value) in string_cases {
        group.bench_with_input(BenchmarkId::new("string", label), value, |b, v| {
            b.iter(|| {
                build_conditions(
                    black_box("t.name"),
                    &JsonValue::String((*v).to_string()),
                    name,
                )
            });
        });
    }

    group.finish();
}

fn bench_compose(c: &mut Criterion) {
    let conditions: Vec<Condition> = (0..20)
        .map(|i| {
            Condition::Any(vec![
                Condition::expr(format!("t.a{i} = :p{i}")),
                Condition::expr(format!("t.b{i} IS NULL")),
            ])
        })
        .collect();

    c.bench_function("compose_20_or_groups", |b| {
        b.iter(|| compose(black_box(&conditions)));
    });
}

criterion_group!(benches, bench_build_conditions, bench_compose);
criterion_main!(benches);
