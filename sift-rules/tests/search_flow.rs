//! End-to-end search flow: prepare → validate → compile → compose, with the
//! composed WHERE clauses executed against a real SQLite database.
//!
//! The tiny harness below plays the downstream query layer: it expands
//! array-bound `IN` parameters into discrete placeholders and registers an
//! `UNACCENT` SQL function (a Postgres extension the condition builder
//! relies on for accent-insensitive matching).

use miniserde::json::{Number, Object, Value as JsonValue};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ToSql};
use sift_rules::prelude::*;

fn connection() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.create_scalar_function(
        "unaccent",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let s: String = ctx.get(0)?;
            Ok(strip_accents(&s))
        },
    )
    .expect("register unaccent");
    conn.execute_batch(
        "CREATE TABLE people (
            id      INTEGER PRIMARY KEY,
            name    TEXT NOT NULL,
            age     INTEGER NOT NULL,
            active  BOOLEAN NOT NULL,
            status  TEXT NOT NULL,
            created TEXT NOT NULL
        );
        INSERT INTO people VALUES
            (1, 'Ada',   36, true,  'new',  '2020-01-10'),
            (2, 'Grace', 45, false, 'open', '2021-06-01'),
            (3, 'Alan',  41, true,  'open', '2019-03-05'),
            (4, 'Édith', 30, true,  'done', '2022-08-20');",
    )
    .expect("seed table");
    conn
}

fn strip_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

fn endpoint_rules() -> RuleMap {
    prepare_rules_for_search(
        &RuleMap::new()
            .with("name", Rule::string())
            .with("age", Rule::integer())
            .with("active", Rule::boolean())
            .with("status", Rule::string().enum_values(["new", "open", "done"]))
            .with("created", Rule::date()),
        Some(&SearchValidators::new()),
    )
}

fn request(pairs: &[(&str, &str)]) -> Object {
    let mut data = Object::new();
    for (field, value) in pairs {
        data.insert((*field).to_string(), JsonValue::String((*value).to_string()));
    }
    data
}

/// Downstream-query-layer stand-in: arrays expand into discrete named
/// placeholders, everything else binds as-is.
fn expand(clause: &str, params: &[(String, Value)]) -> (String, Vec<(String, SqlValue)>) {
    let mut out = clause.to_string();
    let mut flat = Vec::new();
    for (name, value) in params {
        if let Value::Array(items) = value {
            let names: Vec<String> = (0..items.len()).map(|i| format!("{name}_{i}")).collect();
            out = out.replace(&format!("({name})"), &format!("({})", names.join(", ")));
            for (expanded, item) in names.into_iter().zip(items) {
                flat.push((expanded, sql_value(item)));
            }
        } else {
            flat.push((name.clone(), sql_value(value)));
        }
    }
    (out, flat)
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) => unreachable!("arrays are expanded before binding"),
    }
}

fn search_ids(conn: &Connection, data: &Object, order: Option<&str>) -> Vec<i64> {
    let rules = endpoint_rules();

    let errors = Validator::with_prefix("search.").validate(data, &rules);
    assert!(errors.is_empty(), "request failed validation: {errors}");

    let compiled = compile_filters(data, &rules, "t").expect("compile filters");
    let where_clause = compiled.compose().unwrap_or_else(|| "1 = 1".to_string());
    let order_clause = compile_order_by(order, &rules, "t")
        .expect("compile order by")
        .unwrap_or_else(|| "t.id ASC".to_string());

    let (where_clause, params) = expand(&where_clause, &compiled.params);
    let sql = format!("SELECT t.id FROM people t WHERE {where_clause} ORDER BY {order_clause}");

    let mut stmt = conn.prepare(&sql).expect("prepare statement");
    let refs: Vec<(&str, &dyn ToSql)> = params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();
    let ids = stmt
        .query_map(refs.as_slice(), |row| row.get::<_, i64>(0))
        .expect("run query")
        .collect::<Result<Vec<_>, _>>()
        .expect("collect rows");
    ids
}

#[test]
fn range_filter_selects_inclusive_bounds() {
    let conn = connection();
    let ids = search_ids(&conn, &request(&[("age", "30|36")]), None);
    assert_eq!(ids, vec![1, 4]);
}

#[test]
fn comparison_filters() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("age", ">=41")]), None),
        vec![2, 3]
    );
    assert_eq!(
        search_ids(&conn, &request(&[("age", "<36")]), None),
        vec![4]
    );
}

#[test]
fn negation_filter() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("age", "!36")]), None),
        vec![2, 3, 4]
    );
}

#[test]
fn wildcard_filter_is_case_and_accent_insensitive() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("name", "%AD%")]), None),
        vec![1]
    );
    // é matches E through UNACCENT on both sides.
    assert_eq!(
        search_ids(&conn, &request(&[("name", "%éd%")]), None),
        vec![4]
    );
}

#[test]
fn enum_list_compiles_to_in() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("status", "new,open")]), None),
        vec![1, 2, 3]
    );
    assert_eq!(
        search_ids(&conn, &request(&[("status", "!new,open")]), None),
        vec![4]
    );
}

#[test]
fn numeric_list_compiles_to_in() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("age", "30,45")]), None),
        vec![2, 4]
    );
}

#[test]
fn boolean_filter_uses_literal() {
    let conn = connection();
    let mut data = Object::new();
    data.insert("active".to_string(), JsonValue::Bool(true));
    assert_eq!(search_ids(&conn, &data, None), vec![1, 3, 4]);
}

#[test]
fn date_comparison() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &request(&[("created", "<2021-01-01")]), None),
        vec![1, 3]
    );
    assert_eq!(
        search_ids(
            &conn,
            &request(&[("created", "2020-01-01|2021-12-31")]),
            None
        ),
        vec![1, 2]
    );
}

#[test]
fn combined_filters_are_and_joined() {
    let conn = connection();
    let mut data = request(&[("age", ">=35")]);
    data.insert("active".to_string(), JsonValue::Bool(true));
    assert_eq!(search_ids(&conn, &data, None), vec![1, 3]);
}

#[test]
fn mixed_list_or_combines_within_the_field() {
    let conn = connection();
    // One field, two grammars: >44 OR exactly 30.
    assert_eq!(
        search_ids(&conn, &request(&[("age", ">44,30")]), None),
        vec![2, 4]
    );
}

#[test]
fn order_by_drives_row_order() {
    let conn = connection();
    assert_eq!(
        search_ids(&conn, &Object::new(), Some("age|DESC")),
        vec![2, 3, 1, 4]
    );
    assert_eq!(
        search_ids(&conn, &Object::new(), Some("status,name|ASC")),
        vec![4, 1, 3, 2]
    );
}

#[test]
fn invalid_filter_value_is_rejected_before_compilation() {
    let rules = endpoint_rules();
    let data = request(&[("age", "abc")]);
    let errors = Validator::with_prefix("search.").validate(&data, &rules);
    assert_eq!(
        errors.codes(),
        vec![(
            "age".to_string(),
            "search.validator.invalid_format".to_string()
        )]
    );
}

#[test]
fn enum_value_outside_the_set_is_rejected() {
    let rules = endpoint_rules();
    let data = request(&[("status", "archived")]);
    let errors = Validator::with_prefix("search.").validate(&data, &rules);
    assert_eq!(
        errors.get("status").map(FieldError::code),
        Some("validator.invalid_format")
    );
}

#[test]
fn unknown_order_by_column_is_rejected_by_validation() {
    let rules = endpoint_rules();
    let data = request(&[("orderBy", "password")]);
    let errors = Validator::with_prefix("search.").validate(&data, &rules);
    assert!(errors.get("orderBy").is_some());
    // And the compiler refuses it outright as well.
    assert!(matches!(
        compile_order_by(Some("password"), &rules, "t"),
        Err(ConfigError::UnknownSortField { .. })
    ));
}

#[test]
fn limit_offset_and_order_by_never_filter() {
    let conn = connection();
    let mut data = Object::new();
    data.insert("limit".to_string(), JsonValue::Number(Number::U64(10)));
    data.insert("offset".to_string(), JsonValue::Number(Number::U64(5)));
    data.insert("orderBy".to_string(), JsonValue::String("age".to_string()));
    assert_eq!(search_ids(&conn, &data, None), vec![1, 2, 3, 4]);
}
