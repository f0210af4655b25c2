//! Tests for bind values and named-parameter expansion

use std::collections::HashSet;

use crate::args::{Arg, expand_named};
use crate::error::RepoError;

#[test]
fn test_expand_named_orders_binds_by_occurrence() {
    let (sql, binds) = expand_named(
        "SELECT * FROM users WHERE active = :active AND name = :name",
        &[("name", Arg::from("Alice")), ("active", Arg::from(true))],
    )
    .unwrap();

    assert_eq!(sql, "SELECT * FROM users WHERE active = ? AND name = ?");
    assert_eq!(binds, vec![Arg::Bool(true), Arg::Text("Alice".to_string())]);
}

#[test]
fn test_expand_named_repeats_parameter() {
    let (sql, binds) = expand_named(
        "SELECT * FROM users WHERE name = :name OR email LIKE :name",
        &[("name", Arg::from("Alice"))],
    )
    .unwrap();

    assert_eq!(sql, "SELECT * FROM users WHERE name = ? OR email LIKE ?");
    assert_eq!(binds.len(), 2);
    assert_eq!(binds[0], binds[1]);
}

#[test]
fn test_expand_named_skips_quoted_literals() {
    let (sql, binds) = expand_named(
        "SELECT * FROM users WHERE note = ':notaparam' AND \"weird:col\" = :id",
        &[("id", Arg::from(7i64))],
    )
    .unwrap();

    assert_eq!(
        sql,
        "SELECT * FROM users WHERE note = ':notaparam' AND \"weird:col\" = ?"
    );
    assert_eq!(binds, vec![Arg::Integer(7)]);
}

#[test]
fn test_expand_named_passes_bare_colon_through() {
    let (sql, binds) = expand_named("SELECT strftime('%H:%M', last_login) FROM users", &[]).unwrap();

    assert_eq!(sql, "SELECT strftime('%H:%M', last_login) FROM users");
    assert!(binds.is_empty());
}

#[test]
fn test_expand_named_rejects_unbound_parameter() {
    let result = expand_named(
        "SELECT * FROM users WHERE name = :name",
        &[("other", Arg::from("x"))],
    );

    assert!(matches!(result, Err(RepoError::MalformedQuery(_))));
}

#[test]
fn test_expand_named_ignores_unused_entries() {
    let (sql, binds) = expand_named(
        "SELECT * FROM users WHERE name = :name",
        &[("name", Arg::from("Alice")), ("unused", Arg::from(1i64))],
    )
    .unwrap();

    assert_eq!(sql, "SELECT * FROM users WHERE name = ?");
    assert_eq!(binds.len(), 1);
}

#[test]
fn test_arg_from_option() {
    assert_eq!(Arg::from(None::<i64>), Arg::Null);
    assert_eq!(Arg::from(Some(3i64)), Arg::Integer(3));
    assert_eq!(Arg::from(Some("x")), Arg::Text("x".to_string()));
}

#[test]
fn test_real_args_compare_by_bit_pattern() {
    assert_eq!(Arg::Real(1.5), Arg::Real(1.5));
    assert_ne!(Arg::Real(1.5), Arg::Real(2.5));
    // NaN equals itself, so identifier sets stay well behaved
    assert_eq!(Arg::Real(f64::NAN), Arg::Real(f64::NAN));

    let mut seen = HashSet::new();
    assert!(seen.insert(Arg::Real(f64::NAN)));
    assert!(!seen.insert(Arg::Real(f64::NAN)));
}

#[test]
fn test_arg_variants_are_distinct() {
    assert_ne!(Arg::Integer(1), Arg::Bool(true));
    assert_ne!(Arg::Null, Arg::Text(String::new()));
    assert_ne!(Arg::Integer(0), Arg::Real(0.0));
}
