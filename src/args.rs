//! Bind values for runtime-built queries
//!
//! Entity fields and caller-supplied parameters flow into queries as [`Arg`]
//! values, which know how to bind themselves onto the sqlx query types. Named
//! parameters (`:name`) are rewritten into positional binds by
//! [`expand_named`], since sqlx runtime queries bind by position only.

use std::fmt::Display;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::SqliteArguments;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::error::{RepoError, Result};

/// A value bindable into a SQLite query
#[derive(Debug, Clone)]
pub enum Arg {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Bool(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Arg {
    /// Bind this value onto a plain query
    pub fn bind<'q>(
        self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Arg::Null => query.bind(Option::<String>::None),
            Arg::Integer(v) => query.bind(v),
            Arg::Real(v) => query.bind(v),
            Arg::Text(v) => query.bind(v),
            Arg::Blob(v) => query.bind(v),
            Arg::Bool(v) => query.bind(v),
            Arg::Uuid(v) => query.bind(v),
            Arg::DateTime(v) => query.bind(v),
            Arg::Json(v) => query.bind(v.to_string()),
        }
    }

    /// Bind this value onto a typed query
    pub fn bind_as<'q, O>(
        self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
        match self {
            Arg::Null => query.bind(Option::<String>::None),
            Arg::Integer(v) => query.bind(v),
            Arg::Real(v) => query.bind(v),
            Arg::Text(v) => query.bind(v),
            Arg::Blob(v) => query.bind(v),
            Arg::Bool(v) => query.bind(v),
            Arg::Uuid(v) => query.bind(v),
            Arg::DateTime(v) => query.bind(v),
            Arg::Json(v) => query.bind(v.to_string()),
        }
    }

    /// Push this value as a bind onto a query builder
    pub fn push_to(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Arg::Null => builder.push_bind(Option::<String>::None),
            Arg::Integer(v) => builder.push_bind(v),
            Arg::Real(v) => builder.push_bind(v),
            Arg::Text(v) => builder.push_bind(v),
            Arg::Blob(v) => builder.push_bind(v),
            Arg::Bool(v) => builder.push_bind(v),
            Arg::Uuid(v) => builder.push_bind(v),
            Arg::DateTime(v) => builder.push_bind(v),
            Arg::Json(v) => builder.push_bind(v.to_string()),
        };
    }
}

// Reals compare and hash by bit pattern so identifier values can key the
// distinct-root transformer.
impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Null, Arg::Null) => true,
            (Arg::Integer(a), Arg::Integer(b)) => a == b,
            (Arg::Real(a), Arg::Real(b)) => a.to_bits() == b.to_bits(),
            (Arg::Text(a), Arg::Text(b)) => a == b,
            (Arg::Blob(a), Arg::Blob(b)) => a == b,
            (Arg::Bool(a), Arg::Bool(b)) => a == b,
            (Arg::Uuid(a), Arg::Uuid(b)) => a == b,
            (Arg::DateTime(a), Arg::DateTime(b)) => a == b,
            (Arg::Json(a), Arg::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Arg {}

impl Hash for Arg {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Arg::Null => {}
            Arg::Integer(v) => v.hash(state),
            Arg::Real(v) => v.to_bits().hash(state),
            Arg::Text(v) => v.hash(state),
            Arg::Blob(v) => v.hash(state),
            Arg::Bool(v) => v.hash(state),
            Arg::Uuid(v) => v.hash(state),
            Arg::DateTime(v) => v.hash(state),
            Arg::Json(v) => v.to_string().hash(state),
        }
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Null => write!(f, "NULL"),
            Arg::Integer(v) => write!(f, "{v}"),
            Arg::Real(v) => write!(f, "{v}"),
            Arg::Text(v) => write!(f, "{v}"),
            Arg::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Arg::Bool(v) => write!(f, "{v}"),
            Arg::Uuid(v) => write!(f, "{v}"),
            Arg::DateTime(v) => write!(f, "{v}"),
            Arg::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Integer(v)
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Integer(v as i64)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Real(v)
    }
}

impl From<bool> for Arg {
    fn from(v: bool) -> Self {
        Arg::Bool(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Text(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Text(v)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(v: Vec<u8>) -> Self {
        Arg::Blob(v)
    }
}

impl From<Uuid> for Arg {
    fn from(v: Uuid) -> Self {
        Arg::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Arg {
    fn from(v: DateTime<Utc>) -> Self {
        Arg::DateTime(v)
    }
}

impl From<serde_json::Value> for Arg {
    fn from(v: serde_json::Value) -> Self {
        Arg::Json(v)
    }
}

impl<V: Into<Arg>> From<Option<V>> for Arg {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(Arg::Null)
    }
}

/// Rewrite `:name` placeholders into positional `?` binds
///
/// Placeholders inside single-quoted strings and double-quoted identifiers
/// are left untouched. A placeholder may repeat; each occurrence gets its own
/// bind. A placeholder with no matching entry is a malformed query; unused
/// map entries are ignored.
pub fn expand_named(sql: &str, args: &[(&str, Arg)]) -> Result<(String, Vec<Arg>)> {
    let mut out = String::with_capacity(sql.len());
    let mut ordered = Vec::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
            }
            ':' if !in_single && !in_double => {
                let mut name = String::new();
                while let Some(&nc) = chars.peek() {
                    if nc.is_ascii_alphanumeric() || nc == '_' {
                        name.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    out.push(':');
                    continue;
                }
                match args.iter().find(|(n, _)| *n == name) {
                    Some((_, arg)) => {
                        out.push('?');
                        ordered.push(arg.clone());
                    }
                    None => {
                        return Err(RepoError::malformed_query(format!(
                            "no value bound for named parameter :{name}"
                        )));
                    }
                }
            }
            _ => out.push(c),
        }
    }

    Ok((out, ordered))
}
