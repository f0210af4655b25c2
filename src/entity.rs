//! Entity metadata trait
//!
//! Replaces the reflective tricks of classic ORM base classes (generic
//! superclass discovery, string-keyed property access) with compile-time
//! metadata: a table name, an identifier column, and a typed accessor table
//! mapping column names to functions that read the field value off an entity.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;

use crate::args::Arg;
use crate::error::Result;

/// A single column mapping: logical column name plus a typed accessor
pub struct Column<T: ?Sized> {
    pub name: &'static str,
    pub get: fn(&T) -> Arg,
}

/// Trait implemented by persistable entity types
///
/// `id()` returning `None` marks a transient entity: it has no identity yet
/// and will be assigned one by the store on save. Once assigned, the
/// identifier is immutable and addresses exactly one stored row.
pub trait Entity:
    for<'r> FromRow<'r, SqliteRow> + Serialize + DeserializeOwned + Send + Sync + Unpin + Debug + 'static
{
    /// Table this entity is stored in
    const TABLE: &'static str;

    /// Name of the identifier column
    const ID_COLUMN: &'static str;

    /// Identifier type
    type Id: Into<Arg> + Clone + PartialEq + Debug + Send + Sync;

    /// The entity's identifier, `None` while transient
    fn id(&self) -> Option<Self::Id>;

    /// Accessor table for the non-identifier columns
    fn columns() -> &'static [Column<Self>];

    /// Entity-level validation, run by `save` before touching the store
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// The identifier as a bindable value
    fn id_arg(&self) -> Option<Arg> {
        self.id().map(Into::into)
    }
}

/// Check whether `name` is a mapped column of `T` (identifier included)
pub fn has_column<T: Entity>(name: &str) -> bool {
    name == T::ID_COLUMN || T::columns().iter().any(|c| c.name == name)
}

/// Table-qualified select list for `T`
///
/// Always selecting explicit root columns keeps joined queries from feeding a
/// joined table's columns into the entity's `FromRow` impl.
pub fn select_columns<T: Entity>() -> String {
    let mut cols = Vec::with_capacity(T::columns().len() + 1);
    cols.push(format!("{}.{}", T::TABLE, T::ID_COLUMN));
    for c in T::columns() {
        cols.push(format!("{}.{}", T::TABLE, c.name));
    }
    cols.join(", ")
}

/// Unqualified column list for `T`, usable in a `RETURNING` clause
pub fn column_names<T: Entity>() -> String {
    let mut cols = Vec::with_capacity(T::columns().len() + 1);
    cols.push(T::ID_COLUMN);
    for c in T::columns() {
        cols.push(c.name);
    }
    cols.join(", ")
}
