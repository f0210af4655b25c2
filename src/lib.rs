//! repokit: a generic repository layer over SQLite
//!
//! One repository implementation serves every entity type: describe an
//! entity's table, identifier, and column accessors once via [`Entity`], and
//! [`SqliteRepository`] provides CRUD, property lookups, composable criteria
//! queries, ad-hoc SQL with positional or named parameters, and batch update
//! execution on top of sqlx. Connections stay caller-owned; every operation
//! borrows the active handle for the duration of the call.

pub mod args;
pub mod criteria;
pub mod db;
pub mod entity;
pub mod error;
pub mod factory;
pub mod logging;
pub mod repository;
pub mod validation;

#[cfg(test)]
mod tests;

pub use args::{Arg, expand_named};
pub use criteria::{
    ConditionOperator, Criteria, JoinType, LogicalOperator, OrderDirection, Predicate, dedup_root,
};
pub use db::DatabaseManager;
pub use entity::{Column, Entity};
pub use error::{RepoError, Result};
pub use factory::RepositoryFactory;
pub use repository::{Repository, SqliteRepository};
