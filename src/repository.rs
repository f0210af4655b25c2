//! Generic repository over SQLite
//!
//! [`Repository`] defines the common operations every entity repository
//! supports; [`SqliteRepository`] implements them once, generically, from the
//! entity's column metadata. Every operation takes the active connection
//! handle explicitly — the repository never opens, commits, or closes
//! anything, so a caller-owned transaction passes `&mut *tx` and keeps full
//! control of the boundary.

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};
use tracing::{debug, instrument};

use crate::args::{Arg, expand_named};
use crate::criteria::{Criteria, OrderDirection, Predicate, dedup_root};
use crate::entity::{Entity, column_names, has_column, select_columns};
use crate::error::{RepoError, Result};

/// Common operations for all entity repositories
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Get the entity with the given id, failing if it is absent
    async fn get(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<T>;

    /// Get the entity with the given id, `None` if absent
    async fn find_by_id(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<Option<T>>;

    /// Get the entities whose id is in `ids`; empty input yields empty output
    async fn get_many(&self, conn: &mut SqliteConnection, ids: &[T::Id]) -> Result<Vec<T>>;

    /// Get all entities
    async fn get_all(&self, conn: &mut SqliteConnection) -> Result<Vec<T>>;

    /// Get all entities sorted by a column
    async fn get_all_ordered(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        ascending: bool,
    ) -> Result<Vec<T>>;

    /// Get the entities whose column equals `value`
    async fn find_by(&self, conn: &mut SqliteConnection, column: &str, value: Arg)
    -> Result<Vec<T>>;

    /// Get the single entity whose column equals `value`, if any
    ///
    /// More than one match is a uniqueness violation.
    async fn find_unique_by(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        value: Arg,
    ) -> Result<Option<T>>;

    /// Insert or update the entity, returning the persisted row
    ///
    /// A transient entity (no id) is inserted and the store assigns its
    /// identifier; an entity with an id is upserted. Failures propagate to
    /// the caller like every other mutating operation.
    async fn save(&self, conn: &mut SqliteConnection, entity: &T) -> Result<T>;

    /// Delete the entity, failing if it is not stored
    async fn delete(&self, conn: &mut SqliteConnection, entity: &T) -> Result<()>;

    /// Delete the entity with the given id, failing if it is absent
    async fn delete_by_id(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<()>;

    /// Check if an entity with the given id exists
    async fn exists(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<bool> {
        Ok(self.find_by_id(conn, id).await?.is_some())
    }

    /// Count all entities
    async fn count(&self, conn: &mut SqliteConnection) -> Result<i64>;

    /// Check whether a column value would be unique in the store
    ///
    /// True when `new_value` equals `old_value` (an unmodified field), when
    /// `new_value` is null, or when no stored row holds `new_value`.
    async fn is_property_unique(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        new_value: Arg,
        old_value: Option<Arg>,
    ) -> Result<bool>;
}

/// SQLite implementation of [`Repository`], generic over the entity type
pub struct SqliteRepository<T: Entity> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> SqliteRepository<T> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Start a criteria query bound to this entity
    pub fn criteria(&self) -> Criteria<T> {
        Criteria::new()
    }

    /// Run a criteria query
    #[instrument(skip(self, conn, criteria), fields(table = T::TABLE))]
    pub async fn find_with(&self, conn: &mut SqliteConnection, criteria: Criteria<T>) -> Result<Vec<T>> {
        let distinct = criteria.is_distinct_root();
        let mut qb = criteria.render()?;
        let rows = qb.build_query_as::<T>().fetch_all(&mut *conn).await?;
        debug!("criteria query returned {} rows", rows.len());
        Ok(if distinct { dedup_root(rows) } else { rows })
    }

    /// Run a criteria query expecting at most one result
    pub async fn find_unique_with(
        &self,
        conn: &mut SqliteConnection,
        criteria: Criteria<T>,
    ) -> Result<Option<T>> {
        let rows = self.find_with(conn, criteria.limit(2)).await?;
        Self::at_most_one(rows)
    }

    /// Count the rows matching a criteria's filters
    #[instrument(skip(self, conn, criteria), fields(table = T::TABLE))]
    pub async fn count_with(&self, conn: &mut SqliteConnection, criteria: Criteria<T>) -> Result<i64> {
        let mut qb = criteria.render_count()?;
        Ok(qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?)
    }

    /// Run ad-hoc query text with positional binds, mapping rows to any
    /// projection type
    pub async fn find_as<X>(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[Arg],
    ) -> Result<Vec<X>>
    where
        X: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        Self::require_query_text(sql)?;
        let mut query = sqlx::query_as::<_, X>(sql);
        for arg in args {
            query = arg.clone().bind_as(query);
        }
        Ok(query.fetch_all(&mut *conn).await?)
    }

    /// Run ad-hoc query text with positional binds
    #[instrument(skip(self, conn, args), fields(table = T::TABLE))]
    pub async fn find(&self, conn: &mut SqliteConnection, sql: &str, args: &[Arg]) -> Result<Vec<T>> {
        self.find_as::<T>(conn, sql, args).await
    }

    /// Run ad-hoc query text with named binds
    #[instrument(skip(self, conn, args), fields(table = T::TABLE))]
    pub async fn find_named(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[(&str, Arg)],
    ) -> Result<Vec<T>> {
        Self::require_query_text(sql)?;
        let (sql, ordered) = expand_named(sql, args)?;
        self.find_as::<T>(conn, &sql, &ordered).await
    }

    /// Run ad-hoc query text expecting at most one result
    ///
    /// The query runs as written, so all matching rows are fetched before the
    /// at-most-one check; callers can append their own `LIMIT 2` to bound an
    /// unselective query. Criteria queries get that cap automatically via
    /// [`find_unique_with`](Self::find_unique_with).
    pub async fn find_unique(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[Arg],
    ) -> Result<Option<T>> {
        Self::at_most_one(self.find(conn, sql, args).await?)
    }

    /// Run ad-hoc query text with named binds expecting at most one result
    pub async fn find_unique_named(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[(&str, Arg)],
    ) -> Result<Option<T>> {
        Self::at_most_one(self.find_named(conn, sql, args).await?)
    }

    /// Run ad-hoc query text and collapse duplicate root entities
    ///
    /// Joined queries duplicate the root entity once per joined row; this is
    /// the query-text side of the distinct-root transformer.
    pub async fn find_distinct(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[Arg],
    ) -> Result<Vec<T>> {
        Ok(dedup_root(self.find(conn, sql, args).await?))
    }

    /// Execute an UPDATE/DELETE/INSERT statement with positional binds,
    /// returning the affected-row count
    #[instrument(skip(self, conn, args), fields(table = T::TABLE))]
    pub async fn batch_execute(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[Arg],
    ) -> Result<u64> {
        Self::require_statement(sql)?;
        let mut query = sqlx::query(sql);
        for arg in args {
            query = arg.clone().bind(query);
        }
        let result = query.execute(&mut *conn).await?;
        debug!("batch statement affected {} rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Execute an UPDATE/DELETE/INSERT statement with named binds
    pub async fn batch_execute_named(
        &self,
        conn: &mut SqliteConnection,
        sql: &str,
        args: &[(&str, Arg)],
    ) -> Result<u64> {
        Self::require_statement(sql)?;
        let (sql, ordered) = expand_named(sql, args)?;
        self.batch_execute(conn, &sql, &ordered).await
    }

    fn require_query_text(sql: &str) -> Result<()> {
        if sql.trim().is_empty() {
            return Err(RepoError::validation("query text must not be blank"));
        }
        Ok(())
    }

    fn require_statement(sql: &str) -> Result<()> {
        Self::require_query_text(sql)?;
        let keyword = sql
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match keyword.as_str() {
            "update" | "delete" | "insert" => Ok(()),
            // A CTE prefix is fine as long as a mutation follows it
            "with" if Self::contains_mutation_keyword(sql) => Ok(()),
            other => Err(RepoError::malformed_query(format!(
                "batch execution requires an UPDATE, DELETE or INSERT statement, got `{other}`"
            ))),
        }
    }

    fn contains_mutation_keyword(sql: &str) -> bool {
        sql.split_whitespace().any(|token| {
            matches!(
                token
                    .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
                    .to_ascii_lowercase()
                    .as_str(),
                "update" | "delete" | "insert"
            )
        })
    }

    fn check_property(column: &str) -> Result<()> {
        if column.trim().is_empty() {
            return Err(RepoError::validation("property name must not be blank"));
        }
        if !has_column::<T>(column) {
            return Err(RepoError::malformed_query(format!(
                "unknown column `{}` on table `{}`",
                column,
                T::TABLE
            )));
        }
        Ok(())
    }

    fn at_most_one(mut rows: Vec<T>) -> Result<Option<T>> {
        if rows.len() > 1 {
            return Err(RepoError::uniqueness_violation(T::TABLE, rows.len()));
        }
        Ok(rows.pop())
    }

    async fn delete_by_arg(&self, conn: &mut SqliteConnection, id: Arg) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", T::TABLE, T::ID_COLUMN);
        let result = id.clone().bind(sqlx::query(&sql)).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::not_found(T::TABLE, id));
        }
        Ok(())
    }
}

impl<T: Entity> Default for SqliteRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for SqliteRepository<T> {
    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn get(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<T> {
        self.find_by_id(conn, id)
            .await?
            .ok_or_else(|| RepoError::not_found(T::TABLE, id.clone().into()))
    }

    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn find_by_id(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}.{} = ?",
            select_columns::<T>(),
            T::TABLE,
            T::TABLE,
            T::ID_COLUMN
        );
        let query = id.clone().into().bind_as(sqlx::query_as::<_, T>(&sql));
        Ok(query.fetch_optional(&mut *conn).await?)
    }

    #[instrument(skip(self, conn, ids), fields(table = T::TABLE))]
    async fn get_many(&self, conn: &mut SqliteConnection, ids: &[T::Id]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("getting {} rows by id", ids.len());
        let criteria = self.criteria().filter(Predicate::in_list(
            T::ID_COLUMN,
            ids.iter().map(|id| id.clone().into()),
        ));
        self.find_with(conn, criteria).await
    }

    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn get_all(&self, conn: &mut SqliteConnection) -> Result<Vec<T>> {
        self.find_with(conn, self.criteria()).await
    }

    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn get_all_ordered(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        ascending: bool,
    ) -> Result<Vec<T>> {
        Self::check_property(column)?;
        let direction = if ascending {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        };
        let criteria = self.criteria().order_by(column, direction);
        self.find_with(conn, criteria).await
    }

    #[instrument(skip(self, conn, value), fields(table = T::TABLE))]
    async fn find_by(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        value: Arg,
    ) -> Result<Vec<T>> {
        Self::check_property(column)?;
        let criteria = self.criteria().filter(Predicate::eq(column, value));
        self.find_with(conn, criteria).await
    }

    #[instrument(skip(self, conn, value), fields(table = T::TABLE))]
    async fn find_unique_by(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        value: Arg,
    ) -> Result<Option<T>> {
        Self::check_property(column)?;
        let criteria = self.criteria().filter(Predicate::eq(column, value));
        self.find_unique_with(conn, criteria).await
    }

    #[instrument(skip(self, conn, entity), fields(table = T::TABLE))]
    async fn save(&self, conn: &mut SqliteConnection, entity: &T) -> Result<T> {
        entity.validate()?;
        let cols = T::columns();

        match entity.id_arg() {
            None => {
                debug!("inserting new {} row", T::TABLE);
                let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", T::TABLE));
                qb.push(
                    cols.iter()
                        .map(|c| c.name)
                        .collect::<Vec<_>>()
                        .join(", "),
                );
                qb.push(") VALUES (");
                for (i, col) in cols.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    (col.get)(entity).push_to(&mut qb);
                }
                qb.push(format!(") RETURNING {}", column_names::<T>()));
                Ok(qb.build_query_as::<T>().fetch_one(&mut *conn).await?)
            }
            Some(id) => {
                debug!("upserting {} row {}", T::TABLE, id);
                let mut qb =
                    QueryBuilder::new(format!("INSERT INTO {} ({}", T::TABLE, T::ID_COLUMN));
                for col in cols {
                    qb.push(format!(", {}", col.name));
                }
                qb.push(") VALUES (");
                id.push_to(&mut qb);
                for col in cols {
                    qb.push(", ");
                    (col.get)(entity).push_to(&mut qb);
                }
                qb.push(format!(") ON CONFLICT({}) DO UPDATE SET ", T::ID_COLUMN));
                for (i, col) in cols.iter().enumerate() {
                    if i > 0 {
                        qb.push(", ");
                    }
                    qb.push(format!("{0} = excluded.{0}", col.name));
                }
                qb.push(format!(" RETURNING {}", column_names::<T>()));
                Ok(qb.build_query_as::<T>().fetch_one(&mut *conn).await?)
            }
        }
    }

    #[instrument(skip(self, conn, entity), fields(table = T::TABLE))]
    async fn delete(&self, conn: &mut SqliteConnection, entity: &T) -> Result<()> {
        let id = entity.id_arg().ok_or_else(|| {
            RepoError::validation("cannot delete a transient entity without an identifier")
        })?;
        self.delete_by_arg(conn, id).await
    }

    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn delete_by_id(&self, conn: &mut SqliteConnection, id: &T::Id) -> Result<()> {
        self.delete_by_arg(conn, id.clone().into()).await
    }

    #[instrument(skip(self, conn), fields(table = T::TABLE))]
    async fn count(&self, conn: &mut SqliteConnection) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        Ok(sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *conn)
            .await?)
    }

    #[instrument(skip(self, conn, new_value, old_value), fields(table = T::TABLE))]
    async fn is_property_unique(
        &self,
        conn: &mut SqliteConnection,
        column: &str,
        new_value: Arg,
        old_value: Option<Arg>,
    ) -> Result<bool> {
        if new_value == Arg::Null {
            return Ok(true);
        }
        if old_value.is_some_and(|old| old == new_value) {
            return Ok(true);
        }
        Self::check_property(column)?;
        let criteria = self
            .criteria()
            .filter(Predicate::eq(column, new_value))
            .limit(1);
        Ok(self.find_with(conn, criteria).await?.is_empty())
    }
}
