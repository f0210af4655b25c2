//! Composable criteria queries
//!
//! A [`Criteria`] is a structured alternative to raw query text: predicates
//! combined with AND/OR, optional joins, ordering, and pagination, rendered
//! through `sqlx::QueryBuilder` against the entity's column metadata. Unknown
//! column names are rejected before any SQL reaches the store.

use std::collections::HashSet;
use std::marker::PhantomData;

use sqlx::{QueryBuilder, Sqlite};

use crate::args::Arg;
use crate::entity::{Entity, has_column, select_columns};
use crate::error::{RepoError, Result};

/// Condition operator for comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl ConditionOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// Logical operator for combining predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Order direction for sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Join type for joined criteria queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A single composable filter condition
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare {
        column: String,
        op: ConditionOperator,
        value: Arg,
    },
    InList {
        column: String,
        values: Vec<Arg>,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::NotEq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::Ge, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Arg>) -> Self {
        Self::compare(column, ConditionOperator::Le, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, ConditionOperator::Like, Arg::Text(pattern.into()))
    }

    pub fn compare(
        column: impl Into<String>,
        op: ConditionOperator,
        value: impl Into<Arg>,
    ) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn in_list(column: impl Into<String>, values: impl IntoIterator<Item = Arg>) -> Self {
        Self::InList {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::IsNotNull {
            column: column.into(),
        }
    }

    fn column(&self) -> &str {
        match self {
            Self::Compare { column, .. }
            | Self::InList { column, .. }
            | Self::IsNull { column }
            | Self::IsNotNull { column } => column,
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    join_type: JoinType,
    table: String,
    on: String,
}

/// Composable query builder bound to an entity type
#[derive(Debug, Clone)]
pub struct Criteria<T: Entity> {
    predicates: Vec<(LogicalOperator, Predicate)>,
    joins: Vec<Join>,
    order: Vec<(String, OrderDirection)>,
    limit: Option<i64>,
    offset: Option<i64>,
    distinct_root: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Criteria<T> {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
            joins: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            distinct_root: false,
            _entity: PhantomData,
        }
    }

    /// Add a predicate combined with AND
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push((LogicalOperator::And, predicate));
        self
    }

    /// Add a predicate combined with OR
    pub fn or_filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push((LogicalOperator::Or, predicate));
        self
    }

    /// Join another table; `on` is a raw join condition
    pub fn join(
        mut self,
        join_type: JoinType,
        table: impl Into<String>,
        on: impl Into<String>,
    ) -> Self {
        self.joins.push(Join {
            join_type,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Collapse duplicate root entities caused by join fan-out
    pub fn distinct_root(mut self) -> Self {
        self.distinct_root = true;
        self
    }

    pub fn is_distinct_root(&self) -> bool {
        self.distinct_root
    }

    // Qualified names pass through for joined queries; bare names must be
    // mapped columns of the root entity.
    fn check_column(column: &str) -> Result<()> {
        if column.contains('.') || has_column::<T>(column) {
            Ok(())
        } else {
            Err(RepoError::malformed_query(format!(
                "unknown column `{}` on table `{}`",
                column,
                T::TABLE
            )))
        }
    }

    fn render_with(
        &self,
        select: &str,
        with_order_and_range: bool,
    ) -> Result<QueryBuilder<'static, Sqlite>> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", select, T::TABLE));

        for join in &self.joins {
            qb.push(format!(
                " {} {} ON {}",
                join.join_type.as_sql(),
                join.table,
                join.on
            ));
        }

        let mut has_where = false;
        for (logical, predicate) in &self.predicates {
            Self::check_column(predicate.column())?;
            if !has_where {
                qb.push(" WHERE ");
                has_where = true;
            } else {
                qb.push(format!(" {} ", logical.as_sql()));
            }
            match predicate {
                Predicate::Compare { column, op, value } => {
                    qb.push(format!("{} {} ", column, op.as_sql()));
                    value.clone().push_to(&mut qb);
                }
                Predicate::InList { column, values } => {
                    if values.is_empty() {
                        // an empty value list matches nothing
                        qb.push(format!("{column} IN (NULL)"));
                    } else {
                        qb.push(format!("{column} IN ("));
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                qb.push(", ");
                            }
                            value.clone().push_to(&mut qb);
                        }
                        qb.push(")");
                    }
                }
                Predicate::IsNull { column } => {
                    qb.push(format!("{column} IS NULL"));
                }
                Predicate::IsNotNull { column } => {
                    qb.push(format!("{column} IS NOT NULL"));
                }
            }
        }

        if with_order_and_range {
            for (i, (column, direction)) in self.order.iter().enumerate() {
                Self::check_column(column)?;
                qb.push(if i == 0 { " ORDER BY " } else { ", " });
                qb.push(format!("{} {}", column, direction.as_sql()));
            }

            if let Some(limit) = self.limit {
                qb.push(" LIMIT ");
                qb.push_bind(limit);
            }
            if let Some(offset) = self.offset {
                qb.push(" OFFSET ");
                qb.push_bind(offset);
            }
        }

        Ok(qb)
    }

    /// Render the entity select for this criteria
    pub(crate) fn render(&self) -> Result<QueryBuilder<'static, Sqlite>> {
        self.render_with(&select_columns::<T>(), true)
    }

    /// Render a COUNT(*) over this criteria's filters
    pub(crate) fn render_count(&self) -> Result<QueryBuilder<'static, Sqlite>> {
        self.render_with("COUNT(*)", false)
    }
}

impl<T: Entity> Default for Criteria<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct-root transformer: drop rows repeating an already-seen identifier,
/// preserving first-seen order
pub fn dedup_root<T: Entity>(rows: Vec<T>) -> Vec<T> {
    let mut seen: HashSet<Arg> = HashSet::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match row.id_arg() {
            Some(id) => {
                if seen.insert(id) {
                    out.push(row);
                }
            }
            None => out.push(row),
        }
    }
    out
}
