//! Test utilities for the repository layer
//!
//! Provides the in-memory database setup, the test entity mappings, and
//! generation/assertion helpers shared by the test modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::args::Arg;
use crate::db::DatabaseManager;
use crate::entity::{Column, Entity};
use crate::error::{RepoError, Result};
use crate::validation::{StringLength, ValidationRule};

mod args_test;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const ID_COLUMN: &'static str = "id";
    type Id = i64;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn columns() -> &'static [Column<Self>] {
        &[
            Column {
                name: "name",
                get: |u| Arg::from(u.name.clone()),
            },
            Column {
                name: "email",
                get: |u| Arg::from(u.email.clone()),
            },
            Column {
                name: "active",
                get: |u| Arg::from(u.active),
            },
            Column {
                name: "last_login",
                get: |u| Arg::from(u.last_login),
            },
        ]
    }

    fn validate(&self) -> Result<()> {
        StringLength {
            min: Some(1),
            max: Some(255),
        }
        .validate(&self.name)
        .map_err(|_| RepoError::validation("user name must be between 1 and 255 characters"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Option<i64>,
    pub user_id: i64,
    pub title: String,
}

impl Entity for Post {
    const TABLE: &'static str = "posts";
    const ID_COLUMN: &'static str = "id";
    type Id = i64;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn columns() -> &'static [Column<Self>] {
        &[
            Column {
                name: "user_id",
                get: |p| Arg::from(p.user_id),
            },
            Column {
                name: "title",
                get: |p| Arg::from(p.title.clone()),
            },
        ]
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        last_login TEXT
    )",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        title TEXT NOT NULL
    )",
];

/// Initialize an in-memory database with the test schema
pub async fn setup_test_db() -> DatabaseManager {
    crate::logging::try_init();
    let db = DatabaseManager::in_memory()
        .await
        .expect("failed to open in-memory database");
    let mut conn = db.acquire().await.expect("failed to acquire connection");
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .expect("failed to create test schema");
    }
    db
}

/// Test data generators
pub mod generators {
    use chrono::{DateTime, Utc};

    use super::{Post, User};

    /// Generate a transient user with the given name
    pub fn user(name: &str) -> User {
        User {
            id: None,
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            active: true,
            last_login: None,
        }
    }

    /// Generate a transient user with a last login timestamp
    pub fn user_with_login(name: &str, last_login: DateTime<Utc>) -> User {
        let mut user = user(name);
        user.last_login = Some(last_login);
        user
    }

    /// Generate a transient post for a stored user
    pub fn post(user_id: i64, title: &str) -> Post {
        Post {
            id: None,
            user_id,
            title: title.to_string(),
        }
    }
}

/// Test assertions for repositories
pub mod assertions {
    use sqlx::SqliteConnection;

    use super::User;
    use crate::error::Result;
    use crate::repository::{Repository, SqliteRepository};

    /// Assert that a user exists in the store
    pub async fn assert_user_exists(
        repo: &SqliteRepository<User>,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<()> {
        assert!(
            repo.exists(conn, &id).await?,
            "user with id {} should exist",
            id
        );
        Ok(())
    }

    /// Assert that a user does not exist in the store
    pub async fn assert_user_not_exists(
        repo: &SqliteRepository<User>,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<()> {
        assert!(
            !repo.exists(conn, &id).await?,
            "user with id {} should not exist",
            id
        );
        Ok(())
    }

    /// Assert that the user count matches the expected count
    pub async fn assert_user_count(
        repo: &SqliteRepository<User>,
        conn: &mut SqliteConnection,
        expected: i64,
    ) -> Result<()> {
        let count = repo.count(conn).await?;
        assert_eq!(count, expected, "user count should be {}", expected);
        Ok(())
    }
}
