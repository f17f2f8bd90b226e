// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQLite-backed user table.
//!
//! Every statement filters on `deleted_at IS NULL`, so a soft-deleted user is
//! invisible to reads, updates and a second delete.

use std::str::FromStr;

use carwash_api::pb::auth::v1::Profile;
use chrono::{SecondsFormat, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::error::{AuthError, Result};

/// A live or soft-deleted row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id:            String,
    pub first_name:    String,
    pub last_name:     String,
    pub email:         String,
    pub password_hash: String,
    pub phone_number:  String,
    pub role:          String,
    pub created_at:    String,
    pub updated_at:    String,
    pub deleted_at:    Option<String>,
}

impl From<UserRow> for Profile {
    fn from(row: UserRow) -> Self {
        Self {
            id:           row.id,
            first_name:   row.first_name,
            last_name:    row.last_name,
            email:        row.email,
            phone_number: row.phone_number,
            role:         row.role,
            created_at:   row.created_at,
            updated_at:   row.updated_at,
        }
    }
}

#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct NewUser {
    #[builder(default)]
    pub first_name:    String,
    #[builder(default)]
    pub last_name:     String,
    pub email:         String,
    pub password_hash: String,
    #[builder(default)]
    pub phone_number:  String,
    pub role:          String,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub id:           String,
    pub first_name:   String,
    pub last_name:    String,
    pub phone_number: String,
    pub role:         String,
}

fn now() -> String { Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true) }

/// Repository over the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Opens the database at `url` (e.g. `sqlite://auth.db?mode=rwc`) and
    /// applies pending migrations.
    #[tracing::instrument(level = "debug", err)]
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// A private in-memory database. One connection, since every SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool { &self.pool }

    pub async fn create(&self, user: NewUser) -> Result<UserRow> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now();
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, first_name, last_name, email, password_hash, phone_number, \
             role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_number)
        .bind(&user.role)
        .bind(&ts)
        .bind(&ts)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AuthError::EmailTaken {
                email: user.email.clone(),
            },
            other => other.into(),
        })?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AuthError::UserNotFound { id: id.to_string() })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Live users in insertion order. A `limit` of zero returns everything
    /// past `offset`.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<UserRow>> {
        let limit = if limit > 0 { limit } else { -1 };
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE deleted_at IS NULL ORDER BY created_at, rowid LIMIT ? \
             OFFSET ?",
        )
        .bind(limit)
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn update(&self, update: ProfileUpdate) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET first_name = ?, last_name = ?, phone_number = ?, role = ?, \
             updated_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING *",
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(&update.role)
        .bind(now())
        .bind(&update.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AuthError::UserNotFound {
            id: update.id.clone(),
        })
    }

    pub async fn soft_delete(&self, id: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now())
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

impl std::fmt::Debug for UserRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRepository").finish_non_exhaustive()
    }
}
