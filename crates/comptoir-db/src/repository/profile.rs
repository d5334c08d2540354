//! # Profile Repository
//!
//! Access-control records. Unlike the business collections these are keyed
//! by user id alone, so they are written directly rather than through a
//! [`crate::batch::WriteBatch`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use comptoir_core::{Profile, Role};

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    email: String,
    approved: bool,
    role: Role,
    created_at: DateTime<Utc>,
    last_login: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            email: row.email,
            approved: row.approved,
            role: row.role,
            created_at: row.created_at,
            last_login: row.last_login,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProfileRepository { pool }
    }

    pub async fn get(&self, user_id: &str) -> DbResult<Option<Profile>> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT user_id, email, approved, role, created_at, last_login
            FROM profiles
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    /// Number of profiles ever created, across all users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts or replaces a profile.
    pub async fn upsert(&self, profile: &Profile) -> DbResult<()> {
        debug!(user_id = %profile.user_id, approved = profile.approved, "Upserting profile");

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, email, approved, role, created_at, last_login)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                email = excluded.email,
                approved = excluded.approved,
                role = excluded.role,
                last_login = excluded.last_login
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.email)
        .bind(profile.approved)
        .bind(profile.role)
        .bind(profile.created_at)
        .bind(profile.last_login)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records a login.
    pub async fn touch_last_login(&self, user_id: &str, at: DateTime<Utc>) -> DbResult<()> {
        let result = sqlx::query("UPDATE profiles SET last_login = ?2 WHERE user_id = ?1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Profile", user_id));
        }

        Ok(())
    }
}
