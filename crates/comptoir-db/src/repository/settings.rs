//! # Settings Repository
//!
//! One settings record per owner, stored as a JSON payload so new company
//! fields need no migration.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use comptoir_core::Settings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// The owner's settings, or `None` before first-run seeding.
    pub async fn get(&self, owner_id: &str) -> DbResult<Option<Settings>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload FROM settings WHERE owner_id = ?1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn upsert_in(
        conn: &mut SqliteConnection,
        owner_id: &str,
        settings: &Settings,
    ) -> DbResult<()> {
        let payload = serde_json::to_string(settings)?;

        sqlx::query(
            r#"
            INSERT INTO settings (owner_id, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(owner_id) DO UPDATE SET
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(payload)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::batch::{WriteBatch, WriteOp};
    use crate::{Database, DbConfig};
    use comptoir_core::Settings;

    #[tokio::test]
    async fn test_settings_absent_then_stored() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.settings().get("owner-a").await.unwrap().is_none());

        let mut settings = Settings::default();
        settings.company_info.name = "Quincaillerie Atlas".to_string();
        settings.tax_rate = 0.1;

        let mut batch = WriteBatch::new();
        batch.push(WriteOp::UpsertSettings(settings.clone()));
        db.commit("owner-a", &batch).await.unwrap();

        assert_eq!(db.settings().get("owner-a").await.unwrap(), Some(settings));
        assert!(db.settings().get("owner-b").await.unwrap().is_none());
    }
}
