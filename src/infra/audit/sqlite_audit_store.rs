// SQLite-backed audit store.
//
// Tables:
// - moderation_audit: one row per terminal moderation decision
//
// Rows are only ever inserted. The verdict is stored as its JSON wire form.

use crate::core::audit::{
    AuditEntry, AuditError, AuditRecord, AuditStore, ClassifierUsed, ModerationAction,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteAuditStore {
    pool: Pool<Sqlite>,
}

impl SqliteAuditStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        }

        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_audit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                title TEXT,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                verdict TEXT NOT NULL,
                action TEXT NOT NULL,
                classifier_used TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                post_id TEXT,
                bypassed INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_moderation_audit_user
                ON moderation_audit(user_id, timestamp);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<AuditRecord, AuditError> {
        let record = AuditRecord::from_entry(entry, Utc::now());
        let verdict_json = serde_json::to_string(&record.verdict)
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO moderation_audit
                (content, title, user_id, user_name, verdict, action, classifier_used, timestamp, post_id, bypassed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.content.as_str())
        .bind(record.title.as_deref())
        .bind(record.user_id.as_str())
        .bind(record.user_name.as_str())
        .bind(verdict_json)
        .bind(record.action.as_str())
        .bind(record.classifier_used.as_str())
        .bind(record.timestamp.to_rfc3339())
        .bind(record.post_id.as_deref())
        .bind(record.bypassed)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        Ok(record)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, AuditError> {
        let rows = sqlx::query(
            r#"
            SELECT content, title, user_id, user_name, verdict, action, classifier_used, timestamp, post_id, bypassed
            FROM moderation_audit
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::ReadFailed(e.to_string()))?;

        rows.iter()
            .map(|row| -> Result<AuditRecord, AuditError> {
                let verdict: String = row.get("verdict");
                let action: String = row.get("action");
                let classifier_used: String = row.get("classifier_used");
                let timestamp: String = row.get("timestamp");

                Ok(AuditRecord {
                    content: row.get("content"),
                    title: row.get("title"),
                    user_id: row.get("user_id"),
                    user_name: row.get("user_name"),
                    verdict: serde_json::from_str(&verdict)
                        .map_err(|e| AuditError::ReadFailed(e.to_string()))?,
                    action: action
                        .parse::<ModerationAction>()
                        .map_err(AuditError::ReadFailed)?,
                    classifier_used: classifier_used
                        .parse::<ClassifierUsed>()
                        .map_err(AuditError::ReadFailed)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| AuditError::ReadFailed(e.to_string()))?
                        .with_timezone(&Utc),
                    post_id: row.get("post_id"),
                    bypassed: row.get("bypassed"),
                })
            })
            .collect()
    }
}
