//! Durable storage for completed task output.
//!
//! Records are append-only at the catalog level: saving output for a
//! (project, template) pair inserts a fresh row and flips prior rows
//! inactive, so earlier output is superseded rather than destroyed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS task_records (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id        TEXT    NOT NULL,
    template_id       TEXT    NOT NULL,

    content_primary   TEXT    NOT NULL,
    content_secondary TEXT    NOT NULL,
    aux_primary       TEXT    NOT NULL DEFAULT '',
    aux_secondary     TEXT    NOT NULL DEFAULT '',

    created_at        TEXT    NOT NULL,
    active            INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_task_records_pair
    ON task_records(project_id, template_id, active);
"#;

/// The durable artifact written once per completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub project_id: String,
    pub template_id: String,
    /// Primary-language document body.
    pub content_primary: String,
    /// Secondary-language document body. Equals `content_primary` when the
    /// secondary stage degraded.
    pub content_secondary: String,
    /// Auxiliary spec in the primary language; empty when the template has
    /// no auxiliary prompt or the stage failed.
    pub aux_primary: String,
    /// Auxiliary spec in the secondary language; same emptiness rules.
    pub aux_secondary: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

/// Aggregate counts over the record catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordStoreStats {
    /// Total rows, including superseded ones.
    pub total: u64,
    /// Currently active rows.
    pub active: u64,
    /// Distinct (project, template) pairs with output.
    pub pairs: u64,
}

/// Persistence collaborator for finished task output.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record, superseding any prior record for the same
    /// (project, template) pair. Returns the new record's id.
    async fn save(&self, record: &TaskRecord) -> Result<i64, StoreError>;
}

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (creating if missing) the record database at `path`.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::info!(path = path, "Record store opened");
        Ok(Self { pool })
    }

    /// Open an existing record database read-only. Fails if the file does
    /// not exist; never creates one.
    pub async fn open_read_only(path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))
            .map_err(sqlx::Error::from)?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Fetch the newest active record for a pair, if any.
    pub async fn latest(
        &self,
        project_id: &str,
        template_id: &str,
    ) -> Result<Option<TaskRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM task_records
             WHERE project_id = ?1 AND template_id = ?2 AND active = 1
             ORDER BY id DESC LIMIT 1",
        )
        .bind(project_id)
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| TaskRecord {
            project_id: r.get("project_id"),
            template_id: r.get("template_id"),
            content_primary: r.get("content_primary"),
            content_secondary: r.get("content_secondary"),
            aux_primary: r.get("aux_primary"),
            aux_secondary: r.get("aux_secondary"),
            created_at: r.get("created_at"),
            active: r.get::<i64, _>("active") != 0,
        }))
    }

    /// Aggregate counts for the `status` command.
    pub async fn stats(&self) -> Result<RecordStoreStats, StoreError> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                SUM(CASE WHEN active = 1 THEN 1 ELSE 0 END) AS active,
                COUNT(DISTINCT project_id || '::' || template_id) AS pairs
             FROM task_records",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RecordStoreStats {
            total: row.get::<i64, _>("total") as u64,
            active: row.get::<Option<i64>, _>("active").unwrap_or(0) as u64,
            pairs: row.get::<i64, _>("pairs") as u64,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save(&self, record: &TaskRecord) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE task_records SET active = 0
             WHERE project_id = ?1 AND template_id = ?2 AND active = 1",
        )
        .bind(&record.project_id)
        .bind(&record.template_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "INSERT INTO task_records (
                project_id, template_id,
                content_primary, content_secondary, aux_primary, aux_secondary,
                created_at, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
        )
        .bind(&record.project_id)
        .bind(&record.template_id)
        .bind(&record.content_primary)
        .bind(&record.content_secondary)
        .bind(&record.aux_primary)
        .bind(&record.aux_secondary)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.last_insert_rowid())
    }
}
