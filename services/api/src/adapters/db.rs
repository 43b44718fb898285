//! services/api/src/adapters/db.rs
//!
//! This module contains the PostgreSQL adapter, the document-collection
//! implementation of the `TimetableStore` port. Each batch is one row whose
//! schedule lives in a JSONB column; the admin credentials are a single row.

use async_trait::async_trait;
use futures::future::join_all;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use timetable_core::domain::{AdminCredentials, BatchCode, TimetableDocument, WeekSchedule};
use timetable_core::ports::{snapshot_of, PortError, PortResult, TimetableStore};
use tracing::{error, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TimetableStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, doc: TimetableDocument) -> Result<(), (String, sqlx::Error)> {
        sqlx::query(
            "INSERT INTO timetables (batch, schedule, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (batch) DO UPDATE SET schedule = EXCLUDED.schedule, updated_at = now()",
        )
        .bind(doc.batch.as_str())
        .bind(Json(&doc.schedule))
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| (doc.batch.to_string(), e))
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct TimetableRecord {
    batch: String,
    schedule: Json<WeekSchedule>,
}
impl TimetableRecord {
    fn to_domain(self) -> Option<TimetableDocument> {
        match BatchCode::parse(&self.batch) {
            Ok(batch) => Some(TimetableDocument {
                batch,
                schedule: self.schedule.0,
            }),
            Err(_) => {
                warn!(batch = %self.batch, "Skipping stored batch with an invalid code");
                None
            }
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    username: String,
    password: String,
    token: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> AdminCredentials {
        AdminCredentials {
            username: self.username,
            password: self.password,
            token: self.token,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `TimetableStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TimetableStore for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list_all(&self) -> PortResult<Vec<TimetableDocument>> {
        let records = sqlx::query_as::<_, TimetableRecord>(
            "SELECT batch, schedule FROM timetables",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().filter_map(|r| r.to_domain()).collect())
    }

    async fn get_by_batch(&self, code: &BatchCode) -> PortResult<TimetableDocument> {
        let record = sqlx::query_as::<_, TimetableRecord>(
            "SELECT batch, schedule FROM timetables WHERE batch = $1",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Batch {} not found", code)),
            _ => unexpected(e),
        })?;

        record
            .to_domain()
            .ok_or_else(|| PortError::NotFound(format!("Batch {} not found", code)))
    }

    /// One upsert per batch, all in flight at once. Each row is atomic on its
    /// own; there is no transaction across rows, so every failure is reported.
    /// Batches missing from `documents` are left in place.
    async fn replace_all(&self, documents: Vec<TimetableDocument>) -> PortResult<()> {
        let results = join_all(documents.into_iter().map(|doc| self.upsert(doc))).await;

        let mut failed = Vec::new();
        let mut messages = Vec::new();
        for (batch, e) in results.into_iter().filter_map(Result::err) {
            error!(batch = %batch, error = %e, "Timetable upsert failed");
            failed.push(batch);
            messages.push(e.to_string());
        }

        if failed.is_empty() {
            Ok(())
        } else {
            messages.dedup();
            Err(PortError::PartialWrite {
                failed,
                message: messages.join("; "),
            })
        }
    }

    async fn raw_snapshot(&self) -> PortResult<serde_json::Value> {
        let documents = self.list_all().await?;
        snapshot_of(&documents)
    }

    async fn get_credentials(&self) -> PortResult<AdminCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT username, password, token FROM admin_credentials WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound("admin credentials".to_string()),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_credentials(&self, expected_old: &str, new_password: &str) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE admin_credentials SET password = $2, updated_at = now() \
             WHERE id = 1 AND password = $1",
        )
        .bind(expected_old)
        .bind(new_password)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            // Either the row is missing (NotFound) or the password moved on.
            self.get_credentials().await?;
            return Err(PortError::Conflict("admin password changed concurrently".to_string()));
        }
        Ok(())
    }

    async fn seed_credentials(&self, defaults: &AdminCredentials) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO admin_credentials (id, username, password, token) VALUES (1, $1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&defaults.username)
        .bind(&defaults.password)
        .bind(&defaults.token)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
