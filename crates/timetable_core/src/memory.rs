//! crates/timetable_core/src/memory.rs
//!
//! In-memory `TimetableStore`, used for local development and tests.
//! `replace_all` swaps the whole map under one write lock, so readers see
//! either the old set or the new one.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::{AdminCredentials, BatchCode, TimetableDocument, WeekSchedule};
use crate::ports::{snapshot_of, PortError, PortResult, TimetableStore};

#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: RwLock<BTreeMap<BatchCode, WeekSchedule>>,
    credentials: RwLock<Option<AdminCredentials>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `credentials`.
    pub fn with_credentials(credentials: AdminCredentials) -> Self {
        Self {
            batches: RwLock::default(),
            credentials: RwLock::new(Some(credentials)),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> PortError {
    PortError::Unexpected("memory store lock poisoned".to_string())
}

#[async_trait]
impl TimetableStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_all(&self) -> PortResult<Vec<TimetableDocument>> {
        let batches = self.batches.read().map_err(poisoned)?;
        Ok(batches
            .iter()
            .map(|(batch, schedule)| TimetableDocument {
                batch: batch.clone(),
                schedule: schedule.clone(),
            })
            .collect())
    }

    async fn get_by_batch(&self, code: &BatchCode) -> PortResult<TimetableDocument> {
        let batches = self.batches.read().map_err(poisoned)?;
        batches
            .get(code)
            .map(|schedule| TimetableDocument {
                batch: code.clone(),
                schedule: schedule.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("Batch {} not found", code)))
    }

    async fn replace_all(&self, documents: Vec<TimetableDocument>) -> PortResult<()> {
        let next: BTreeMap<_, _> = documents
            .into_iter()
            .map(|doc| (doc.batch, doc.schedule))
            .collect();
        *self.batches.write().map_err(poisoned)? = next;
        Ok(())
    }

    async fn raw_snapshot(&self) -> PortResult<serde_json::Value> {
        let documents = self.list_all().await?;
        snapshot_of(&documents)
    }

    async fn get_credentials(&self) -> PortResult<AdminCredentials> {
        self.credentials
            .read()
            .map_err(poisoned)?
            .clone()
            .ok_or_else(|| PortError::NotFound("admin credentials".to_string()))
    }

    async fn update_credentials(&self, expected_old: &str, new_password: &str) -> PortResult<()> {
        let mut guard = self.credentials.write().map_err(poisoned)?;
        let credentials = guard
            .as_mut()
            .ok_or_else(|| PortError::NotFound("admin credentials".to_string()))?;
        if credentials.password != expected_old {
            return Err(PortError::Conflict("admin password changed concurrently".to_string()));
        }
        credentials.password = new_password.to_string();
        Ok(())
    }

    async fn seed_credentials(&self, defaults: &AdminCredentials) -> PortResult<()> {
        let mut guard = self.credentials.write().map_err(poisoned)?;
        if guard.is_none() {
            *guard = Some(defaults.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(code: &str, subject: &str) -> TimetableDocument {
        let mut entry = serde_json::Map::new();
        entry.insert("subject".to_string(), subject.into());
        TimetableDocument {
            batch: BatchCode::parse(code).unwrap(),
            schedule: WeekSchedule {
                monday: vec![entry],
                ..WeekSchedule::default()
            },
        }
    }

    #[tokio::test]
    async fn replace_all_drops_batches_missing_from_the_new_set() {
        let store = MemoryStore::new();
        store.replace_all(vec![doc("E15", "Art"), doc("E16", "Maths")]).await.unwrap();
        store.replace_all(vec![doc("E16", "Physics")]).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].schedule.monday[0]["subject"], "Physics");

        let missing = BatchCode::parse("E15").unwrap();
        assert!(matches!(
            store.get_by_batch(&missing).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn raw_snapshot_uses_the_batches_layout() {
        let store = MemoryStore::new();
        store.replace_all(vec![doc("E16", "Maths")]).await.unwrap();

        let raw = store.raw_snapshot().await.unwrap();
        assert_eq!(raw["batches"]["E16"]["Monday"][0]["subject"], "Maths");
        assert_eq!(raw["batches"]["E16"]["Saturday"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn seed_credentials_never_overwrites() {
        let store = MemoryStore::new();
        let first = AdminCredentials {
            username: "admin".to_string(),
            password: "one".to_string(),
            token: "t1".to_string(),
        };
        let second = AdminCredentials {
            password: "two".to_string(),
            ..first.clone()
        };

        assert!(store.get_credentials().await.is_err());
        store.seed_credentials(&first).await.unwrap();
        store.seed_credentials(&second).await.unwrap();
        assert_eq!(store.get_credentials().await.unwrap().password, "one");
    }

    #[tokio::test]
    async fn update_credentials_compares_before_writing() {
        let store = MemoryStore::with_credentials(AdminCredentials {
            username: "admin".to_string(),
            password: "one".to_string(),
            token: "t1".to_string(),
        });

        assert!(matches!(
            store.update_credentials("stale", "two").await,
            Err(PortError::Conflict(_))
        ));
        assert_eq!(store.get_credentials().await.unwrap().password, "one");

        store.update_credentials("one", "two").await.unwrap();
        assert_eq!(store.get_credentials().await.unwrap().password, "two");
    }
}
