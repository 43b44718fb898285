//! crates/timetable_core/src/service.rs
//!
//! The timetable service orchestrates reads and admin writes on top of a
//! `TimetableStore`. It keeps no state of its own: every call goes back to the
//! store, which stays the single source of truth.

use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{AuthGate, INVALID_PASSWORD};
use crate::domain::{BatchCode, TimetableDocument, WeekSchedule};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{PortError, TimetableStore};
use crate::validation::parse_documents;

pub const BATCH_NOT_FOUND: &str = "Batch not found";

#[derive(Clone)]
pub struct TimetableService {
    store: Arc<dyn TimetableStore>,
    gate: AuthGate,
}

impl TimetableService {
    pub fn new(store: Arc<dyn TimetableStore>, gate: AuthGate) -> Self {
        Self { store, gate }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Every stored batch. Order is not part of the contract.
    pub async fn list_batches(&self) -> ServiceResult<Vec<TimetableDocument>> {
        self.store.list_all().await.map_err(|e| store_failure("list batches", e))
    }

    /// Validates `code` first; malformed codes never reach the store.
    pub async fn get_batch(&self, code: &str) -> ServiceResult<WeekSchedule> {
        let code = BatchCode::parse(code)?;
        match self.store.get_by_batch(&code).await {
            Ok(doc) => Ok(doc.schedule),
            Err(PortError::NotFound(_)) => Err(ServiceError::NotFound(BATCH_NOT_FOUND.to_string())),
            Err(e) => Err(store_failure("read batch", e)),
        }
    }

    /// Replaces the stored timetables with `items` and returns how many were stored.
    ///
    /// The token is checked before anything else, and the items are validated
    /// as a whole, so a rejected call leaves the store untouched.
    pub async fn bulk_replace(&self, token: Option<&str>, items: Vec<Value>) -> ServiceResult<usize> {
        self.gate.verify_admin_token(token).await?;

        let documents = parse_documents(items)?;
        let count = documents.len();
        self.store
            .replace_all(documents)
            .await
            .map_err(|e| store_failure("replace timetables", e))?;

        info!(batches = count, backend = self.store.backend_name(), "Timetable updated");
        Ok(count)
    }

    /// Needs both the admin token and the current password. The token stays valid.
    ///
    /// The store re-checks the current password as part of the write, so of two
    /// concurrent changes presenting the same old password only one lands.
    pub async fn change_password(
        &self,
        token: Option<&str>,
        old_password: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        if new_password.is_empty() {
            return Err(ServiceError::InvalidInput("New password must not be empty".to_string()));
        }

        let credentials = self.gate.verify_admin_token(token).await?;
        self.gate.verify_password(&credentials, old_password)?;

        match self.store.update_credentials(old_password, new_password).await {
            Ok(()) => {}
            Err(PortError::Conflict(reason)) => {
                warn!(%reason, "Rejected password change against a stale password");
                return Err(ServiceError::AuthFailure(INVALID_PASSWORD.to_string()));
            }
            Err(e) => return Err(store_failure("update credentials", e)),
        }

        info!(username = %credentials.username, "Admin password changed");
        Ok(())
    }

    /// The persisted layout, untouched by validation.
    pub async fn raw_timetable(&self) -> ServiceResult<Value> {
        self.store.raw_snapshot().await.map_err(|e| store_failure("read raw timetable", e))
    }
}

fn store_failure(action: &str, err: PortError) -> ServiceError {
    error!(error = %err, "Failed to {action}");
    ServiceError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdminCredentials;
    use crate::memory::MemoryStore;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use serde_json::json;

    const TOKEN: &str = "static-token";

    fn service() -> (TimetableService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_credentials(AdminCredentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
            token: TOKEN.to_string(),
        }));
        let gate = AuthGate::new("key", store.clone());
        (TimetableService::new(store.clone(), gate), store)
    }

    fn e16() -> Value {
        json!({
            "batch": "E16",
            "Monday": [{ "subject": "Maths", "time": "09:00", "room": "A1" }]
        })
    }

    #[tokio::test]
    async fn bulk_replace_then_list_round_trips() {
        let (service, _) = service();
        assert_eq!(service.bulk_replace(Some(TOKEN), vec![e16()]).await, Ok(1));

        let batches = service.list_batches().await.unwrap();
        let doc = batches.iter().find(|d| d.batch.as_str() == "E16").unwrap();
        assert_eq!(doc.schedule.monday[0]["subject"], "Maths");
    }

    #[tokio::test]
    async fn get_batch_finds_stored_and_misses_absent() {
        let (service, _) = service();
        service.bulk_replace(Some(TOKEN), vec![e16()]).await.unwrap();

        let schedule = service.get_batch("E16").await.unwrap();
        assert_eq!(schedule.monday[0]["room"], "A1");
        assert_eq!(
            service.get_batch("E17").await,
            Err(ServiceError::NotFound(BATCH_NOT_FOUND.to_string()))
        );
    }

    #[tokio::test]
    async fn get_batch_rejects_malformed_codes() {
        let (service, _) = service();
        for code in ["", "e16", "E-16", "E16 "] {
            assert!(matches!(
                service.get_batch(code).await,
                Err(ServiceError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn bad_token_leaves_store_unchanged() {
        let (service, store) = service();
        service.bulk_replace(Some(TOKEN), vec![e16()]).await.unwrap();
        let before = store.raw_snapshot().await.unwrap();

        let result = service
            .bulk_replace(Some("wrong"), vec![json!({ "batch": "X1" })])
            .await;
        assert!(matches!(result, Err(ServiceError::AuthFailure(_))));
        assert!(matches!(
            service.bulk_replace(None, vec![]).await,
            Err(ServiceError::AuthFailure(_))
        ));

        assert_eq!(store.raw_snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn malformed_items_reject_the_whole_update() {
        let (service, store) = service();
        service.bulk_replace(Some(TOKEN), vec![e16()]).await.unwrap();
        let before = store.raw_snapshot().await.unwrap();

        let result = service
            .bulk_replace(Some(TOKEN), vec![json!({ "batch": "E17" }), json!({ "Monday": [] })])
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert_eq!(store.raw_snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn bulk_replace_is_idempotent() {
        let (service, store) = service();
        let items = vec![e16(), json!({ "batch": "E17", "Friday": [{ "subject": "Lab" }] })];

        service.bulk_replace(Some(TOKEN), items.clone()).await.unwrap();
        let once = store.raw_snapshot().await.unwrap();
        service.bulk_replace(Some(TOKEN), items).await.unwrap();
        assert_eq!(store.raw_snapshot().await.unwrap(), once);
    }

    #[tokio::test]
    async fn change_password_keeps_the_token_and_retires_the_old_password() {
        let (service, _) = service();

        service.change_password(Some(TOKEN), "secret", "fresh").await.unwrap();

        assert!(matches!(
            service.change_password(Some(TOKEN), "secret", "other").await,
            Err(ServiceError::AuthFailure(_))
        ));
        service.change_password(Some(TOKEN), "fresh", "newer").await.unwrap();
        assert_eq!(service.gate().login("admin", "newer").await.unwrap(), TOKEN);
    }

    #[tokio::test]
    async fn change_password_requires_the_token() {
        let (service, store) = service();
        assert!(matches!(
            service.change_password(Some("nope"), "secret", "fresh").await,
            Err(ServiceError::AuthFailure(_))
        ));
        assert_eq!(store.get_credentials().await.unwrap().password, "secret");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_password_changes_with_the_same_old_password_let_one_win() {
        for _ in 0..20 {
            let (service, store) = service();
            let first = service.clone();
            let second = service.clone();

            let (a, b) = tokio::join!(
                tokio::spawn(async move { first.change_password(Some(TOKEN), "secret", "A").await }),
                tokio::spawn(async move { second.change_password(Some(TOKEN), "secret", "B").await }),
            );
            let (a, b) = (a.unwrap(), b.unwrap());

            assert!(a.is_ok() != b.is_ok(), "exactly one change must succeed: {a:?} {b:?}");
            let (winner, loser) = if a.is_ok() { ("A", b) } else { ("B", a) };
            assert_eq!(
                loser,
                Err(ServiceError::AuthFailure(INVALID_PASSWORD.to_string()))
            );
            assert_eq!(store.get_credentials().await.unwrap().password, winner);
            assert_eq!(service.gate().login("admin", winner).await.unwrap(), TOKEN);
        }
    }

    /// Reads like a healthy store but every bulk write fails part-way.
    struct PartiallyFailingStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl TimetableStore for PartiallyFailingStore {
        fn backend_name(&self) -> &'static str {
            "partially-failing"
        }

        async fn list_all(&self) -> PortResult<Vec<TimetableDocument>> {
            self.inner.list_all().await
        }

        async fn get_by_batch(&self, code: &BatchCode) -> PortResult<TimetableDocument> {
            self.inner.get_by_batch(code).await
        }

        async fn replace_all(&self, documents: Vec<TimetableDocument>) -> PortResult<()> {
            Err(PortError::PartialWrite {
                failed: documents.iter().map(|d| d.batch.to_string()).collect(),
                message: "connection reset".to_string(),
            })
        }

        async fn raw_snapshot(&self) -> PortResult<Value> {
            self.inner.raw_snapshot().await
        }

        async fn get_credentials(&self) -> PortResult<AdminCredentials> {
            self.inner.get_credentials().await
        }

        async fn update_credentials(&self, expected_old: &str, new_password: &str) -> PortResult<()> {
            self.inner.update_credentials(expected_old, new_password).await
        }

        async fn seed_credentials(&self, defaults: &AdminCredentials) -> PortResult<()> {
            self.inner.seed_credentials(defaults).await
        }
    }

    #[tokio::test]
    async fn partial_write_surfaces_as_a_store_failure() {
        let store = Arc::new(PartiallyFailingStore {
            inner: MemoryStore::with_credentials(AdminCredentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
                token: TOKEN.to_string(),
            }),
        });
        let gate = AuthGate::new("key", store.clone());
        let service = TimetableService::new(store, gate);

        let result = service.bulk_replace(Some(TOKEN), vec![e16()]).await;
        match result {
            Err(ServiceError::StoreFailure(message)) => assert!(message.contains("E16"), "{message}"),
            other => panic!("expected a store failure, got {other:?}"),
        }
    }
}
