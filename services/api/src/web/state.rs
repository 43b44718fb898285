//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;
use timetable_core::{AuthGate, TimetableService, TimetableStore};

/// The shared application state, created once at startup and passed to all handlers.
/// Which store backs it is decided before this point; handlers never know.
#[derive(Clone)]
pub struct AppState {
    pub service: TimetableService,
}

impl AppState {
    pub fn new(store: Arc<dyn TimetableStore>, api_key: impl Into<String>) -> Arc<Self> {
        let gate = AuthGate::new(api_key, store.clone());
        Arc::new(Self {
            service: TimetableService::new(store, gate),
        })
    }

    pub fn gate(&self) -> &AuthGate {
        self.service.gate()
    }
}
