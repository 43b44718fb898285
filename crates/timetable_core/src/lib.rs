pub mod auth;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod service;
pub mod validation;

pub use auth::AuthGate;
pub use domain::{AdminCredentials, BatchCode, ClassEntry, TimetableDocument, WeekSchedule};
pub use error::{ServiceError, ServiceResult};
pub use memory::MemoryStore;
pub use ports::{PortError, PortResult, TimetableStore};
pub use service::TimetableService;
pub use validation::{validate_batch_code, ValidationError};
