//! crates/timetable_core/src/auth.rs
//!
//! The auth gate. Two independent checks that are never merged into one
//! principal: the shared API key guarding public reads, and the admin
//! username/password/token triple guarding writes. Both fail closed.

use std::sync::Arc;
use tracing::warn;

use crate::domain::AdminCredentials;
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{PortError, TimetableStore};

pub const INVALID_API_KEY: &str = "Forbidden: Invalid API key";
pub const INVALID_TOKEN: &str = "Unauthorized: Invalid token";
pub const INVALID_LOGIN: &str = "Invalid credentials";
pub const INVALID_PASSWORD: &str = "Current password is incorrect";

#[derive(Clone)]
pub struct AuthGate {
    api_key: String,
    store: Arc<dyn TimetableStore>,
}

impl AuthGate {
    pub fn new(api_key: impl Into<String>, store: Arc<dyn TimetableStore>) -> Self {
        Self {
            api_key: api_key.into(),
            store,
        }
    }

    /// Compares a request-supplied key with the process-wide secret.
    pub fn check_api_key(&self, supplied: Option<&str>) -> ServiceResult<()> {
        match supplied {
            Some(key) if !key.is_empty() && key == self.api_key => Ok(()),
            Some(_) => {
                warn!("Rejected request with a wrong API key");
                Err(ServiceError::AuthFailure(INVALID_API_KEY.to_string()))
            }
            None => {
                warn!("Rejected request without an API key");
                Err(ServiceError::AuthFailure(INVALID_API_KEY.to_string()))
            }
        }
    }

    /// Returns the static admin token when username and password match.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<String> {
        let credentials = self.credentials().await?;
        if credentials.username == username && credentials.password == password {
            Ok(credentials.token)
        } else {
            warn!(username, "Admin login failed");
            Err(ServiceError::AuthFailure(INVALID_LOGIN.to_string()))
        }
    }

    /// Checks the presented admin token and hands back the current credentials.
    pub async fn verify_admin_token(&self, token: Option<&str>) -> ServiceResult<AdminCredentials> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            warn!("Rejected admin request without a token");
            return Err(ServiceError::AuthFailure(INVALID_TOKEN.to_string()));
        };

        let credentials = self.credentials().await?;
        if credentials.token != token {
            warn!("Rejected admin request with a wrong token");
            return Err(ServiceError::AuthFailure(INVALID_TOKEN.to_string()));
        }
        Ok(credentials)
    }

    pub fn verify_password(&self, credentials: &AdminCredentials, password: &str) -> ServiceResult<()> {
        if credentials.password == password {
            Ok(())
        } else {
            warn!("Rejected password change with a wrong current password");
            Err(ServiceError::AuthFailure(INVALID_PASSWORD.to_string()))
        }
    }

    // Missing credentials are a broken deployment, not an unknown resource.
    async fn credentials(&self) -> ServiceResult<AdminCredentials> {
        self.store.get_credentials().await.map_err(|e| match e {
            PortError::NotFound(_) => {
                ServiceError::StoreFailure("admin credentials are not provisioned".to_string())
            }
            other => other.into(),
        })
    }
}
