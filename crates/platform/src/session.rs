use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::{encode_body, HttpMethod, LoginData, LoginRequest, LOGIN_PATH};
use crate::token_store::{CachedToken, SessionToken, TokenStore};
use crate::transport::{Transport, VendorRequest};

/// Owns the vendor bearer token shared by every platform call.
///
/// Refresh happens under a lock, so callers racing on an expired token
/// trigger a single login.
pub struct SessionManager {
    company_name: String,
    user_name: String,
    password: String,
    validity_hours: i64,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    current: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(
        config: &PlatformConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            company_name: config.company_name.clone(),
            user_name: config.user_name.clone(),
            password: config.password.clone(),
            validity_hours: config.token_validity_hours,
            transport,
            store,
            current: Mutex::new(None),
        }
    }

    /// Return a token that has not passed its expiry, logging in if needed.
    pub async fn valid_token(&self) -> Result<String, PlatformError> {
        let mut current = self.current.lock().await;
        let now = Utc::now();

        if let Some(session) = current.as_ref().filter(|s| s.is_valid_at(now)) {
            return Ok(session.token.clone());
        }

        match self.store.load().await {
            Ok(Some(cached)) => {
                let session = cached.into_session();
                if session.is_valid_at(now) {
                    debug!(expires_at = %session.expires_at, "Adopted cached platform token");
                    let token = session.token.clone();
                    *current = Some(session);
                    return Ok(token);
                }
                debug!(expired_at = %session.expires_at, "Cached platform token expired");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Ignoring unreadable token cache"),
        }

        self.establish(&mut current).await
    }

    /// Log in regardless of any cached token and persist the new one.
    pub async fn refresh(&self) -> Result<SessionToken, PlatformError> {
        let mut current = self.current.lock().await;
        self.establish(&mut current).await?;
        current
            .clone()
            .ok_or_else(|| PlatformError::Authentication("Session was not established".to_string()))
    }

    /// Forget the in-memory token. The next call re-reads the store.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    async fn establish(&self, current: &mut Option<SessionToken>) -> Result<String, PlatformError> {
        let now = Utc::now();
        let expires_at = Duration::try_hours(self.validity_hours)
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| {
                PlatformError::Config(format!(
                    "Token validity of {} hours is out of range",
                    self.validity_hours
                ))
            })?;
        let token = self.login().await?;
        let session = SessionToken { token, expires_at };
        if let Err(e) = self.store.save(&CachedToken::from_session(&session, now)).await {
            warn!(error = %e, "Failed to persist platform token");
        }
        info!(expires_at = %session.expires_at, "Platform session established");

        let token = session.token.clone();
        *current = Some(session);
        Ok(token)
    }

    async fn login(&self) -> Result<String, PlatformError> {
        let body = encode_body(&LoginRequest {
            company_name: self.company_name.clone(),
            user_name: self.user_name.clone(),
            password: self.password.clone(),
        })
        .map_err(PlatformError::Authentication)?;

        let response = self
            .transport
            .send(VendorRequest::new(HttpMethod::Post, LOGIN_PATH).with_body(body))
            .await
            .map_err(|e| PlatformError::Authentication(e.to_string()))?;

        let outcome = VendorOutcome::from_response(response);
        if !outcome.success {
            return Err(PlatformError::Authentication(outcome.message));
        }

        let data: LoginData = outcome
            .data
            .map(serde_json::from_value::<LoginData>)
            .transpose()
            .map_err(|e| PlatformError::Authentication(format!("Malformed login response: {}", e)))?
            .ok_or_else(|| PlatformError::Authentication("Login response has no data".to_string()))?;

        if data.token.is_empty() {
            return Err(PlatformError::Authentication(
                "Login response has no token".to_string(),
            ));
        }
        Ok(data.token)
    }
}
