use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tradeportal_core::{AccountDirectory, SettingsSource, SystemSettings};

use crate::allocator::AccountAllocator;
use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::HttpMethod;
use crate::session::SessionManager;
use crate::token_store::{FileTokenStore, TokenStore};
use crate::transport::{HttpTransport, Transport, VendorRequest};

/// Trading-platform client.
///
/// Operations are split across `issuer`, `resolver`, `financials` and
/// `provisioning`; this type holds the shared session and collaborators.
/// Each operation issues exactly one vendor call and never retries.
pub struct PlatformClient {
    transport: Arc<dyn Transport>,
    session: SessionManager,
    settings: Arc<dyn SettingsSource>,
    allocator: AccountAllocator,
}

impl PlatformClient {
    /// Build a client that talks HTTP and caches its token in a file.
    pub fn new(
        config: &PlatformConfig,
        settings: Arc<dyn SettingsSource>,
        directory: Arc<dyn AccountDirectory>,
    ) -> Result<Self, PlatformError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?);
        let store = Arc::new(FileTokenStore::new(config.token_cache_path.clone()));
        info!(base_url = %config.base_url, "Trading platform client configured");
        Ok(Self::with_parts(config, transport, store, settings, directory))
    }

    pub fn with_parts(
        config: &PlatformConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
        settings: Arc<dyn SettingsSource>,
        directory: Arc<dyn AccountDirectory>,
    ) -> Self {
        Self {
            session: SessionManager::new(config, transport.clone(), store),
            allocator: AccountAllocator::new(directory, settings.clone()),
            transport,
            settings,
        }
    }

    pub fn allocator(&self) -> &AccountAllocator {
        &self.allocator
    }

    /// Authenticated call. Only token acquisition can fail with `Err`.
    pub(crate) async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<VendorOutcome<Value>, PlatformError> {
        let token = self.session.valid_token().await?;
        let mut request = VendorRequest::new(method, path).with_bearer(token);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        let outcome = match self.transport.send(request).await {
            Ok(response) => VendorOutcome::from_response(response),
            Err(e) => VendorOutcome::failure(e.to_string()),
        };
        if !outcome.success {
            warn!(method = method.as_str(), path, message = %outcome.message, "Vendor call failed");
        }
        Ok(outcome)
    }

    /// Settings are read fresh for every operation.
    pub(crate) async fn load_settings(&self) -> Result<SystemSettings, String> {
        self.settings
            .load()
            .await
            .map_err(|e| format!("Cannot read system settings: {}", e))
    }
}
