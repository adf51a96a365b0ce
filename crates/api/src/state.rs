use std::sync::Arc;
use tradeportal_core::{FundingLedger, SettingsSource};
use tradeportal_platform::PlatformClient;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub platform: Arc<PlatformClient>,
    pub ledger: Arc<dyn FundingLedger>,
    pub settings: Arc<dyn SettingsSource>,
    /// Bearer token admin callers must present. `None` disables the check.
    pub admin_token: Option<String>,
}

impl AppState {
    /// Wire the Postgres-backed collaborators around an existing pool.
    pub fn postgres(
        pool: sqlx::PgPool,
        platform: Arc<PlatformClient>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            platform,
            ledger: Arc::new(tradeportal_data::PostgresFundingLedger::new(pool.clone())),
            settings: Arc::new(tradeportal_data::PostgresSettingsSource::new(pool)),
            admin_token,
        }
    }
}
