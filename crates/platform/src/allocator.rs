use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use tradeportal_core::{AccountDirectory, Currency, DirectoryError, SettingsSource};

/// How an account ID was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationSource {
    /// Last issued ID for the currency plus one.
    Sequential,
    /// First account of the currency, taken from the configured series.
    SeriesBase,
    /// First account of the currency with no series configured.
    DefaultBase,
    /// Lookup failed; internal user ID plus series offset. May collide
    /// with IDs issued sequentially.
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountAllocation {
    pub account_id: i64,
    pub source: AllocationSource,
}

/// Hands out vendor account IDs for newly registered users.
pub struct AccountAllocator {
    directory: Arc<dyn AccountDirectory>,
    settings: Arc<dyn SettingsSource>,
    /// Held from allocation until the ID is reserved in the directory.
    reservation: Mutex<()>,
}

impl AccountAllocator {
    pub fn new(directory: Arc<dyn AccountDirectory>, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            directory,
            settings,
            reservation: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &dyn AccountDirectory {
        self.directory.as_ref()
    }

    /// Allocate an account ID and reserve it for `internal_user_id` before
    /// anything is sent to the vendor.
    ///
    /// An unknown or already provisioned user, or an ID another process took
    /// first, is an error. A degraded allocation whose reservation fails for
    /// lack of a database still goes ahead, logged.
    pub async fn reserve(
        &self,
        currency: Currency,
        internal_user_id: i64,
    ) -> Result<AccountAllocation, DirectoryError> {
        let _guard = self.reservation.lock().await;
        let allocation = self.allocate(currency, internal_user_id).await;

        match self
            .directory
            .reserve_account(internal_user_id, currency, allocation.account_id)
            .await
        {
            Ok(()) => Ok(allocation),
            Err(e @ (DirectoryError::DatabaseError(_) | DirectoryError::Unavailable(_)))
                if allocation.source == AllocationSource::Degraded =>
            {
                warn!(
                    currency = %currency,
                    account_id = allocation.account_id,
                    internal_user_id,
                    error = %e,
                    "Degraded account ID could not be reserved"
                );
                Ok(allocation)
            }
            Err(e) => Err(e),
        }
    }

    /// Allocate the next account ID for `currency`.
    ///
    /// Never fails: if the directory or settings cannot be read, the
    /// degraded formula is used and logged.
    pub async fn allocate(&self, currency: Currency, internal_user_id: i64) -> AccountAllocation {
        match self.allocate_sequential(currency).await {
            Ok(allocation) => {
                debug!(
                    currency = %currency,
                    account_id = allocation.account_id,
                    source = ?allocation.source,
                    "Allocated account ID"
                );
                allocation
            }
            Err(reason) => self.allocate_degraded(currency, internal_user_id, &reason).await,
        }
    }

    async fn allocate_sequential(&self, currency: Currency) -> Result<AccountAllocation, String> {
        let last = self
            .directory
            .last_account_id(currency)
            .await
            .map_err(|e| e.to_string())?;

        if let Some(last) = last {
            return Ok(AccountAllocation {
                account_id: last + 1,
                source: AllocationSource::Sequential,
            });
        }

        let settings = self.settings.load().await.map_err(|e| e.to_string())?;
        let configured = settings.currency(currency).and_then(|c| c.series.clone());
        let base = settings.currency(currency).and_then(|c| c.series_base());
        if base.is_none() && configured.is_some() {
            warn!(currency = %currency, series = ?configured, "Ignoring non-numeric series");
        }

        Ok(match base {
            Some(base) => AccountAllocation {
                account_id: base,
                source: AllocationSource::SeriesBase,
            },
            None => AccountAllocation {
                account_id: 1,
                source: AllocationSource::DefaultBase,
            },
        })
    }

    async fn allocate_degraded(
        &self,
        currency: Currency,
        internal_user_id: i64,
        reason: &str,
    ) -> AccountAllocation {
        let offset = match self.settings.load().await {
            Ok(settings) => settings
                .currency(currency)
                .and_then(|c| c.series_base())
                .unwrap_or(0),
            Err(_) => 0,
        };
        let account_id = internal_user_id + offset;
        warn!(
            currency = %currency,
            internal_user_id,
            offset,
            account_id,
            reason,
            "Account lookup failed, using degraded allocation"
        );
        AccountAllocation {
            account_id,
            source: AllocationSource::Degraded,
        }
    }
}
