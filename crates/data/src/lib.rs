pub mod db;
pub mod settings;

use async_trait::async_trait;
use tradeportal_core::{
    AccountDirectory, Currency, DirectoryError, FundingKind, FundingLedger, FundingRequest,
    LedgerError, RequestStatus, SettingsError, SettingsSource, SystemSettings, TransitionError,
};
use uuid::Uuid;

/// Issued-account lookup backed by the `users` table.
#[derive(Clone)]
pub struct PostgresAccountDirectory {
    pub pool: sqlx::PgPool,
}

impl PostgresAccountDirectory {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    async fn last_account_id(&self, currency: Currency) -> Result<Option<i64>, DirectoryError> {
        db::last_account_id(&self.pool, currency)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))
    }

    async fn reserve_account(
        &self,
        user_id: i64,
        currency: Currency,
        account_id: i64,
    ) -> Result<(), DirectoryError> {
        let reserved = match db::reserve_platform_account(&self.pool, user_id, currency, account_id).await {
            Ok(rows) => rows,
            Err(e) if db::is_unique_violation(&e) => {
                return Err(DirectoryError::AccountTaken {
                    currency,
                    account_id,
                })
            }
            Err(e) => return Err(DirectoryError::DatabaseError(e.to_string())),
        };
        if reserved == 1 {
            return Ok(());
        }

        let exists = db::user_exists(&self.pool, user_id)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        if exists {
            Err(DirectoryError::AlreadyAssigned(user_id))
        } else {
            Err(DirectoryError::UnknownUser(user_id))
        }
    }

    async fn confirm_account(
        &self,
        user_id: i64,
        account_id: i64,
        vendor_user_id: Option<i64>,
    ) -> Result<(), DirectoryError> {
        let updated = db::confirm_platform_account(&self.pool, user_id, account_id, vendor_user_id)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        if updated == 0 {
            return Err(DirectoryError::UnknownUser(user_id));
        }
        Ok(())
    }

    async fn release_account(&self, user_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        db::release_platform_account(&self.pool, user_id, account_id)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

/// Settings read from the `system_settings` table on every call.
#[derive(Clone)]
pub struct PostgresSettingsSource {
    pub pool: sqlx::PgPool,
}

impl PostgresSettingsSource {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsSource for PostgresSettingsSource {
    async fn load(&self) -> Result<SystemSettings, SettingsError> {
        let pairs = db::load_settings(&self.pool)
            .await
            .map_err(|e| SettingsError::DatabaseError(e.to_string()))?;
        Ok(settings::settings_from_pairs(&pairs))
    }
}

/// Funding request ledger backed by the `funding_requests` table.
#[derive(Clone)]
pub struct PostgresFundingLedger {
    pub pool: sqlx::PgPool,
}

impl PostgresFundingLedger {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(e: sqlx::Error) -> LedgerError {
    LedgerError::DatabaseError(e.to_string())
}

#[async_trait]
impl FundingLedger for PostgresFundingLedger {
    async fn insert(&self, request: &FundingRequest) -> Result<(), LedgerError> {
        db::insert_funding_request(&self.pool, request)
            .await
            .map_err(db_err)
    }

    async fn get(&self, id: Uuid) -> Result<FundingRequest, LedgerError> {
        db::get_funding_request(&self.pool, id)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound(id))
    }

    async fn list(
        &self,
        kind: FundingKind,
        status: Option<RequestStatus>,
    ) -> Result<Vec<FundingRequest>, LedgerError> {
        db::list_funding_requests(&self.pool, kind, status)
            .await
            .map_err(db_err)
    }

    async fn attach_submission(
        &self,
        id: Uuid,
        vendor_request_id: Option<i64>,
        branch_id: Option<i64>,
    ) -> Result<FundingRequest, LedgerError> {
        db::attach_funding_submission(&self.pool, id, vendor_request_id, branch_id)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound(id))
    }

    async fn discard(&self, id: Uuid) -> Result<(), LedgerError> {
        db::delete_unsubmitted_funding_request(&self.pool, id)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn claim(&self, id: Uuid) -> Result<FundingRequest, LedgerError> {
        if let Some(claimed) = db::claim_funding_request(&self.pool, id)
            .await
            .map_err(db_err)?
        {
            return Ok(claimed);
        }

        let current = self.get(id).await?;
        if current.status != RequestStatus::Pending {
            return Err(TransitionError {
                from: current.status,
                to: current.status,
            }
            .into());
        }
        Err(LedgerError::InProgress(id))
    }

    async fn release_claim(&self, id: Uuid) -> Result<(), LedgerError> {
        db::release_funding_claim(&self.pool, id).await.map_err(db_err)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<FundingRequest, LedgerError> {
        let current = self.get(id).await?;
        current.status.transition(status)?;

        match db::finalize_funding_request(&self.pool, id, status)
            .await
            .map_err(db_err)?
        {
            Some(updated) => Ok(updated),
            // Another writer finalized it between the read and the update.
            None => {
                let latest = self.get(id).await?;
                Err(TransitionError {
                    from: latest.status,
                    to: status,
                }
                .into())
            }
        }
    }
}
