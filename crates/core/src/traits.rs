use crate::models::*;
use async_trait::async_trait;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Account Directory
// ---------------------------------------------------------------------------

/// Errors raised while looking up previously issued accounts.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown user: {0}")]
    UnknownUser(i64),
    #[error("User {0} already has a trading account")]
    AlreadyAssigned(i64),
    #[error("Account ID {account_id} is already issued for {currency}")]
    AccountTaken { currency: Currency, account_id: i64 },
}

/// Registry of the vendor accounts issued to portal users.
///
/// An account ID is reserved for a user before the vendor is asked to open
/// it, so a reserved ID is never handed out twice.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Most recently issued vendor account ID among users of `currency`.
    async fn last_account_id(&self, currency: Currency) -> Result<Option<i64>, DirectoryError>;

    /// Claim `account_id` for portal user `user_id`.
    async fn reserve_account(
        &self,
        user_id: i64,
        currency: Currency,
        account_id: i64,
    ) -> Result<(), DirectoryError>;

    /// Record the vendor user ID once the vendor has opened the account.
    async fn confirm_account(
        &self,
        user_id: i64,
        account_id: i64,
        vendor_user_id: Option<i64>,
    ) -> Result<(), DirectoryError>;

    /// Drop a reservation the vendor refused.
    async fn release_account(&self, user_id: i64, account_id: i64) -> Result<(), DirectoryError>;
}

// ---------------------------------------------------------------------------
// Settings Source
// ---------------------------------------------------------------------------

/// Errors raised while reading admin-managed settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Source of the system settings. Read on every call; never cached.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<SystemSettings, SettingsError>;
}

/// Fixed settings, used by the CLI and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub SystemSettings);

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn load(&self) -> Result<SystemSettings, SettingsError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Funding Ledger
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Funding request not found: {0}")]
    NotFound(Uuid),
    #[error("Funding request {0} is already being resolved")]
    InProgress(Uuid),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Local record of deposit and withdrawal requests.
#[async_trait]
pub trait FundingLedger: Send + Sync {
    async fn insert(&self, request: &FundingRequest) -> Result<(), LedgerError>;

    async fn get(&self, id: Uuid) -> Result<FundingRequest, LedgerError>;

    /// List requests of one kind, newest first, optionally filtered by status.
    async fn list(
        &self,
        kind: FundingKind,
        status: Option<RequestStatus>,
    ) -> Result<Vec<FundingRequest>, LedgerError>;

    /// Fill in what the vendor returned for a submitted request.
    async fn attach_submission(
        &self,
        id: Uuid,
        vendor_request_id: Option<i64>,
        branch_id: Option<i64>,
    ) -> Result<FundingRequest, LedgerError>;

    /// Remove a pending request the vendor never accepted.
    async fn discard(&self, id: Uuid) -> Result<(), LedgerError>;

    /// Mark a pending request as being resolved. Fails with `InProgress`
    /// while another caller holds the claim.
    async fn claim(&self, id: Uuid) -> Result<FundingRequest, LedgerError>;

    /// Give up a claim without changing the status.
    async fn release_claim(&self, id: Uuid) -> Result<(), LedgerError>;

    /// Move a pending request to its final status and clear any claim.
    async fn update_status(
        &self,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<FundingRequest, LedgerError>;
}
