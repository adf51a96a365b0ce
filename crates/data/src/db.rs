use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tradeportal_core::{Currency, FundingKind, FundingRequest, RequestStatus};
use uuid::Uuid;

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Issued accounts
// ---------------------------------------------------------------------------

/// Highest vendor account ID issued to users of a currency.
pub async fn last_account_id(pool: &PgPool, currency: Currency) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT MAX(trading_platform_account_id) AS last_id
         FROM users
         WHERE currency = $1 AND trading_platform_account_id IS NOT NULL",
    )
    .bind(currency.code())
    .fetch_one(pool)
    .await?;

    row.try_get("last_id")
}

pub async fn user_exists(pool: &PgPool, user_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1) AS present")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    row.try_get("present")
}

/// Reserve an account ID for a user that has none yet. The unique index on
/// `(currency, trading_platform_account_id)` rejects an ID already issued.
pub async fn reserve_platform_account(
    pool: &PgPool,
    user_id: i64,
    currency: Currency,
    account_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users
         SET currency = $2, trading_platform_account_id = $3, trading_platform_user_id = NULL
         WHERE id = $1 AND trading_platform_account_id IS NULL",
    )
    .bind(user_id)
    .bind(currency.code())
    .bind(account_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn confirm_platform_account(
    pool: &PgPool,
    user_id: i64,
    account_id: i64,
    vendor_user_id: Option<i64>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET trading_platform_user_id = $3
         WHERE id = $1 AND trading_platform_account_id = $2",
    )
    .bind(user_id)
    .bind(account_id)
    .bind(vendor_user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn release_platform_account(
    pool: &PgPool,
    user_id: i64,
    account_id: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET trading_platform_account_id = NULL, trading_platform_user_id = NULL
         WHERE id = $1 AND trading_platform_account_id = $2 AND trading_platform_user_id IS NULL",
    )
    .bind(user_id)
    .bind(account_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

// ---------------------------------------------------------------------------
// System settings
// ---------------------------------------------------------------------------

/// All key/value pairs from the settings table.
pub async fn load_settings(pool: &PgPool) -> Result<Vec<(String, String)>, sqlx::Error> {
    let rows = sqlx::query("SELECT key, value FROM system_settings ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| (r.get("key"), r.get("value"))).collect())
}

// ---------------------------------------------------------------------------
// Funding requests
// ---------------------------------------------------------------------------

const FUNDING_COLUMNS: &str = "id, kind, amount, currency, vendor_user_id, bank_id, branch_id,
     comment, reference, vendor_request_id, status, claimed_at, created_at, updated_at";

/// Map a `funding_requests` row back to the domain type.
fn funding_from_row(r: &PgRow) -> Result<FundingRequest, sqlx::Error> {
    let kind: String = r.try_get("kind")?;
    let currency: String = r.try_get("currency")?;
    let status: String = r.try_get("status")?;

    let decode = |column: &str, value: &str| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unexpected value {:?}", value).into(),
    };

    Ok(FundingRequest {
        id: r.try_get("id")?,
        kind: match kind.as_str() {
            "deposit" => FundingKind::Deposit,
            "withdrawal" => FundingKind::Withdrawal,
            other => return Err(decode("kind", other)),
        },
        amount: r.try_get("amount")?,
        currency: currency.parse().map_err(|_| decode("currency", &currency))?,
        vendor_user_id: r.try_get("vendor_user_id")?,
        bank_id: r.try_get("bank_id")?,
        branch_id: r.try_get("branch_id")?,
        comment: r.try_get("comment")?,
        reference: r.try_get("reference")?,
        vendor_request_id: r.try_get("vendor_request_id")?,
        status: RequestStatus::parse(&status).ok_or_else(|| decode("status", &status))?,
        claimed_at: r.try_get("claimed_at")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

pub async fn insert_funding_request(pool: &PgPool, req: &FundingRequest) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO funding_requests (
            id, kind, amount, currency, vendor_user_id, bank_id, branch_id,
            comment, reference, vendor_request_id, status, claimed_at, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(req.id)
    .bind(req.kind.as_str())
    .bind(req.amount)
    .bind(req.currency.code())
    .bind(req.vendor_user_id)
    .bind(req.bank_id)
    .bind(req.branch_id)
    .bind(&req.comment)
    .bind(&req.reference)
    .bind(req.vendor_request_id)
    .bind(req.status.as_str())
    .bind(req.claimed_at)
    .bind(req.created_at)
    .bind(req.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_funding_request(pool: &PgPool, id: Uuid) -> Result<Option<FundingRequest>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM funding_requests WHERE id = $1",
        FUNDING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(funding_from_row).transpose()
}

pub async fn list_funding_requests(
    pool: &PgPool,
    kind: FundingKind,
    status: Option<RequestStatus>,
) -> Result<Vec<FundingRequest>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM funding_requests
         WHERE kind = $1 AND ($2::TEXT IS NULL OR status = $2)
         ORDER BY created_at DESC",
        FUNDING_COLUMNS
    ))
    .bind(kind.as_str())
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    rows.iter().map(funding_from_row).collect()
}

pub async fn attach_funding_submission(
    pool: &PgPool,
    id: Uuid,
    vendor_request_id: Option<i64>,
    branch_id: Option<i64>,
) -> Result<Option<FundingRequest>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "UPDATE funding_requests
         SET vendor_request_id = $2, branch_id = COALESCE($3, branch_id), updated_at = NOW()
         WHERE id = $1
         RETURNING {}",
        FUNDING_COLUMNS
    ))
    .bind(id)
    .bind(vendor_request_id)
    .bind(branch_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(funding_from_row).transpose()
}

/// Delete a pending request that never reached the vendor.
pub async fn delete_unsubmitted_funding_request(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM funding_requests
         WHERE id = $1 AND status = 'pending' AND vendor_request_id IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Age after which an unreleased claim is treated as abandoned.
pub const CLAIM_TIMEOUT_SECS: f64 = 300.0;

/// Claim a pending request for resolution. A claim older than
/// `CLAIM_TIMEOUT_SECS` counts as abandoned. Returns `None` when the request
/// is not pending or is claimed by someone else.
pub async fn claim_funding_request(pool: &PgPool, id: Uuid) -> Result<Option<FundingRequest>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "UPDATE funding_requests
         SET claimed_at = NOW()
         WHERE id = $1 AND status = 'pending'
           AND (claimed_at IS NULL OR claimed_at < NOW() - make_interval(secs => $2))
         RETURNING {}",
        FUNDING_COLUMNS
    ))
    .bind(id)
    .bind(CLAIM_TIMEOUT_SECS)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(funding_from_row).transpose()
}

pub async fn release_funding_claim(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE funding_requests SET claimed_at = NULL WHERE id = $1 AND status = 'pending'")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Move a pending request to `status`. Returns `None` when the request is
/// missing or no longer pending.
pub async fn finalize_funding_request(
    pool: &PgPool,
    id: Uuid,
    status: RequestStatus,
) -> Result<Option<FundingRequest>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "UPDATE funding_requests
         SET status = $2, claimed_at = NULL, updated_at = NOW()
         WHERE id = $1 AND status = 'pending'
         RETURNING {}",
        FUNDING_COLUMNS
    ))
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(funding_from_row).transpose()
}
