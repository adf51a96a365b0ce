use crate::auth::require_admin;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tradeportal_core::{
    Currency, Decision, FundingKind, FundingRequest, RequestStatus, TransferDirection,
};
use tradeportal_platform::{AccountIdentity, PlatformError, SubmittedRequest, VendorOutcome};
use uuid::Uuid;

pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        // Accounts
        .route("/accounts", post(provision_account))
        .route("/accounts/{vendor_user_id}/financials", get(account_financials))
        // Deposits
        .route("/deposits", get(list_deposits).post(submit_deposit))
        .route("/deposits/{id}/resolve", post(resolve_deposit))
        // Withdrawals
        .route("/withdrawals", get(list_withdrawals).post(submit_withdrawal))
        .route("/withdrawals/{id}/resolve", post(resolve_withdrawal))
        // Transfers
        .route("/transfers", post(submit_transfer))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        // Health
        .route("/health", get(health_check))
        .merge(admin)
}

/// Turn a failed vendor outcome into a 502 carrying the vendor's message.
fn vendor_result<T>(outcome: VendorOutcome<T>) -> Result<VendorOutcome<T>, ApiError> {
    if outcome.success {
        Ok(outcome)
    } else {
        Err(ApiError::Vendor(outcome.message))
    }
}

fn vendor_call<T>(
    result: Result<VendorOutcome<T>, PlatformError>,
) -> Result<VendorOutcome<T>, ApiError> {
    result.map_err(ApiError::from).and_then(vendor_result)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProvisionRequest {
    /// Portal user the account is opened for.
    user_id: i64,
    currency: Currency,
    #[serde(flatten)]
    identity: AccountIdentity,
}

async fn provision_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProvisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = vendor_result(
        state
            .platform
            .provision_account(req.currency, req.user_id, &req.identity)
            .await?,
    )?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn account_financials(
    State(state): State<Arc<AppState>>,
    Path(vendor_user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = vendor_result(state.platform.get_balance(vendor_user_id).await?)?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// Deposits & Withdrawals
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    status: Option<RequestStatus>,
}

async fn list_deposits(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.list(FundingKind::Deposit, q.status).await?))
}

async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.ledger.list(FundingKind::Withdrawal, q.status).await?))
}

#[derive(Deserialize)]
struct FundingSubmission {
    amount: Decimal,
    currency: Currency,
    vendor_user_id: i64,
    /// Deposits only; falls back to the configured bank.
    bank_id: Option<i64>,
    #[serde(default)]
    comment: String,
    /// MTR number from the customer.
    reference: Option<String>,
}

impl FundingSubmission {
    fn validate(&self) -> Result<(), ApiError> {
        if self.amount <= Decimal::ZERO {
            return Err(ApiError::Unprocessable("Amount must be positive".to_string()));
        }
        Ok(())
    }

    fn into_request(self, kind: FundingKind) -> FundingRequest {
        let mut request =
            FundingRequest::new(kind, self.amount, self.currency, self.vendor_user_id, self.comment);
        request.reference = self.reference;
        request
    }
}

async fn submit_deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FundingSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let bank_id = match req.bank_id {
        Some(id) => id,
        None => state
            .settings
            .load()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .bank_id
            .ok_or_else(|| ApiError::Unprocessable("No bank ID given or configured".to_string()))?,
    };

    let mut record = req.into_request(FundingKind::Deposit);
    record.bank_id = Some(bank_id);
    state.ledger.insert(&record).await?;

    let submitted = state
        .platform
        .submit_deposit(record.amount, bank_id, &record.comment, record.vendor_user_id)
        .await;
    let record = record_submission(&state, record.id, submitted).await?;

    tracing::info!(id = %record.id, vendor_request_id = ?record.vendor_request_id, "Deposit request recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn submit_withdrawal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FundingSubmission>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let record = req.into_request(FundingKind::Withdrawal);
    state.ledger.insert(&record).await?;

    let submitted = state
        .platform
        .submit_withdrawal(record.amount, &record.comment, record.vendor_user_id)
        .await;
    let record = record_submission(&state, record.id, submitted).await?;

    tracing::info!(id = %record.id, vendor_request_id = ?record.vendor_request_id, "Withdrawal request recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fill in a pending record from the vendor's answer, or drop it when the
/// vendor did not accept the request.
async fn record_submission(
    state: &AppState,
    id: Uuid,
    submitted: Result<VendorOutcome<SubmittedRequest>, PlatformError>,
) -> Result<FundingRequest, ApiError> {
    let outcome = match vendor_call(submitted) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(discard) = state.ledger.discard(id).await {
                tracing::warn!(id = %id, error = %discard, "Failed to discard unsubmitted request");
            }
            return Err(e);
        }
    };

    let vendor_request_id = outcome.data.as_ref().and_then(|d| d.request_id);
    let branch_id = outcome.data.as_ref().and_then(|d| d.branch_id);
    state
        .ledger
        .attach_submission(id, vendor_request_id, branch_id)
        .await
        .map_err(|e| {
            tracing::error!(
                id = %id,
                vendor_request_id = ?vendor_request_id,
                error = %e,
                "Vendor accepted request but ledger was not updated"
            );
            ApiError::from(e)
        })
}

#[derive(Deserialize)]
struct ResolveRequest {
    decision: Decision,
    #[serde(default)]
    comment: String,
}

async fn resolve_deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    resolve(&state, FundingKind::Deposit, id, req).await
}

async fn resolve_withdrawal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    resolve(&state, FundingKind::Withdrawal, id, req).await
}

async fn resolve(
    state: &AppState,
    kind: FundingKind,
    id: Uuid,
    req: ResolveRequest,
) -> Result<Json<FundingRequest>, ApiError> {
    let record = state.ledger.get(id).await?;
    if record.kind != kind {
        return Err(ApiError::NotFound(format!("No {} request {}", kind.as_str(), id)));
    }
    // Checked before calling the vendor so a decided request is never re-sent.
    record
        .status
        .transition(req.decision.outcome_status())
        .map_err(|e| ApiError::Conflict(e.to_string()))?;
    let vendor_request_id = record.vendor_request_id.ok_or_else(|| {
        ApiError::Conflict(format!("Request {} has no vendor request ID", id))
    })?;

    // Held until the status is written, so only one decision reaches the vendor.
    state.ledger.claim(id).await?;

    let decided = match kind {
        FundingKind::Deposit => {
            state
                .platform
                .resolve_deposit(vendor_request_id, req.decision, &req.comment)
                .await
        }
        FundingKind::Withdrawal => {
            state
                .platform
                .resolve_withdrawal(vendor_request_id, req.decision, &req.comment)
                .await
        }
    };
    if let Err(e) = vendor_call(decided) {
        if let Err(release) = state.ledger.release_claim(id).await {
            tracing::warn!(id = %id, error = %release, "Failed to release claim");
        }
        return Err(e);
    }

    let updated = state
        .ledger
        .update_status(id, req.decision.outcome_status())
        .await?;
    tracing::info!(id = %id, kind = kind.as_str(), status = updated.status.as_str(), "Funding request resolved");
    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TransferRequest {
    currency: Currency,
    vendor_user_id: i64,
    account_id: i64,
    amount: Decimal,
    direction: TransferDirection,
}

async fn submit_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.amount <= Decimal::ZERO {
        return Err(ApiError::Unprocessable("Amount must be positive".to_string()));
    }
    let outcome = vendor_result(
        state
            .platform
            .transfer_for_user(
                req.currency,
                req.vendor_user_id,
                req.account_id,
                req.amount,
                req.direction,
            )
            .await?,
    )?;
    Ok(Json(outcome))
}
