use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Account currency supported by the trading platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Inr, Currency::Usd];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
        }
    }

    /// Vendor `currenciesPolicyID` assigned to accounts in this currency.
    pub fn policy_id(&self) -> i64 {
        match self {
            Currency::Inr => 71,
            Currency::Usd => 72,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::Inr),
            "USD" => Ok(Currency::Usd),
            other => Err(UnknownCurrency(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// System Settings
// ---------------------------------------------------------------------------

/// Per-currency settings maintained by portal administrators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencySettings {
    /// Numeric series base for new account IDs, kept exactly as entered.
    pub series: Option<String>,
    /// House account that receives withdrawal-style transfers.
    pub main_account_id: Option<i64>,
    /// House user that sends deposit-style transfers.
    pub main_user_id: Option<i64>,
}

impl CurrencySettings {
    /// Parse the series value. Blank or non-numeric values yield `None`.
    pub fn series_base(&self) -> Option<i64> {
        self.series
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
    }
}

/// Admin-managed settings read by the integration layer at call time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub bank_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub second_password: Option<String>,
    #[serde(default)]
    pub currencies: HashMap<Currency, CurrencySettings>,
}

impl SystemSettings {
    pub fn currency(&self, currency: Currency) -> Option<&CurrencySettings> {
        self.currencies.get(&currency)
    }

    pub fn currency_mut(&mut self, currency: Currency) -> &mut CurrencySettings {
        self.currencies.entry(currency).or_default()
    }
}

// ---------------------------------------------------------------------------
// Funding Requests
// ---------------------------------------------------------------------------

/// Whether a funding request moves money into or out of a trading account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingKind {
    Deposit,
    Withdrawal,
}

impl FundingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundingKind::Deposit => "deposit",
            FundingKind::Withdrawal => "withdrawal",
        }
    }
}

/// Admin decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Status code the vendor expects when handling a request.
    pub fn vendor_status(&self) -> i32 {
        match self {
            Decision::Approve => 2,
            Decision::Reject => 3,
        }
    }

    pub fn outcome_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// The lifecycle state of a funding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal status transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    /// Only pending requests may move, and only to a final state.
    pub fn transition(self, to: RequestStatus) -> Result<RequestStatus, TransitionError> {
        match (self, to) {
            (RequestStatus::Pending, RequestStatus::Approved)
            | (RequestStatus::Pending, RequestStatus::Rejected) => Ok(to),
            (from, to) => Err(TransitionError { from, to }),
        }
    }
}

/// A deposit or withdrawal request as tracked by the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRequest {
    pub id: Uuid,
    pub kind: FundingKind,
    pub amount: Decimal,
    pub currency: Currency,
    pub vendor_user_id: i64,
    pub bank_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub comment: String,
    /// MTR number supplied by the customer for reconciliation.
    pub reference: Option<String>,
    /// ID assigned by the vendor on submission.
    pub vendor_request_id: Option<i64>,
    pub status: RequestStatus,
    /// Set while a decision is being sent to the vendor.
    #[serde(default)]
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundingRequest {
    pub fn new(
        kind: FundingKind,
        amount: Decimal,
        currency: Currency,
        vendor_user_id: i64,
        comment: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            amount,
            currency,
            vendor_user_id,
            bank_id: None,
            branch_id: None,
            comment: comment.into(),
            reference: None,
            vendor_request_id: None,
            status: RequestStatus::Pending,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// Direction of a transfer relative to the customer's trading account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    /// House account pays the customer.
    Deposit,
    /// Customer pays the house account.
    Withdrawal,
}

/// Fully resolved money transfer between two vendor accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferInstruction {
    pub sender_user_id: i64,
    pub receiver_account_id: i64,
    pub amount: Decimal,
    pub direction: TransferDirection,
}
