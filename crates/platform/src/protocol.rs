//! Wire contract of the trading-platform REST API.
//!
//! Field names and types are fixed by the vendor and must not change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LOGIN_PATH: &str = "/login/public/api/v1/login";
pub const CREATE_USER_PATH: &str = "/admin/public/api/v1/user";
pub const DEPOSIT_REQUEST_PATH: &str = "/admin/public/api/v1/depositRequest";
pub const DEPOSIT_HANDLE_PATH: &str = "/admin/public/api/v1/depositRequest/handle";
pub const CASH_REQUEST_PATH: &str = "/trading/public/api/v1/cashRequest";
pub const CASH_DELIVERY_ACCEPT_PATH: &str = "/admin/public/api/v1/cashDelivery/accept";
pub const CASH_DELIVERY_PATH: &str = "/admin/public/api/v1/cashDelivery";
pub const MONEY_TRANSACTION_PATH: &str = "/admin/public/api/v1/money/transaction";

pub const GENERIC_POLICY_ID: i64 = 41;
pub const PARENT_ID: i64 = 372;
/// The only transfer type the portal issues.
pub const TRANSFER_TYPE: i32 = 1;

pub fn user_financials_path(user_id: i64) -> String {
    format!("/trading/public/api/v1/userFinancials/{}", user_id)
}

/// HTTP verbs used by the vendor API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

/// Response envelope shared by every vendor endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub company_name: String,
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(rename = "accountID")]
    pub account_id: i64,
    #[serde(rename = "currenciesPolicyID")]
    pub currencies_policy_id: i64,
    #[serde(rename = "genericPolicyID")]
    pub generic_policy_id: i64,
    pub parent_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub email: String,
    pub phone: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequestBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub bank_id: i64,
    pub comment: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDepositBody {
    pub bank_id: i64,
    pub comment: String,
    pub request_id: i64,
    pub status: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashRequestBody {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub branch_id: i64,
    pub comment: String,
    pub user_id: i64,
    pub second_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashDeliveryBody {
    pub branch_id: i64,
    pub comment: String,
    pub request_id: i64,
    pub status: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyTransactionBody {
    pub receiver_account_id: i64,
    pub second_password: String,
    pub sender_user_id: i64,
    pub transfer_type: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub trx_amount: Decimal,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: String,
}

/// Financial snapshot of a vendor user.
///
/// Only the commonly used figures are typed; everything else the vendor
/// sends is preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFinancials {
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub equity: Option<Decimal>,
    #[serde(default)]
    pub margin: Option<Decimal>,
    #[serde(default)]
    pub free_margin: Option<Decimal>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Serialize a request body. Encoding failures are reported rather than
/// sent as `null`.
pub fn encode_body<T: Serialize>(body: &T) -> Result<Value, String> {
    serde_json::to_value(body).map_err(|e| format!("Cannot encode request body: {}", e))
}

/// Extract a vendor-assigned numeric `id` from a response payload.
pub fn data_id(data: &Value) -> Option<i64> {
    match data.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_create_user_field_names() {
        let body = CreateUserRequest {
            account_id: 1000,
            currencies_policy_id: 72,
            generic_policy_id: GENERIC_POLICY_ID,
            parent_id: PARENT_ID,
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            username: "asha".to_string(),
            password: "pw".to_string(),
            email: "asha@example.com".to_string(),
            phone: "555".to_string(),
            country: "IN".to_string(),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["accountID"], json!(1000));
        assert_eq!(v["currenciesPolicyID"], json!(72));
        assert_eq!(v["genericPolicyID"], json!(41));
        assert_eq!(v["parentId"], json!(372));
        assert_eq!(v["firstName"], json!("Asha"));
    }

    #[test]
    fn test_money_transaction_sends_numeric_amount() {
        let body = MoneyTransactionBody {
            receiver_account_id: 7,
            second_password: "s3".to_string(),
            sender_user_id: 8,
            transfer_type: TRANSFER_TYPE,
            trx_amount: dec!(250.5),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            json!({
                "receiverAccountId": 7,
                "secondPassword": "s3",
                "senderUserId": 8,
                "transferType": 1,
                "trxAmount": 250.5
            })
        );
    }

    #[test]
    fn test_financials_keep_unknown_fields() {
        let f: UserFinancials = serde_json::from_value(json!({
            "balance": 1200.5,
            "equity": "1180.25",
            "margin": 20,
            "credit": 0
        }))
        .unwrap();
        assert_eq!(f.balance, Some(dec!(1200.5)));
        assert_eq!(f.equity, Some(dec!(1180.25)));
        assert_eq!(f.margin, Some(dec!(20)));
        assert_eq!(f.free_margin, None);
        assert_eq!(f.extra.get("credit"), Some(&json!(0)));
    }

    #[test]
    fn test_data_id() {
        assert_eq!(data_id(&json!({"id": 42})), Some(42));
        assert_eq!(data_id(&json!({"id": "43"})), Some(43));
        assert_eq!(data_id(&json!({"other": 1})), None);
    }

    #[test]
    fn test_encode_body_reports_failure() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "non-string key");
        let err = encode_body(&bad).unwrap_err();
        assert!(err.starts_with("Cannot encode request body"));

        let ok = encode_body(&LoginRequest {
            company_name: "acme".to_string(),
            user_name: "svc".to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
        assert_eq!(ok["companyName"], json!("acme"));
    }
}
