use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tradeportal_core::{Currency, TransferDirection};

use crate::client::PlatformClient;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::*;
use crate::routing::route_transfer;

/// A request accepted by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedRequest {
    /// Vendor-assigned request ID, when the response carries one.
    pub request_id: Option<i64>,
    /// Branch the request was raised against, for cash requests.
    pub branch_id: Option<i64>,
    pub raw: serde_json::Value,
}

impl SubmittedRequest {
    fn from_data(raw: serde_json::Value) -> Self {
        Self {
            request_id: data_id(&raw),
            branch_id: None,
            raw,
        }
    }
}

impl PlatformClient {
    /// Raise a deposit request against a vendor bank.
    pub async fn submit_deposit(
        &self,
        amount: Decimal,
        bank_id: i64,
        comment: &str,
        vendor_user_id: i64,
    ) -> Result<VendorOutcome<SubmittedRequest>, PlatformError> {
        let body = match encode_body(&DepositRequestBody {
            amount,
            bank_id,
            comment: comment.to_string(),
            user_id: vendor_user_id,
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };

        info!(vendor_user_id, %amount, bank_id, "Submitting deposit request");
        let outcome = self
            .call(HttpMethod::Post, DEPOSIT_REQUEST_PATH, Some(body))
            .await?;
        Ok(outcome.map(SubmittedRequest::from_data))
    }

    /// Raise a cash (withdrawal) request. Branch and second password come
    /// from the system settings.
    pub async fn submit_withdrawal(
        &self,
        amount: Decimal,
        comment: &str,
        vendor_user_id: i64,
    ) -> Result<VendorOutcome<SubmittedRequest>, PlatformError> {
        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        let Some(branch_id) = settings.branch_id else {
            return Ok(VendorOutcome::failure("Branch ID is not configured"));
        };
        let Some(second_password) = settings.second_password else {
            return Ok(VendorOutcome::failure("Second password is not configured"));
        };

        let body = match encode_body(&CashRequestBody {
            amount,
            branch_id,
            comment: comment.to_string(),
            user_id: vendor_user_id,
            second_password,
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };

        info!(vendor_user_id, %amount, branch_id, "Submitting cash request");
        let outcome = self
            .call(HttpMethod::Post, CASH_REQUEST_PATH, Some(body))
            .await?;
        Ok(outcome.map(|raw| SubmittedRequest {
            branch_id: Some(branch_id),
            ..SubmittedRequest::from_data(raw)
        }))
    }

    /// Move money between two vendor accounts.
    pub async fn submit_transfer(
        &self,
        sender_user_id: i64,
        receiver_account_id: i64,
        amount: Decimal,
        direction: TransferDirection,
    ) -> Result<VendorOutcome<SubmittedRequest>, PlatformError> {
        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        let Some(second_password) = settings.second_password else {
            return Ok(VendorOutcome::failure("Second password is not configured"));
        };

        let body = match encode_body(&MoneyTransactionBody {
            receiver_account_id,
            second_password,
            sender_user_id,
            transfer_type: TRANSFER_TYPE,
            trx_amount: amount,
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };

        info!(
            sender_user_id,
            receiver_account_id,
            %amount,
            direction = ?direction,
            "Submitting money transfer"
        );
        let outcome = self
            .call(HttpMethod::Put, MONEY_TRANSACTION_PATH, Some(body))
            .await?;
        Ok(outcome.map(SubmittedRequest::from_data))
    }

    /// Transfer between a customer and the house account of `currency`.
    pub async fn transfer_for_user(
        &self,
        currency: Currency,
        user_vendor_id: i64,
        user_account_id: i64,
        amount: Decimal,
        direction: TransferDirection,
    ) -> Result<VendorOutcome<SubmittedRequest>, PlatformError> {
        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        let instruction = match route_transfer(
            direction,
            currency,
            user_vendor_id,
            user_account_id,
            amount,
            &settings,
        ) {
            Ok(i) => i,
            Err(e) => return Ok(VendorOutcome::failure(e.to_string())),
        };

        self.submit_transfer(
            instruction.sender_user_id,
            instruction.receiver_account_id,
            instruction.amount,
            instruction.direction,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_with, full_settings, DownTransport, MemoryDirectory, MockTransport};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;
    use tradeportal_core::SystemSettings;

    #[tokio::test]
    async fn test_deposit_payload_and_bearer() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Post,
            DEPOSIT_REQUEST_PATH,
            200,
            json!({"success": true, "message": "Created", "data": {"id": 881}}),
        ));
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        let outcome = client
            .submit_deposit(dec!(1500), 11, "MTR 4471", 9001)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message, "Created");
        assert_eq!(outcome.data.unwrap().request_id, Some(881));

        let call = &transport.calls()[0];
        assert_eq!(call.bearer.as_deref(), Some("tok-1"));
        assert_eq!(
            call.body,
            Some(json!({"amount": 1500.0, "bankId": 11, "comment": "MTR 4471", "userId": 9001}))
        );
    }

    #[tokio::test]
    async fn test_vendor_rejection_is_reported_not_thrown() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Post,
            CASH_REQUEST_PATH,
            200,
            json!({"success": false, "message": "Not enough free margin"}),
        ));
        let client = client_with(transport, full_settings(), Arc::default());

        let outcome = client.submit_withdrawal(dec!(10), "", 9001).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Not enough free margin");
    }

    #[tokio::test]
    async fn test_withdrawal_uses_settings() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Post,
            CASH_REQUEST_PATH,
            200,
            json!({"success": true}),
        ));
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        let outcome = client.submit_withdrawal(dec!(75.25), "payout", 9001).await.unwrap();
        assert_eq!(outcome.data.unwrap().branch_id, Some(22));
        assert_eq!(
            transport.calls()[0].body,
            Some(json!({
                "amount": 75.25,
                "branchId": 22,
                "comment": "payout",
                "userId": 9001,
                "secondPassword": "pin"
            }))
        );
    }

    #[tokio::test]
    async fn test_withdrawal_without_branch_makes_no_call() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(transport.clone(), SystemSettings::default(), Arc::default());

        let outcome = client.submit_withdrawal(dec!(1), "", 1).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("Branch ID"));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_for_user_routes_through_main_account() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Put,
            MONEY_TRANSACTION_PATH,
            200,
            json!({"success": true, "data": null}),
        ));
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        let outcome = client
            .transfer_for_user(Currency::Usd, 9001, 1001, dec!(40), TransferDirection::Deposit)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap().request_id, None);

        let call = &transport.calls()[0];
        assert_eq!(call.method, HttpMethod::Put);
        assert_eq!(
            call.body,
            Some(json!({
                "receiverAccountId": 1001,
                "secondPassword": "pin",
                "senderUserId": 50,
                "transferType": 1,
                "trxAmount": 40.0
            }))
        );
    }

    #[tokio::test]
    async fn test_unreachable_vendor_is_an_auth_error() {
        let client = client_with(Arc::new(DownTransport), full_settings(), Arc::<MemoryDirectory>::default());
        let err = client.submit_deposit(dec!(1), 1, "", 1).await.unwrap_err();
        assert!(matches!(err, PlatformError::Authentication(_)));
    }
}
