use serde_json::Value;
use tracing::info;
use tradeportal_core::Decision;

use crate::client::PlatformClient;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::*;

/// Endpoint for a withdrawal decision. Approval and rejection use
/// different paths and verbs on the vendor side.
pub fn withdrawal_endpoint(decision: Decision) -> (HttpMethod, &'static str) {
    match decision {
        Decision::Approve => (HttpMethod::Put, CASH_DELIVERY_ACCEPT_PATH),
        Decision::Reject => (HttpMethod::Post, CASH_DELIVERY_PATH),
    }
}

impl PlatformClient {
    /// Approve or reject a pending deposit request.
    pub async fn resolve_deposit(
        &self,
        request_id: i64,
        decision: Decision,
        comment: &str,
    ) -> Result<VendorOutcome<Value>, PlatformError> {
        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        let Some(bank_id) = settings.bank_id else {
            return Ok(VendorOutcome::failure("Bank ID is not configured"));
        };

        let body = match encode_body(&HandleDepositBody {
            bank_id,
            comment: comment.to_string(),
            request_id,
            status: decision.vendor_status(),
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };

        info!(request_id, decision = ?decision, "Resolving deposit request");
        self.call(HttpMethod::Post, DEPOSIT_HANDLE_PATH, Some(body))
            .await
    }

    /// Approve or reject a pending withdrawal (cash delivery) request.
    pub async fn resolve_withdrawal(
        &self,
        request_id: i64,
        decision: Decision,
        comment: &str,
    ) -> Result<VendorOutcome<Value>, PlatformError> {
        let settings = match self.load_settings().await {
            Ok(s) => s,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        let Some(branch_id) = settings.branch_id else {
            return Ok(VendorOutcome::failure("Branch ID is not configured"));
        };

        let body = match encode_body(&CashDeliveryBody {
            branch_id,
            comment: comment.to_string(),
            request_id,
            status: decision.vendor_status(),
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };

        let (method, path) = withdrawal_endpoint(decision);
        info!(request_id, decision = ?decision, "Resolving withdrawal request");
        self.call(method, path, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_with, full_settings, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn ok_transport() -> MockTransport {
        MockTransport::new()
            .on(HttpMethod::Post, DEPOSIT_HANDLE_PATH, 200, json!({"success": true}))
            .on(HttpMethod::Put, CASH_DELIVERY_ACCEPT_PATH, 200, json!({"success": true}))
            .on(HttpMethod::Post, CASH_DELIVERY_PATH, 200, json!({"success": true}))
    }

    #[tokio::test]
    async fn test_deposit_decision_status_codes() {
        let transport = Arc::new(ok_transport());
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        client.resolve_deposit(31, Decision::Reject, "bad MTR").await.unwrap();
        client.resolve_deposit(32, Decision::Approve, "ok").await.unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[0].body,
            Some(json!({"bankId": 11, "comment": "bad MTR", "requestId": 31, "status": 3}))
        );
        assert_eq!(calls[1].body.as_ref().unwrap()["status"], json!(2));
        assert!(calls.iter().all(|c| c.path == DEPOSIT_HANDLE_PATH));
    }

    #[tokio::test]
    async fn test_withdrawal_approve_and_reject_diverge() {
        let transport = Arc::new(ok_transport());
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        let approved = client.resolve_withdrawal(7, Decision::Approve, "").await.unwrap();
        let rejected = client.resolve_withdrawal(8, Decision::Reject, "").await.unwrap();
        assert!(approved.success && rejected.success);

        let calls = transport.calls();
        assert_eq!(calls[0].method, HttpMethod::Put);
        assert_eq!(calls[0].path, CASH_DELIVERY_ACCEPT_PATH);
        assert_eq!(calls[1].method, HttpMethod::Post);
        assert_eq!(calls[1].path, CASH_DELIVERY_PATH);
        assert_eq!(
            calls[1].body,
            Some(json!({"branchId": 22, "comment": "", "requestId": 8, "status": 3}))
        );
    }

    #[tokio::test]
    async fn test_vendor_error_status_surfaces_message() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Post,
            DEPOSIT_HANDLE_PATH,
            400,
            json!({"success": false, "message": "Request already handled"}),
        ));
        let client = client_with(transport, full_settings(), Arc::default());

        let outcome = client.resolve_deposit(1, Decision::Approve, "").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Request already handled");
    }
}
