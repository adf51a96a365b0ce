use crate::client::PlatformClient;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::{user_financials_path, HttpMethod, UserFinancials};

impl PlatformClient {
    /// Live balance/equity/margin snapshot. Not cached.
    pub async fn get_balance(
        &self,
        vendor_user_id: i64,
    ) -> Result<VendorOutcome<UserFinancials>, PlatformError> {
        let outcome = self
            .call(HttpMethod::Get, &user_financials_path(vendor_user_id), None)
            .await?;
        if !outcome.success {
            return Ok(VendorOutcome::failure(outcome.message));
        }

        let data = outcome.data.unwrap_or_default();
        Ok(match serde_json::from_value::<UserFinancials>(data) {
            Ok(financials) => VendorOutcome::ok(financials, outcome.message),
            Err(e) => VendorOutcome::failure(format!("Unexpected financials payload: {}", e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::HttpMethod;
    use crate::testing::{client_with, full_settings, MockTransport};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_every_call_hits_the_vendor() {
        let transport = Arc::new(MockTransport::new().on(
            HttpMethod::Get,
            "/trading/public/api/v1/userFinancials/9001",
            200,
            json!({"success": true, "data": {"balance": 2500, "equity": 2430.5, "margin": 100, "marginLevel": 2430.5}}),
        ));
        let client = client_with(transport.clone(), full_settings(), Arc::default());

        let first = client.get_balance(9001).await.unwrap();
        let second = client.get_balance(9001).await.unwrap();
        assert!(first.success);
        let f = second.data.unwrap();
        assert_eq!(f.balance, Some(dec!(2500)));
        assert_eq!(f.equity, Some(dec!(2430.5)));
        assert!(f.extra.contains_key("marginLevel"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.method == HttpMethod::Get && c.body.is_none()));
        assert_eq!(transport.login_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let client = client_with(Arc::new(MockTransport::new()), full_settings(), Arc::default());
        let outcome = client.get_balance(1).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "No such endpoint");
    }
}
