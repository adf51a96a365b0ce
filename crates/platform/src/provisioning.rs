use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tradeportal_core::Currency;

use crate::allocator::AccountAllocation;
use crate::client::PlatformClient;
use crate::error::PlatformError;
use crate::outcome::VendorOutcome;
use crate::protocol::*;

/// Identity of the portal user a vendor account is opened for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionedAccount {
    pub allocation: AccountAllocation,
    pub vendor_user_id: Option<i64>,
}

impl PlatformClient {
    /// Reserve an account ID and open the vendor account for a new user.
    ///
    /// The ID is reserved in the directory before the vendor is called and
    /// released again if the vendor does not open the account.
    pub async fn provision_account(
        &self,
        currency: Currency,
        internal_user_id: i64,
        identity: &AccountIdentity,
    ) -> Result<VendorOutcome<ProvisionedAccount>, PlatformError> {
        let allocation = self.allocator().reserve(currency, internal_user_id).await?;

        let outcome = match self.create_vendor_user(currency, allocation, identity).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.release_reservation(internal_user_id, allocation).await;
                return Err(e);
            }
        };

        if !outcome.success {
            warn!(
                currency = %currency,
                account_id = allocation.account_id,
                message = %outcome.message,
                "Vendor account creation failed"
            );
            self.release_reservation(internal_user_id, allocation).await;
            return Ok(VendorOutcome::failure(outcome.message));
        }

        let vendor_user_id = outcome.data.as_ref().and_then(data_id);
        info!(
            currency = %currency,
            account_id = allocation.account_id,
            internal_user_id,
            vendor_user_id = ?vendor_user_id,
            "Vendor account created"
        );
        if let Err(e) = self
            .allocator()
            .directory()
            .confirm_account(internal_user_id, allocation.account_id, vendor_user_id)
            .await
        {
            // The ID stays reserved, so it cannot be issued again.
            error!(
                account_id = allocation.account_id,
                internal_user_id,
                vendor_user_id = ?vendor_user_id,
                error = %e,
                "Vendor account created but vendor user ID not recorded"
            );
        }

        Ok(outcome.map(|_| ProvisionedAccount {
            allocation,
            vendor_user_id,
        }))
    }

    async fn create_vendor_user(
        &self,
        currency: Currency,
        allocation: AccountAllocation,
        identity: &AccountIdentity,
    ) -> Result<VendorOutcome<serde_json::Value>, PlatformError> {
        let body = match encode_body(&CreateUserRequest {
            account_id: allocation.account_id,
            currencies_policy_id: currency.policy_id(),
            generic_policy_id: GENERIC_POLICY_ID,
            parent_id: PARENT_ID,
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            username: identity.username.clone(),
            password: identity.password.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            country: identity.country.clone(),
        }) {
            Ok(body) => body,
            Err(message) => return Ok(VendorOutcome::failure(message)),
        };
        self.call(HttpMethod::Post, CREATE_USER_PATH, Some(body))
            .await
    }

    async fn release_reservation(&self, internal_user_id: i64, allocation: AccountAllocation) {
        if let Err(e) = self
            .allocator()
            .directory()
            .release_account(internal_user_id, allocation.account_id)
            .await
        {
            warn!(
                account_id = allocation.account_id,
                internal_user_id,
                error = %e,
                "Failed to release account reservation"
            );
        }
    }
}
