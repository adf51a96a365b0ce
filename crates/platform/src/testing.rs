//! In-process doubles for the vendor API and the account directory.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tradeportal_core::{
    AccountDirectory, Currency, DirectoryError, StaticSettings, SystemSettings,
};

use crate::client::PlatformClient;
use crate::config::PlatformConfig;
use crate::protocol::{HttpMethod, LOGIN_PATH};
use crate::token_store::MemoryTokenStore;
use crate::transport::{Transport, TransportError, VendorRequest, VendorResponse};

pub fn test_config() -> PlatformConfig {
    PlatformConfig {
        base_url: "https://vendor.test".to_string(),
        company_name: "acme".to_string(),
        user_name: "svc".to_string(),
        password: "secret".to_string(),
        token_cache_path: "unused.json".into(),
        token_validity_hours: 24,
        request_timeout_secs: 5,
    }
}

/// Records every request and answers from a fixed route table.
pub struct MockTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VendorResponse>>,
    sent: Mutex<Vec<VendorRequest>>,
}

impl MockTransport {
    /// A transport whose login endpoint issues `tok-1`.
    pub fn new() -> Self {
        let transport = Self {
            routes: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        };
        transport.on(
            HttpMethod::Post,
            LOGIN_PATH,
            200,
            json!({"success": true, "data": {"token": "tok-1", "userId": 1}}),
        )
    }

    pub fn on(self, method: HttpMethod, path: &str, status: u16, body: Value) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), VendorResponse { status, body });
        self
    }

    pub fn sent(&self) -> Vec<VendorRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests other than login.
    pub fn calls(&self) -> Vec<VendorRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.path != LOGIN_PATH)
            .collect()
    }

    pub fn login_calls(&self) -> usize {
        self.sent().iter().filter(|r| r.path == LOGIN_PATH).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: VendorRequest) -> Result<VendorResponse, TransportError> {
        if request.path == LOGIN_PATH {
            // Widen the window for callers racing on refresh.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let route = (request.method, request.path.clone());
        self.sent.lock().unwrap().push(request);
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&route)
            .cloned()
            .unwrap_or(VendorResponse {
                status: 404,
                body: json!({"success": false, "message": "No such endpoint"}),
            }))
    }
}

/// Transport that can never reach the vendor.
pub struct DownTransport;

#[async_trait]
impl Transport for DownTransport {
    async fn send(&self, _request: VendorRequest) -> Result<VendorResponse, TransportError> {
        Err(TransportError::Request("connection refused".to_string()))
    }
}

/// In-memory account directory keyed by currency.
#[derive(Default)]
pub struct MemoryDirectory {
    issued: Mutex<HashMap<Currency, Vec<i64>>>,
    confirmed: Mutex<HashMap<i64, Option<i64>>>,
    /// Every lookup and reservation fails as if the database were down.
    pub fail: bool,
    /// Reservations fail with `UnknownUser`.
    pub reject_users: bool,
}

impl MemoryDirectory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_users: true,
            ..Default::default()
        }
    }

    pub fn record(&self, currency: Currency, account_id: i64) {
        self.issued
            .lock()
            .unwrap()
            .entry(currency)
            .or_default()
            .push(account_id);
    }

    pub fn issued(&self, currency: Currency) -> Vec<i64> {
        self.issued
            .lock()
            .unwrap()
            .get(&currency)
            .cloned()
            .unwrap_or_default()
    }

    /// Vendor user ID recorded for a confirmed account.
    pub fn confirmed(&self, account_id: i64) -> Option<Option<i64>> {
        self.confirmed.lock().unwrap().get(&account_id).copied()
    }
}

#[async_trait]
impl AccountDirectory for MemoryDirectory {
    async fn last_account_id(&self, currency: Currency) -> Result<Option<i64>, DirectoryError> {
        if self.fail {
            return Err(DirectoryError::Unavailable("database offline".to_string()));
        }
        Ok(self.issued(currency).into_iter().max())
    }

    async fn reserve_account(
        &self,
        user_id: i64,
        currency: Currency,
        account_id: i64,
    ) -> Result<(), DirectoryError> {
        if self.fail {
            return Err(DirectoryError::Unavailable("database offline".to_string()));
        }
        if self.reject_users {
            return Err(DirectoryError::UnknownUser(user_id));
        }
        if self.issued(currency).contains(&account_id) {
            return Err(DirectoryError::AccountTaken {
                currency,
                account_id,
            });
        }
        self.record(currency, account_id);
        Ok(())
    }

    async fn confirm_account(
        &self,
        _user_id: i64,
        account_id: i64,
        vendor_user_id: Option<i64>,
    ) -> Result<(), DirectoryError> {
        self.confirmed
            .lock()
            .unwrap()
            .insert(account_id, vendor_user_id);
        Ok(())
    }

    async fn release_account(&self, _user_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        for ids in self.issued.lock().unwrap().values_mut() {
            ids.retain(|id| *id != account_id);
        }
        Ok(())
    }
}

/// Settings with bank, branch, second password and both currencies filled in.
pub fn full_settings() -> SystemSettings {
    let mut settings = SystemSettings {
        bank_id: Some(11),
        branch_id: Some(22),
        second_password: Some("pin".to_string()),
        ..Default::default()
    };
    let usd = settings.currency_mut(Currency::Usd);
    usd.series = Some("1000".to_string());
    usd.main_account_id = Some(500);
    usd.main_user_id = Some(50);
    let inr = settings.currency_mut(Currency::Inr);
    inr.series = Some("2000".to_string());
    inr.main_account_id = Some(600);
    inr.main_user_id = Some(60);
    settings
}

pub fn client_with(
    transport: Arc<dyn Transport>,
    settings: SystemSettings,
    directory: Arc<MemoryDirectory>,
) -> PlatformClient {
    PlatformClient::with_parts(
        &test_config(),
        transport,
        Arc::new(MemoryTokenStore::new()),
        Arc::new(StaticSettings(settings)),
        directory,
    )
}
