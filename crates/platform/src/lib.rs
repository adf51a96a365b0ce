//! Trading-platform integration.
//!
//! Talks to the vendor's REST API: a shared bearer-token session, account
//! allocation and provisioning, deposit/withdrawal/transfer submission,
//! request resolution and financial snapshots.

pub mod allocator;
pub mod client;
pub mod config;
pub mod error;
pub mod financials;
pub mod issuer;
pub mod outcome;
pub mod protocol;
pub mod provisioning;
pub mod resolver;
pub mod routing;
pub mod session;
pub mod token_store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use allocator::{AccountAllocation, AccountAllocator, AllocationSource};
pub use client::PlatformClient;
pub use config::PlatformConfig;
pub use error::PlatformError;
pub use issuer::SubmittedRequest;
pub use outcome::VendorOutcome;
pub use protocol::UserFinancials;
pub use provisioning::{AccountIdentity, ProvisionedAccount};
pub use routing::{route_transfer, RouteError};
pub use session::SessionManager;
pub use token_store::{CachedToken, FileTokenStore, MemoryTokenStore, SessionToken, TokenStore};
pub use transport::{HttpTransport, Transport, VendorRequest, VendorResponse};
