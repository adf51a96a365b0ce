use tradeportal_core::DirectoryError;

/// Errors that abort a platform operation.
///
/// Vendor-side failures are not errors; they come back as a failed
/// [`VendorOutcome`](crate::VendorOutcome).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// The account could not be reserved or recorded locally.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
