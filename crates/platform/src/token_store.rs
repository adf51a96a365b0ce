use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// An issued bearer token and the instant it stops being trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// On-disk form of the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    pub token: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl CachedToken {
    pub fn from_session(session: &SessionToken, now: DateTime<Utc>) -> Self {
        Self {
            token: session.token.clone(),
            expiry_time: session.expires_at,
            last_updated: now,
        }
    }

    pub fn into_session(self) -> SessionToken {
        SessionToken {
            token: self.token,
            expires_at: self.expiry_time,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Corrupt token cache: {0}")]
    Corrupt(String),
}

/// Durable storage for the shared session token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<CachedToken>, TokenStoreError>;

    /// Replace the stored token as a whole.
    async fn save(&self, token: &CachedToken) -> Result<(), TokenStoreError>;
}

/// JSON file token cache.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<CachedToken>, TokenStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| TokenStoreError::Corrupt(e.to_string()))
    }

    async fn save(&self, token: &CachedToken) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;

        // Write then rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Process-local token cache.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<CachedToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CachedToken) -> Self {
        Self {
            inner: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<CachedToken>, TokenStoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, token: &CachedToken) -> Result<(), TokenStoreError> {
        *self.inner.write().await = Some(token.clone());
        Ok(())
    }
}
