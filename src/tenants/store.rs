//! Keyed object store for tenant configs. The trait mirrors the external
//! store's surface (`get`, `put`, `list`); the filesystem implementation
//! keeps one pretty-printed JSON document per tenant.

use async_trait::async_trait;
use std::path::PathBuf;

use super::model::TenantConfig;

#[derive(Debug, thiserror::Error)]
pub enum TenantStoreError {
    #[error("tenant store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tenant config is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<TenantConfig>, TenantStoreError>;
    async fn put(&self, config: &TenantConfig) -> Result<(), TenantStoreError>;
    async fn list(&self) -> Result<Vec<TenantConfig>, TenantStoreError>;
}

pub struct FsTenantStore {
    dir: PathBuf,
}

impl FsTenantStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl TenantStore for FsTenantStore {
    async fn get(&self, id: &str) -> Result<Option<TenantConfig>, TenantStoreError> {
        // Keys are validated subdomains; anything with a path separator is
        // not a key we ever wrote.
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return Ok(None);
        }
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, config: &TenantConfig) -> Result<(), TenantStoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(config)?;
        tokio::fs::write(self.path_for(&config.id), json).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TenantConfig>, TenantStoreError> {
        let mut configs = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(configs),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<TenantConfig>(&bytes) {
                Ok(config) => configs.push(config),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping malformed tenant config");
                }
            }
        }
        Ok(configs)
    }
}
