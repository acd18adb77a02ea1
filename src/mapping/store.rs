//! Versioned mapping documents in an object store
//!
//! Mapping documents are published per event family, environment and version
//! under `<event_family>/<environment>/<version>.json`, so readers can pin the
//! schema a table was written with.
//!
//! # Example
//!
//! ```rust,ignore
//! use wide_column_events::mapping::{LocalObjectStore, MappingStore};
//!
//! let store = MappingStore::new(LocalObjectStore::new("/srv/mappings"), "production");
//! store.upload("ecommerce", "v1.0.0", &mapping).await?;
//! let mapping = store.load("ecommerce", "v1.0.0").await?;
//! ```

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use super::Mapping;
use crate::error::MappingError;

/// Default time allowed for one load or upload
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(50);

// =============================================================================
// ObjectStore Trait
// =============================================================================

/// Minimal object storage used to hold mapping documents
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Unique identifier for this store implementation
    fn store_id(&self) -> &str;

    /// Read a whole object
    async fn get(&self, path: &str) -> Result<Bytes, MappingError>;

    /// Create or replace an object
    async fn put(&self, path: &str, data: Bytes) -> Result<(), MappingError>;
}

/// Object store backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, MappingError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MappingError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn store_id(&self) -> &str {
        "local-fs"
    }

    async fn get(&self, path: &str) -> Result<Bytes, MappingError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MappingError::NotFound(path.to_string()))
            },
            Err(e) => Err(MappingError::ObjectStore {
                path: path.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), MappingError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| MappingError::ObjectStore {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

// =============================================================================
// Mapping Store
// =============================================================================

/// Mapping store configuration
#[derive(Debug, Clone)]
pub struct MappingStoreConfig {
    /// Deployment environment segment of the object path
    pub environment: String,
    /// Time allowed for one load or upload
    pub operation_timeout: Duration,
}

impl Default for MappingStoreConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Loads and publishes mapping documents through an [`ObjectStore`]
pub struct MappingStore<S: ObjectStore> {
    store: S,
    config: MappingStoreConfig,
}

impl<S: ObjectStore> MappingStore<S> {
    /// Create a store for one environment with the default timeout
    pub fn new(store: S, environment: impl Into<String>) -> Self {
        Self::with_config(
            store,
            MappingStoreConfig {
                environment: environment.into(),
                ..MappingStoreConfig::default()
            },
        )
    }

    /// Create a store with an explicit configuration
    pub fn with_config(store: S, config: MappingStoreConfig) -> Self {
        Self { store, config }
    }

    /// The underlying object store
    pub fn object_store(&self) -> &S {
        &self.store
    }

    /// Object path of a mapping document
    pub fn object_path(&self, event_family: &str, version: &str) -> String {
        format!("{}/{}/{}.json", event_family, self.config.environment, version)
    }

    /// Load and parse a mapping document
    pub async fn load(&self, event_family: &str, version: &str) -> Result<Mapping, MappingError> {
        let path = self.object_path(event_family, version);
        let data = self.bounded(&path, self.store.get(&path)).await?;
        let mapping = Mapping::from_slice(&data)?;
        debug!(path = %path, rules = mapping.rule_count(), "Loaded mapping");
        Ok(mapping)
    }

    /// Serialize and publish a mapping document
    pub async fn upload(&self, event_family: &str, version: &str, mapping: &Mapping) -> Result<(), MappingError> {
        let path = self.object_path(event_family, version);
        let data = Bytes::from(mapping.to_json()?);
        self.bounded(&path, self.store.put(&path, data)).await?;
        info!(path = %path, store = self.store.store_id(), "Uploaded mapping");
        Ok(())
    }

    async fn bounded<T, F>(&self, path: &str, op: F) -> Result<T, MappingError>
    where
        F: Future<Output = Result<T, MappingError>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(MappingError::Timeout {
                path: path.to_string(),
                seconds: self.config.operation_timeout.as_secs(),
            }),
        }
    }
}
