use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::Dataset;
use crate::domain::DatasetFilter;
use crate::error::RegistryError;

pub fn new_dataset_id() -> String {
    format!("ds_{}", Uuid::new_v4().simple())
}

/// Document store holding dataset descriptors.
///
/// Implementations provide single-document atomicity only; there are no
/// cross-document transactions.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Persists a new dataset under a freshly assigned identifier. Any `id`
    /// already set on `dataset` is ignored.
    async fn insert(&self, dataset: Dataset) -> Result<Dataset, RegistryError>;

    async fn fetch(&self, dataset_id: &str) -> Result<Option<Dataset>, RegistryError>;

    /// Datasets matching `filter`, most recently updated first.
    async fn query(&self, filter: &DatasetFilter) -> Result<Vec<Dataset>, RegistryError>;

    /// Overwrites the stored document. Returns `false` if it no longer exists.
    async fn replace(&self, dataset: &Dataset) -> Result<bool, RegistryError>;

    /// Returns `false` if there was nothing to remove.
    async fn remove(&self, dataset_id: &str) -> Result<bool, RegistryError>;

    async fn health_check(&self) -> Result<(), RegistryError>;
}

/// Removes or archives the records that belong to a dataset. Which of the
/// two happens is up to the implementation.
#[async_trait]
pub trait RecordCleaner: Send + Sync {
    /// Returns the number of records affected.
    async fn purge_records(&self, dataset_id: &str) -> Result<u64, RegistryError>;
}

#[derive(Clone, Default)]
pub struct MemoryDatasetStore {
    inner: Arc<RwLock<HashMap<String, Dataset>>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatasetStore for MemoryDatasetStore {
    async fn insert(&self, mut dataset: Dataset) -> Result<Dataset, RegistryError> {
        dataset.id = new_dataset_id();
        let mut guard = self.inner.write().await;
        guard.insert(dataset.id.clone(), dataset.clone());
        debug!("Stored dataset {} in memory", dataset.id);
        Ok(dataset)
    }

    async fn fetch(&self, dataset_id: &str) -> Result<Option<Dataset>, RegistryError> {
        let guard = self.inner.read().await;
        Ok(guard.get(dataset_id).cloned())
    }

    async fn query(&self, filter: &DatasetFilter) -> Result<Vec<Dataset>, RegistryError> {
        let guard = self.inner.read().await;
        let mut matches: Vec<Dataset> = guard
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn replace(&self, dataset: &Dataset) -> Result<bool, RegistryError> {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&dataset.id) {
            Some(slot) => {
                *slot = dataset.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, dataset_id: &str) -> Result<bool, RegistryError> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(dataset_id).is_some())
    }

    async fn health_check(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}
