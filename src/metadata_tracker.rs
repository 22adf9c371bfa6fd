use std::sync::Arc;

use tracing::debug;

use crate::catalog::Dataset;
use crate::domain::{DatasetPatch, MetadataPatch};
use crate::error::RegistryError;
use crate::permissions::Actor;
use crate::registry::DatasetRegistry;

/// Merge point for the denormalized counters an ingestion pipeline maintains.
/// Deltas are trusted as given; nothing is recounted here.
pub struct MetadataTracker {
    registry: Arc<DatasetRegistry>,
}

impl MetadataTracker {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    /// `recordCount` in `delta` is the new absolute value, not an increment.
    pub async fn apply_metadata_delta(
        &self,
        actor: &Actor,
        dataset_id: &str,
        delta: MetadataPatch,
    ) -> Result<Dataset, RegistryError> {
        debug!("Applying metadata delta {:?} to dataset {}", delta, dataset_id);
        self.registry
            .update(actor, dataset_id, DatasetPatch::metadata(delta))
            .await
    }
}
