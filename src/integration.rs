//! External write access and push notification settings of a dataset.
//!
//! Kept apart from schema and permission changes because it is usually an
//! automation, not the dataset's creator, that wires up a webhook or key.

use std::sync::Arc;

use tracing::info;

use crate::catalog::{Dataset, Integration};
use crate::domain::{DatasetPatch, IntegrationPatch};
use crate::error::RegistryError;
use crate::permissions::Actor;
use crate::registry::DatasetRegistry;

pub struct IntegrationGateway {
    registry: Arc<DatasetRegistry>,
}

impl IntegrationGateway {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    /// Shallow-merges `patch` into the dataset's integration block. URLs and
    /// keys are stored as given; a bad webhook only shows up on delivery.
    pub async fn configure(
        &self,
        actor: &Actor,
        dataset_id: &str,
        patch: IntegrationPatch,
    ) -> Result<Dataset, RegistryError> {
        let dataset = self
            .registry
            .update(actor, dataset_id, DatasetPatch::integration(patch))
            .await?;

        info!(
            "Integration of dataset {} now webhook={} autoSync={}",
            dataset_id,
            dataset.integration.webhook_url.is_some(),
            dataset.integration.auto_sync
        );
        Ok(dataset)
    }

    pub async fn integration(
        &self,
        actor: &Actor,
        dataset_id: &str,
    ) -> Result<Integration, RegistryError> {
        Ok(self.registry.get(actor, dataset_id).await?.integration)
    }

    pub fn is_auto_sync_enabled(dataset: &Dataset) -> bool {
        dataset.integration.auto_sync
    }
}
