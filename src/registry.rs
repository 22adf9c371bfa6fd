use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use tracing::{info, warn};

use crate::catalog::{Dataset, DatasetMetadata, Integration, Permissions};
use crate::dataset_schema::validate_schema;
use crate::domain::{CreateDatasetRequest, DatasetFilter, DatasetPatch};
use crate::error::RegistryError;
use crate::permissions::{authorize, can_read, Access, Actor};
use crate::storage::{DatasetStore, RecordCleaner};

/// CRUD surface over dataset descriptors.
///
/// `update` merges against a fresh read and then writes the whole document,
/// so two concurrent merges of `metadata` or `integration` on one dataset
/// can lose one of the deltas. Nothing guards against that today.
pub struct DatasetRegistry {
    store: Arc<dyn DatasetStore>,
    record_cleaner: Option<Arc<dyn RecordCleaner>>,
}

impl DatasetRegistry {
    pub fn new(store: Arc<dyn DatasetStore>) -> Self {
        Self {
            store,
            record_cleaner: None,
        }
    }

    pub fn with_record_cleaner(mut self, cleaner: Arc<dyn RecordCleaner>) -> Self {
        self.record_cleaner = Some(cleaner);
        self
    }

    pub async fn create(&self, request: CreateDatasetRequest) -> Result<Dataset, RegistryError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(RegistryError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let schema = validate_schema(request.schema.unwrap_or_default())?;

        // Presence was checked above.
        let name = request.name.unwrap_or_default();
        let created_by = request.created_by.unwrap_or_default();

        let mut metadata = DatasetMetadata::default();
        if let Some(overrides) = request.metadata {
            overrides.apply_to(&mut metadata);
        }
        metadata.record_count = 0;
        metadata.last_record_at = None;

        let mut integration = Integration::default();
        if let Some(overrides) = request.integration {
            overrides.apply_to(&mut integration);
        }

        let permissions = request.permissions.unwrap_or_default().resolve(&created_by);

        let now = current_timestamp();
        let draft = Dataset {
            id: String::new(),
            name,
            description: request.description.unwrap_or_default(),
            source_application: request.source_application.unwrap_or_default(),
            organization_id: request.organization_id.unwrap_or_default(),
            created_by,
            created_at: now,
            updated_at: now,
            schema,
            metadata,
            permissions,
            integration,
            display_settings: request.display_settings.unwrap_or_default(),
        };

        let dataset = self.store.insert(draft).await?;
        info!(
            "Created dataset {} '{}' for {} in {}",
            dataset.id, dataset.name, dataset.source_application, dataset.organization_id
        );
        Ok(dataset)
    }

    pub async fn get(&self, actor: &Actor, dataset_id: &str) -> Result<Dataset, RegistryError> {
        let dataset = self.load(dataset_id).await?;
        authorize(&dataset, actor, Access::Read)?;
        Ok(dataset)
    }

    /// Lists datasets matching `filter` that `actor` may read, most recently
    /// updated first.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: &DatasetFilter,
    ) -> Result<Vec<Dataset>, RegistryError> {
        let datasets = self.store.query(filter).await?;
        let total = datasets.len();

        let visible: Vec<Dataset> = datasets
            .into_iter()
            .filter(|d| can_read(d, actor))
            .collect();

        if visible.len() < total {
            info!(
                "Hid {} of {} datasets from {}",
                total - visible.len(),
                total,
                actor
            );
        }
        Ok(visible)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        dataset_id: &str,
        patch: DatasetPatch,
    ) -> Result<Dataset, RegistryError> {
        let mut dataset = self.load(dataset_id).await?;
        authorize(&dataset, actor, Access::Write)?;
        if patch.touches_permissions() {
            authorize(&dataset, actor, Access::ManagePermissions)?;
        }

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(RegistryError::validation("name must not be empty"));
            }
            dataset.name = name;
        }
        if let Some(description) = patch.description {
            dataset.description = description.unwrap_or_default();
        }
        if let Some(schema) = patch.schema {
            dataset.schema = validate_schema(schema)?;
        }
        if let Some(delta) = patch.metadata {
            delta.apply_to(&mut dataset.metadata);
        }
        if let Some(permissions) = patch.permissions {
            dataset.permissions = checked_permissions(permissions)?;
        }
        if let Some(integration) = patch.integration {
            integration.apply_to(&mut dataset.integration);
        }
        if let Some(display_settings) = patch.display_settings {
            dataset.display_settings = display_settings;
        }
        dataset.updated_at = next_timestamp(dataset.updated_at);

        if !self.store.replace(&dataset).await? {
            warn!("Dataset {} disappeared during update", dataset_id);
            return Err(RegistryError::not_found(dataset_id));
        }

        info!("Updated dataset {} by {}", dataset_id, actor);
        self.load(dataset_id).await
    }

    /// Removes the dataset descriptor only. Records that belong to it are
    /// left in place; see [`DatasetRegistry::delete_with_records`].
    pub async fn delete(&self, actor: &Actor, dataset_id: &str) -> Result<(), RegistryError> {
        let dataset = self.load(dataset_id).await?;
        authorize(&dataset, actor, Access::Delete)?;

        if !self.store.remove(dataset_id).await? {
            return Err(RegistryError::not_found(dataset_id));
        }

        info!("Deleted dataset {} by {}", dataset_id, actor);
        Ok(())
    }

    /// Purges the dataset's records through the configured [`RecordCleaner`]
    /// and then removes the dataset. Returns the number of records purged.
    pub async fn delete_with_records(
        &self,
        actor: &Actor,
        dataset_id: &str,
    ) -> Result<u64, RegistryError> {
        let cleaner = self
            .record_cleaner
            .as_ref()
            .ok_or_else(|| RegistryError::ConfigError {
                message: "No record cleaner configured for cascading delete".to_string(),
            })?;

        let dataset = self.load(dataset_id).await?;
        authorize(&dataset, actor, Access::Delete)?;

        let purged = cleaner.purge_records(dataset_id).await?;
        info!("Purged {} records of dataset {}", purged, dataset_id);

        if !self.store.remove(dataset_id).await? {
            return Err(RegistryError::not_found(dataset_id));
        }

        info!("Deleted dataset {} with its records by {}", dataset_id, actor);
        Ok(purged)
    }

    pub async fn health_check(&self) -> Result<(), RegistryError> {
        self.store.health_check().await
    }

    async fn load(&self, dataset_id: &str) -> Result<Dataset, RegistryError> {
        self.store
            .fetch(dataset_id)
            .await?
            .ok_or_else(|| RegistryError::not_found(dataset_id))
    }
}

fn checked_permissions(permissions: Permissions) -> Result<Permissions, RegistryError> {
    let mut permissions = permissions.normalized();
    permissions.owners.retain(|o| !o.trim().is_empty());
    if permissions.owners.is_empty() {
        return Err(RegistryError::validation(
            "permissions.owners must contain at least one owner",
        ));
    }
    Ok(permissions)
}

/// Timestamps are kept at microsecond precision, the resolution PostgreSQL
/// stores, so a written value reads back unchanged.
fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = current_timestamp();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
