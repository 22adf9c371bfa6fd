use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::catalog::{Dataset, DatasetMetadata, Integration, Permissions};
use crate::dataset_schema::{FieldDescriptor, Schema};
use crate::error::RegistryError;
use crate::schema::datasets;

#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = datasets)]
#[diesel(primary_key(id))]
#[diesel(treat_none_as_null = true)]
pub struct DatasetRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub source_application: String,
    pub organization_id: String,
    pub created_by: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub schema_fields: serde_json::Value,
    pub schema_version: String,
    pub primary_key: Option<String>,
    pub record_count: i64,
    pub tags: Vec<String>,
    pub category: String,
    pub is_public: bool,
    pub last_record_at: Option<DateTime<Utc>>,
    pub owners: Vec<String>,
    pub editors: Vec<String>,
    pub viewers: Vec<String>,
    pub public_read: bool,
    pub source_form_id: Option<String>,
    pub api_key: Option<String>,
    pub webhook_url: Option<String>,
    pub auto_sync: bool,
    pub display_settings: serde_json::Value,
}

impl DatasetRow {
    /// Converts a stored row into a dataset. Timestamps missing from the row
    /// are realized as the current time so the returned shape stays total.
    pub fn into_dataset(self) -> Result<Dataset, RegistryError> {
        let fields: Vec<FieldDescriptor> =
            serde_json::from_value(self.schema_fields).map_err(|e| {
                RegistryError::InternalError {
                    message: format!("Stored schema for dataset {} is corrupt: {}", self.id, e),
                }
            })?;

        let record_count = u64::try_from(self.record_count).map_err(|_| {
            RegistryError::InternalError {
                message: format!(
                    "Stored record count for dataset {} is negative: {}",
                    self.id, self.record_count
                ),
            }
        })?;

        let display_settings = match self.display_settings {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(RegistryError::InternalError {
                    message: format!(
                        "Stored display settings for dataset {} are not an object: {}",
                        self.id, other
                    ),
                })
            }
        };

        Ok(Dataset {
            id: self.id,
            name: self.name,
            description: self.description,
            source_application: self.source_application,
            organization_id: self.organization_id,
            created_by: self.created_by,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            updated_at: self.updated_at.unwrap_or_else(Utc::now),
            schema: Schema {
                fields,
                version: self.schema_version,
                primary_key: self.primary_key,
            },
            metadata: DatasetMetadata {
                record_count,
                tags: self.tags,
                category: self.category,
                is_public: self.is_public,
                last_record_at: self.last_record_at,
            },
            permissions: Permissions {
                owners: self.owners,
                editors: self.editors,
                viewers: self.viewers,
                public_read: self.public_read,
            },
            integration: Integration {
                source_form_id: self.source_form_id,
                api_key: self.api_key,
                webhook_url: self.webhook_url,
                auto_sync: self.auto_sync,
            },
            display_settings,
        })
    }
}

impl TryFrom<&Dataset> for DatasetRow {
    type Error = RegistryError;

    fn try_from(dataset: &Dataset) -> Result<Self, Self::Error> {
        let record_count = i64::try_from(dataset.metadata.record_count).map_err(|_| {
            RegistryError::validation(format!(
                "recordCount {} is out of range",
                dataset.metadata.record_count
            ))
        })?;

        Ok(DatasetRow {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            source_application: dataset.source_application.clone(),
            organization_id: dataset.organization_id.clone(),
            created_by: dataset.created_by.clone(),
            created_at: Some(dataset.created_at),
            updated_at: Some(dataset.updated_at),
            schema_fields: serde_json::to_value(&dataset.schema.fields)
                .map_err(RegistryError::encoding)?,
            schema_version: dataset.schema.version.clone(),
            primary_key: dataset.schema.primary_key.clone(),
            record_count,
            tags: dataset.metadata.tags.clone(),
            category: dataset.metadata.category.clone(),
            is_public: dataset.metadata.is_public,
            last_record_at: dataset.metadata.last_record_at,
            owners: dataset.permissions.owners.clone(),
            editors: dataset.permissions.editors.clone(),
            viewers: dataset.permissions.viewers.clone(),
            public_read: dataset.permissions.public_read,
            source_form_id: dataset.integration.source_form_id.clone(),
            api_key: dataset.integration.api_key.clone(),
            webhook_url: dataset.integration.webhook_url.clone(),
            auto_sync: dataset.integration.auto_sync,
            display_settings: serde_json::Value::Object(dataset.display_settings.clone()),
        })
    }
}
