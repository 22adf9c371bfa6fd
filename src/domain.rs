use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{dedup_preserving_order, Dataset, DatasetMetadata, Integration, Permissions};
use crate::dataset_schema::SchemaInput;

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub source_application: Option<String>,
    pub organization_id: Option<String>,
    pub created_by: Option<String>,
    pub schema: Option<SchemaInput>,
    pub metadata: Option<MetadataPatch>,
    pub permissions: Option<PermissionsPatch>,
    pub integration: Option<IntegrationPatch>,
    pub display_settings: Option<Map<String, Value>>,
}

impl CreateDatasetRequest {
    /// Names of required fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("sourceApplication", &self.source_application),
            ("organizationId", &self.organization_id),
            ("createdBy", &self.created_by),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Partial update of a dataset. Absent paths are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPatch {
    pub name: Option<String>,
    /// An explicit `null` clears the description.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub schema: Option<SchemaInput>,
    pub metadata: Option<MetadataPatch>,
    pub permissions: Option<Permissions>,
    pub integration: Option<IntegrationPatch>,
    pub display_settings: Option<Map<String, Value>>,
}

impl DatasetPatch {
    pub fn metadata(delta: MetadataPatch) -> Self {
        Self {
            metadata: Some(delta),
            ..Default::default()
        }
    }

    pub fn integration(patch: IntegrationPatch) -> Self {
        Self {
            integration: Some(patch),
            ..Default::default()
        }
    }

    pub fn touches_permissions(&self) -> bool {
        self.permissions.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub record_count: Option<u64>,
    pub tags: Option<Vec<String>>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub last_record_at: Option<Option<DateTime<Utc>>>,
}

impl MetadataPatch {
    pub fn apply_to(self, metadata: &mut DatasetMetadata) {
        if let Some(record_count) = self.record_count {
            metadata.record_count = record_count;
        }
        if let Some(tags) = self.tags {
            metadata.tags = dedup_preserving_order(tags);
        }
        if let Some(category) = self.category {
            metadata.category = category;
        }
        if let Some(is_public) = self.is_public {
            metadata.is_public = is_public;
        }
        if let Some(last_record_at) = self.last_record_at {
            metadata.last_record_at = last_record_at;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsPatch {
    pub owners: Option<Vec<String>>,
    pub editors: Option<Vec<String>>,
    pub viewers: Option<Vec<String>>,
    pub public_read: Option<bool>,
}

impl PermissionsPatch {
    /// Resolves creation-time permissions. The creator always ends up an owner.
    pub fn resolve(self, created_by: &str) -> Permissions {
        let mut owners = self.owners.unwrap_or_default();
        owners.insert(0, created_by.to_string());

        Permissions {
            owners,
            editors: self.editors.unwrap_or_default(),
            viewers: self.viewers.unwrap_or_default(),
            public_read: self.public_read.unwrap_or(false),
        }
        .normalized()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPatch {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub source_form_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<Option<String>>,
    pub auto_sync: Option<bool>,
}

impl IntegrationPatch {
    pub fn webhook(url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(Some(url.into())),
            ..Default::default()
        }
    }

    pub fn apply_to(self, integration: &mut Integration) {
        if let Some(source_form_id) = self.source_form_id {
            integration.source_form_id = source_form_id;
        }
        if let Some(api_key) = self.api_key {
            integration.api_key = api_key;
        }
        if let Some(webhook_url) = self.webhook_url {
            integration.webhook_url = webhook_url;
        }
        if let Some(auto_sync) = self.auto_sync {
            integration.auto_sync = auto_sync;
        }
    }
}

/// Equality filters for listing; every supplied filter must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetFilter {
    pub organization_id: Option<String>,
    pub source_application: Option<String>,
    pub category: Option<String>,
}

impl DatasetFilter {
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            ..Default::default()
        }
    }

    /// Empty query-string values behave as if the filter was not given.
    pub fn normalized(self) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            organization_id: keep(self.organization_id),
            source_application: keep(self.source_application),
            category: keep(self.category),
        }
    }

    pub fn matches(&self, dataset: &Dataset) -> bool {
        let eq = |filter: &Option<String>, value: &str| {
            filter.as_deref().map(|f| f == value).unwrap_or(true)
        };
        eq(&self.organization_id, &dataset.organization_id)
            && eq(&self.source_application, &dataset.source_application)
            && eq(&self.category, &dataset.metadata.category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<Dataset>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetResponse {
    pub dataset: Dataset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
