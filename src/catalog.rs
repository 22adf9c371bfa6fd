use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataset_schema::Schema;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub source_application: String,
    pub organization_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema: Schema,
    pub metadata: DatasetMetadata,
    pub permissions: Permissions,
    pub integration: Integration,
    #[serde(default)]
    pub display_settings: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub record_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_record_at: Option<DateTime<Utc>>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            record_count: 0,
            tags: Vec::new(),
            category: DEFAULT_CATEGORY.to_string(),
            is_public: false,
            last_record_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub owners: Vec<String>,
    #[serde(default)]
    pub editors: Vec<String>,
    #[serde(default)]
    pub viewers: Vec<String>,
    #[serde(default)]
    pub public_read: bool,
}

impl Permissions {
    pub fn owned_by(owner: impl Into<String>) -> Self {
        Self {
            owners: vec![owner.into()],
            ..Default::default()
        }
    }

    /// Collapses duplicate members; membership is a set.
    pub fn normalized(mut self) -> Self {
        self.owners = dedup_preserving_order(self.owners);
        self.editors = dedup_preserving_order(self.editors);
        self.viewers = dedup_preserving_order(self.viewers);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_form_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub auto_sync: bool,
}

pub fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
