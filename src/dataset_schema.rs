//! Field-level shape of a dataset's records.
//!
//! Only the schema itself is validated here; checking individual records
//! against it happens in whatever pipeline ingests them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("must include fields array")]
    MissingFields,

    #[error("fields array must not be empty")]
    EmptyFields,

    #[error("field at position {position} has an empty name")]
    BlankFieldName { position: usize },

    #[error("field '{name}' is declared more than once")]
    DuplicateField { name: String },

    #[error("primary key '{name}' does not name a declared field")]
    UnknownPrimaryKey { name: String },

    #[error("field '{name}' must declare at least one option")]
    MissingOptions { name: String },

    #[error("field '{name}' has inconsistent bounds: {detail}")]
    InvalidBounds { name: String, detail: String },

    #[error("field '{name}' has an empty enum list")]
    EmptyEnum { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

/// Schema as supplied by a caller, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInput {
    #[serde(default)]
    pub fields: Option<Vec<FieldDescriptor>>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
}

impl SchemaInput {
    pub fn with_fields(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields: Some(fields),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldAnnotations>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: false,
            unique: false,
            indexed: false,
            kind,
            validation: None,
            metadata: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_validation(mut self, validation: FieldValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Label shown to people, falling back to the field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// The `type` tag of a field. Choice types carry their options inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    #[serde(alias = "string")]
    Text,
    Textarea,
    Email,
    Phone,
    Url,
    Number,
    Date,
    Boolean,
    Json,
    Array,
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
    Radio {
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox {
        #[serde(default)]
        options: Vec<String>,
    },
}

impl FieldKind {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Url => "url",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Boolean => "boolean",
            FieldKind::Json => "json",
            FieldKind::Array => "array",
            FieldKind::Select { .. } => "select",
            FieldKind::Radio { .. } => "radio",
            FieldKind::Checkbox { .. } => "checkbox",
        }
    }

    fn options(&self) -> Option<&[String]> {
        match self {
            FieldKind::Select { options }
            | FieldKind::Radio { options }
            | FieldKind::Checkbox { options } => Some(options.as_slice()),
            _ => None,
        }
    }
}

/// Constraints on a field's values. Unknown keys are refused so a stored
/// schema never silently loses a rule the caller supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

pub fn validate_schema(input: SchemaInput) -> Result<Schema, SchemaError> {
    let fields = input.fields.ok_or(SchemaError::MissingFields)?;
    if fields.is_empty() {
        return Err(SchemaError::EmptyFields);
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        if field.name.trim().is_empty() {
            return Err(SchemaError::BlankFieldName { position });
        }
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                name: field.name.clone(),
            });
        }
        validate_field(field)?;
    }

    if let Some(primary_key) = &input.primary_key {
        if !seen.contains(primary_key.as_str()) {
            return Err(SchemaError::UnknownPrimaryKey {
                name: primary_key.clone(),
            });
        }
    }

    let version = input
        .version
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string());

    Ok(Schema {
        fields,
        version,
        primary_key: input.primary_key,
    })
}

fn validate_field(field: &FieldDescriptor) -> Result<(), SchemaError> {
    if let Some(options) = field.kind.options() {
        if options.is_empty() {
            return Err(SchemaError::MissingOptions {
                name: field.name.clone(),
            });
        }
    }

    let Some(rules) = &field.validation else {
        return Ok(());
    };

    if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
        if min > max {
            return Err(SchemaError::InvalidBounds {
                name: field.name.clone(),
                detail: format!("minLength {} exceeds maxLength {}", min, max),
            });
        }
    }

    if let (Some(min), Some(max)) = (rules.min, rules.max) {
        if min > max {
            return Err(SchemaError::InvalidBounds {
                name: field.name.clone(),
                detail: format!("min {} exceeds max {}", min, max),
            });
        }
    }

    if rules.allowed_values.as_ref().is_some_and(Vec::is_empty) {
        return Err(SchemaError::EmptyEnum {
            name: field.name.clone(),
        });
    }

    Ok(())
}
