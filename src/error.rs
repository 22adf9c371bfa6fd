use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::dataset_schema::SchemaError;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Validation failed: {message}")]
    ValidationError { message: String },

    #[error("Dataset not found: {dataset_id}")]
    DatasetNotFound { dataset_id: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Document store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl RegistryError {
    pub fn validation(message: impl Into<String>) -> Self {
        RegistryError::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(dataset_id: &str) -> Self {
        RegistryError::DatasetNotFound {
            dataset_id: dataset_id.to_string(),
        }
    }

    /// For values the service produced itself failing to encode. Unlike
    /// `JsonError`, this is never the caller's fault.
    pub fn encoding(err: serde_json::Error) -> Self {
        RegistryError::InternalError {
            message: format!("Failed to encode stored value: {}", err),
        }
    }

    /// Stable machine-readable kind surfaced to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::ValidationError { .. } | RegistryError::JsonError(_) => {
                "validation_error"
            }
            RegistryError::DatasetNotFound { .. } => "not_found",
            RegistryError::Unauthorized { .. } => "unauthorized",
            RegistryError::StoreUnavailable { .. } => "store_unavailable",
            RegistryError::ConfigError { .. } => "config_error",
            RegistryError::IoError { .. } | RegistryError::InternalError { .. } => {
                "internal_error"
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RegistryError::ValidationError { .. } | RegistryError::JsonError(_) => {
                StatusCode::BAD_REQUEST
            }
            RegistryError::DatasetNotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            RegistryError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SchemaError> for RegistryError {
    fn from(err: SchemaError) -> Self {
        RegistryError::ValidationError {
            message: format!("Invalid schema: {}", err),
        }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for RegistryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                RegistryError::StoreUnavailable {
                    message: info.message().to_string(),
                }
            }
            Error::BrokenTransactionManager => RegistryError::StoreUnavailable {
                message: err.to_string(),
            },
            other => RegistryError::InternalError {
                message: format!("Database error: {}", other),
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_surface_as_validation_errors() {
        let err: RegistryError = SchemaError::EmptyFields.into();

        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Invalid schema"));
    }

    #[test]
    fn encoding_failures_are_internal() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let client: RegistryError = parse_err.into();
        assert_eq!(client.kind(), "validation_error");

        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let encoding = RegistryError::encoding(parse_err);
        assert_eq!(encoding.kind(), "internal_error");
        assert_eq!(encoding.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            RegistryError::not_found("ds_1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RegistryError::Unauthorized {
                message: "nope".into()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RegistryError::StoreUnavailable {
                message: "down".into()
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
