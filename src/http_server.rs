use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::domain::{
    CreateDatasetRequest, DatasetFilter, DatasetListResponse, DatasetPatch, DatasetResponse,
    IntegrationPatch, MessageResponse, MetadataPatch,
};
use crate::error::RegistryError;
use crate::integration::IntegrationGateway;
use crate::metadata_tracker::MetadataTracker;
use crate::permissions::Actor;
use crate::registry::DatasetRegistry;

pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DatasetRegistry>,
    pub gateway: Arc<IntegrationGateway>,
    pub tracker: Arc<MetadataTracker>,
}

impl AppState {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self {
            gateway: Arc::new(IntegrationGateway::new(registry.clone())),
            tracker: Arc::new(MetadataTracker::new(registry.clone())),
            registry,
        }
    }
}

pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self {
            state: AppState::new(registry),
        }
    }

    pub async fn start<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), RegistryError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/datasets", get(list_datasets).post(create_dataset))
        .route(
            "/datasets/{dataset_id}",
            get(get_dataset).put(update_dataset).delete(delete_dataset),
        )
        .route("/datasets/{dataset_id}/integration", put(configure_integration))
        .route("/datasets/{dataset_id}/metadata", put(apply_metadata_delta))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(Actor::from_optional(id))
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RegistryError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| RegistryError::validation(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, RegistryError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| RegistryError::validation(rejection.body_text()))
}

fn path_dataset_id(
    path: Result<Path<String>, PathRejection>,
) -> Result<String, RegistryError> {
    match path {
        Ok(Path(dataset_id)) => Ok(dataset_id),
        Err(rejection) if rejection.status().is_server_error() => {
            Err(RegistryError::InternalError {
                message: rejection.body_text(),
            })
        }
        Err(rejection) => Err(RegistryError::validation(rejection.body_text())),
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.registry.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            error!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

async fn list_datasets(
    State(state): State<AppState>,
    actor: Actor,
    query: Result<Query<DatasetFilter>, QueryRejection>,
) -> Result<Json<DatasetListResponse>, RegistryError> {
    let filter = query_params(query)?.normalized();
    info!("HTTP: list datasets {:?} for {}", filter, actor);

    let datasets = state.registry.list(&actor, &filter).await.inspect_err(|e| {
        error!("HTTP: failed to list datasets: {}", e);
    })?;

    Ok(Json(DatasetListResponse {
        total: datasets.len(),
        datasets,
    }))
}

async fn create_dataset(
    State(state): State<AppState>,
    payload: Result<Json<CreateDatasetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, RegistryError> {
    let request = json_body(payload)?;
    info!("HTTP: create dataset {:?}", request.name);

    let dataset = state.registry.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(DatasetResponse {
            dataset,
            message: Some("Dataset created successfully".to_string()),
        }),
    ))
}

async fn get_dataset(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DatasetResponse>, RegistryError> {
    let dataset_id = path_dataset_id(path)?;
    let dataset = state.registry.get(&actor, &dataset_id).await?;
    Ok(Json(DatasetResponse {
        dataset,
        message: None,
    }))
}

async fn update_dataset(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<DatasetPatch>, JsonRejection>,
) -> Result<Json<DatasetResponse>, RegistryError> {
    let dataset_id = path_dataset_id(path)?;
    let patch = json_body(payload)?;
    info!("HTTP: update dataset {} by {}", dataset_id, actor);

    let dataset = state.registry.update(&actor, &dataset_id, patch).await?;
    Ok(Json(DatasetResponse {
        dataset,
        message: Some("Dataset updated successfully".to_string()),
    }))
}

async fn delete_dataset(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<MessageResponse>, RegistryError> {
    let dataset_id = path_dataset_id(path)?;
    info!("HTTP: delete dataset {} by {}", dataset_id, actor);

    state.registry.delete(&actor, &dataset_id).await?;
    Ok(Json(MessageResponse {
        message: "Dataset deleted successfully".to_string(),
    }))
}

async fn configure_integration(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<IntegrationPatch>, JsonRejection>,
) -> Result<Json<DatasetResponse>, RegistryError> {
    let dataset_id = path_dataset_id(path)?;
    let patch = json_body(payload)?;

    let dataset = state.gateway.configure(&actor, &dataset_id, patch).await?;
    Ok(Json(DatasetResponse {
        dataset,
        message: Some("Integration updated successfully".to_string()),
    }))
}

async fn apply_metadata_delta(
    State(state): State<AppState>,
    actor: Actor,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<MetadataPatch>, JsonRejection>,
) -> Result<Json<DatasetResponse>, RegistryError> {
    let dataset_id = path_dataset_id(path)?;
    let delta = json_body(payload)?;

    let dataset = state
        .tracker
        .apply_metadata_delta(&actor, &dataset_id, delta)
        .await?;
    Ok(Json(DatasetResponse {
        dataset,
        message: Some("Metadata updated successfully".to_string()),
    }))
}
