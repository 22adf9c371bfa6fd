use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use dataset_registry::http_server::{router, AppState, ACTOR_HEADER};
use dataset_registry::storage::MemoryDatasetStore;
use dataset_registry::DatasetRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn app() -> Router {
    init_test_logging();
    let registry = Arc::new(DatasetRegistry::new(Arc::new(MemoryDatasetStore::new())));
    router(AppState::new(registry))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn volunteers(organization_id: &str) -> Value {
    json!({
        "name": "Volunteers",
        "sourceApplication": "signup-form",
        "organizationId": organization_id,
        "createdBy": "u1",
        "schema": { "fields": [{ "name": "email", "type": "string" }] }
    })
}

#[tokio::test]
async fn test_volunteers_dataset_lifecycle() {
    let app = app();

    // Given: the signup form registers its dataset
    let (status, body) = send(&app, Method::POST, "/datasets", None, Some(volunteers("org-1"))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "Dataset created successfully");
    assert_eq!(body["dataset"]["metadata"]["recordCount"], 0);
    assert_eq!(body["dataset"]["permissions"]["owners"], json!(["u1"]));
    assert_eq!(body["dataset"]["schema"]["version"], "1.0.0");
    let id = body["dataset"]["id"].as_str().unwrap().to_string();
    let uri = format!("/datasets/{}", id);

    // When: an automation configures a webhook
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some("u1"),
        Some(json!({ "integration": { "webhookUrl": "https://example.com/hook" } })),
    )
    .await;

    // Then: the webhook is set and nothing else in the block appears
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Dataset updated successfully");
    assert_eq!(
        body["dataset"]["integration"]["webhookUrl"],
        "https://example.com/hook"
    );
    assert!(body["dataset"]["integration"].get("sourceFormId").is_none());

    // When: the dataset is deleted
    let (status, body) = send(&app, Method::DELETE, &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Dataset deleted successfully");

    // Then: it is gone
    let (status, body) = send(&app, Method::GET, &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_create_rejects_bad_input_with_400() {
    let app = app();

    let mut missing = volunteers("org-1");
    missing.as_object_mut().unwrap().remove("createdBy");
    let (status, body) = send(&app, Method::POST, "/datasets", None, Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("createdBy"));

    let mut empty_schema = volunteers("org-1");
    empty_schema["schema"]["fields"] = json!([]);
    let (status, _) = send(&app, Method::POST, "/datasets", None, Some(empty_schema)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut not_a_list = volunteers("org-1");
    not_a_list["schema"]["fields"] = json!("email");
    let (status, body) = send(&app, Method::POST, "/datasets", None, Some(not_a_list)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let mut unknown_type = volunteers("org-1");
    unknown_type["schema"]["fields"] = json!([{ "name": "email", "type": "blob" }]);
    let (status, _) = send(&app, Method::POST, "/datasets", None, Some(unknown_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_filters_by_query_parameters() {
    let app = app();
    for organization_id in ["org-1", "org-1", "org-2"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/datasets",
            None,
            Some(volunteers(organization_id)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/datasets?organizationId=org-1&category=",
        Some("u1"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let datasets = body["datasets"].as_array().unwrap();
    assert!(datasets.iter().all(|d| d["organizationId"] == "org-1"));

    let (status, body) = send(
        &app,
        Method::GET,
        "/datasets?sourceApplication=other-tool",
        Some("u1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["datasets"], json!([]));
}

#[tokio::test]
async fn test_unauthorized_actors_get_403() {
    let app = app();
    let (_, body) = send(&app, Method::POST, "/datasets", None, Some(volunteers("org-1"))).await;
    let uri = format!("/datasets/{}", body["dataset"]["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");

    let (status, _) = send(
        &app,
        Method::PUT,
        &uri,
        Some("stranger"),
        Some(json!({ "name": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &uri, Some("stranger"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &uri, Some("u1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dataset"]["name"], "Volunteers");
}

#[tokio::test]
async fn test_put_unknown_dataset_is_404() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::PUT,
        "/datasets/ds_missing",
        Some("u1"),
        Some(json!({ "name": "X" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(&app, Method::DELETE, "/datasets/ds_missing", Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_integration_and_metadata_endpoints() {
    let app = app();
    let (_, body) = send(&app, Method::POST, "/datasets", None, Some(volunteers("org-1"))).await;
    let id = body["dataset"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/datasets/{}/integration", id),
        Some("u1"),
        Some(json!({ "sourceFormId": "form-7", "autoSync": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["dataset"]["integration"]["sourceFormId"], "form-7");
    assert_eq!(body["dataset"]["integration"]["autoSync"], true);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/datasets/{}/metadata", id),
        Some("u1"),
        Some(json!({ "recordCount": 4, "tags": ["volunteers"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["dataset"]["metadata"]["recordCount"], 4);
    assert_eq!(body["dataset"]["metadata"]["tags"], json!(["volunteers"]));
    assert_eq!(body["dataset"]["metadata"]["category"], "general");
    assert_eq!(body["dataset"]["integration"]["sourceFormId"], "form-7");
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/healthz", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_malformed_query_and_path_are_json_400() {
    let app = app();

    // When: the same filter is given twice
    let (status, body) = send(
        &app,
        Method::GET,
        "/datasets?organizationId=a&organizationId=b",
        Some("u1"),
        None,
    )
    .await;

    // Then: the error uses the regular error body
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("organizationId"));

    // When: the dataset id is not valid UTF-8
    let (status, body) = send(&app, Method::GET, "/datasets/%FF", Some("u1"), None).await;

    // Then
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_field_validation_rules_are_kept_or_refused() {
    let app = app();

    // Given: a field restricted to a fixed set of values
    let mut request = volunteers("org-1");
    request["schema"]["fields"] = json!([{
        "name": "status",
        "type": "text",
        "validation": { "enum": ["active", "inactive"], "pattern": "^[a-z]+$" }
    }]);

    // When
    let (status, body) = send(&app, Method::POST, "/datasets", None, Some(request)).await;

    // Then: every rule is stored
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(
        body["dataset"]["schema"]["fields"][0]["validation"],
        json!({ "enum": ["active", "inactive"], "pattern": "^[a-z]+$" })
    );

    // When: a rule the registry does not know is supplied
    let mut request = volunteers("org-1");
    request["schema"]["fields"] = json!([{
        "name": "email",
        "type": "email",
        "validation": { "format": "rfc5322" }
    }]);
    let (status, body) = send(&app, Method::POST, "/datasets", None, Some(request)).await;

    // Then
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_null_description_clears_it() {
    let app = app();
    let mut request = volunteers("org-1");
    request["description"] = json!("Signups from the spring drive");
    let (_, body) = send(&app, Method::POST, "/datasets", None, Some(request)).await;
    let uri = format!("/datasets/{}", body["dataset"]["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some("u1"),
        Some(json!({ "description": null })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["dataset"]["description"], "");
    assert_eq!(body["dataset"]["name"], "Volunteers");
}
