//! End-to-end tests over the real router: body replay, identity, pagination,
//! envelope convention, and the panic recovery boundary.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use quickapi::api::create_router;
use quickapi::api::middleware::{access_log_middleware, context_middleware};
use quickapi::auth::TokenPayload;
use quickapi::config::{AuthConfig, Config, LoggingConfig, ServerConfig};
use quickapi::state::AppState;

const SECRET: &str = "integration-test-secret";

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_request_body_size: 1 << 20,
            cors_origins: Vec::new(),
        },
        auth: AuthConfig {
            jwt_secret: SECRET.to_string(),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "quickapi".to_string(),
            file_rotation: "never".to_string(),
        },
    }
}

fn app() -> Router {
    create_router(AppState::new(test_config()))
}

fn token_for(uid: i64) -> String {
    let payload = TokenPayload {
        uid,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn post_binds_cached_body_and_wraps_success_envelope() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"a"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["msg"], "success");
    assert_eq!(body["data"]["name"], "a");
    assert_eq!(body["data"]["ok"], true);
}

#[tokio::test]
async fn malformed_json_yields_malformed_input_code() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("content-type", "application/json")
                .body(Body::from("{nope"))
                .unwrap(),
        )
        .await
        .unwrap();

    // Domain errors ride inside a 200 envelope by convention.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 3001);
}

#[tokio::test]
async fn failed_validation_yields_request_param_code() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["code"], 3002);
    assert!(body["msg"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn unauthenticated_list_still_works() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
}

#[tokio::test]
async fn pager_is_clamped_end_to_end() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/users?page=0&pageSize=1000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["pageSize"], 100);
}

#[tokio::test]
async fn protected_route_rejects_missing_token() {
    let response = app()
        .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 2001);
}

#[tokio::test]
async fn protected_route_rejects_garbage_token() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["code"], 2002);
}

#[tokio::test]
async fn protected_route_returns_token_identity() {
    let token = token_for(42);
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["id"], 42);
}

#[tokio::test]
async fn panicking_handler_is_recovered_and_service_keeps_running() {
    let state = AppState::new(test_config());
    let app = Router::new()
        .route(
            "/boom",
            get(|| async {
                panic!("boom");
                #[allow(unreachable_code)]
                ()
            }),
        )
        .route("/ok", get(|| async { Json(json!({"fine": true})) }))
        .layer(from_fn_with_state(state.clone(), access_log_middleware))
        .layer(from_fn_with_state(state, context_middleware));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 1000);
    assert_eq!(body["msg"], "internal server error");

    // The process keeps serving after the panic.
    let response = app
        .oneshot(Request::builder().uri("/ok").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["fine"], true);
}
