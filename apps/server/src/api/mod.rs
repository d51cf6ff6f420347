//! API layer - routes, handlers, and middleware

pub mod bind;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod response;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

/// Create the main application router.
///
/// Middleware ordering matters: the context middleware is outermost so every
/// inner layer (access log included) sees the captured body and the shared
/// [`crate::request_context::RequestContext`]; the access log sits directly
/// inside it so it observes the final response (or the panic) of everything
/// below.
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    let protected = Router::new()
        .route("/me", get(handlers::users::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    let api = Router::new()
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .merge(protected);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::access_log_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::context_middleware,
        ))
        .layer(cors(&cors_origins))
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "quickapi",
    }))
}

/// CORS middleware
fn cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Secure default: do not emit permissive CORS headers unless explicitly configured.
        return CorsLayer::new();
    }

    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let mut header_values = Vec::with_capacity(origins.len());
    for origin in origins {
        if let Ok(value) = axum::http::HeaderValue::from_str(origin) {
            header_values.push(value);
        }
    }

    // If all configured origins were invalid, fall back to no CORS.
    if header_values.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(header_values))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn create_router_does_not_panic() {
        let state = AppState::new(Config::for_tests("s3cret"));
        let _router = create_router(state);
    }

    #[test]
    fn cors_wildcard() {
        let _cors = cors(&["*".to_string()]);
    }

    #[test]
    fn cors_specific_origins() {
        let _cors = cors(&[
            "http://localhost:3000".to_string(),
            "https://example.com".to_string(),
        ]);
    }
}
