//! Context middleware: builds the per-request context and caches the body.
//!
//! Outermost application middleware. The transport body is drained here,
//! exactly once, into the context; inner layers receive a rebuilt request
//! whose body is a replayable copy of the cached bytes, so framework-level
//! reads downstream still observe the full payload.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::response;
use crate::error::Error;
use crate::request_context::RequestContext;
use crate::state::AppState;

pub async fn context_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let ctx = RequestContext::new(&parts);

    let limit = state.config.server.max_request_body_size;
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %ctx.request_id(),
                error = %e,
                "failed to read request body"
            );
            return response::failure(
                &ctx,
                &Error::MalformedInput(format!("failed to read request body: {e}")),
            );
        }
    };

    let bytes = ctx.capture_body(bytes);
    parts.extensions.insert(ctx);

    let req = Request::from_parts(parts, Body::from(bytes));
    next.run(req).await
}
