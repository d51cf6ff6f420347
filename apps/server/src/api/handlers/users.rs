//! Demo user routes exercising the request-context layer.

use axum::{response::Response, Extension};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::bind::bind_validated;
use crate::api::pagination::extract_pager;
use crate::api::response;
use crate::auth::CurrentUser;
use crate::request_context::RequestContext;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
}

/// `POST /api/users` — validated create. Public so that unauthenticated
/// binding still works end to end.
pub async fn create_user(Extension(ctx): Extension<RequestContext>) -> Response {
    let input: CreateUserInput = match bind_validated(&ctx) {
        Ok(input) => input,
        Err(e) => return response::failure(&ctx, &e),
    };

    response::success(
        &ctx,
        json!({
            "name": input.name,
            "email": input.email,
            "ok": true,
        }),
    )
}

/// `GET /api/users` — paged list. Pagination is best-effort and always
/// bounded; the route does not require a login.
pub async fn list_users(Extension(ctx): Extension<RequestContext>) -> Response {
    let pager = extract_pager(&ctx);

    response::success(
        &ctx,
        json!({
            "page": pager.page,
            "pageSize": pager.page_size,
            "items": [],
        }),
    )
}

/// `GET /api/me` — behind `require_auth`; the identity comes from the
/// extension the middleware attached.
pub async fn me(Extension(ctx): Extension<RequestContext>, CurrentUser(user): CurrentUser) -> Response {
    response::success(&ctx, json!({ "id": user.id }))
}
