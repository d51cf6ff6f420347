//! Response envelope and the write-time recorder.
//!
//! Every response leaves through [`success`] or [`failure`], which stash the
//! exact envelope on the request context before writing it. The access log
//! reads that recorded value instead of recomputing anything, so what it
//! reports is byte-for-byte what the client received.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, CODE_SUCCESS};
use crate::request_context::RequestContext;

/// Wraps `data` in the success envelope, records it, and writes it.
pub fn success<T: Serialize>(ctx: &RequestContext, data: T) -> Response {
    let data = match serde_json::to_value(data) {
        Ok(value) => value,
        Err(e) => return failure(ctx, &Error::Internal(format!("serialize response: {e}"))),
    };
    let envelope = json!({
        "code": CODE_SUCCESS,
        "msg": "success",
        "data": data,
    });
    ctx.record_response(envelope.clone());
    (StatusCode::OK, Json(envelope)).into_response()
}

/// Wraps `err` in the error envelope, records it, and writes it.
///
/// Returned from middleware without calling the inner service, this is the
/// abort path: nothing further in the chain runs. The envelope still rides
/// on HTTP 200 (see `error` module docs). Last write wins when called more
/// than once on the same context.
pub fn failure(ctx: &RequestContext, err: &Error) -> Response {
    let envelope = err.envelope();
    ctx.record_response(envelope.clone());
    (StatusCode::OK, Json(envelope)).into_response()
}
