//! Typed input binding from the cached request payload.
//!
//! Binding never touches the transport stream: it decodes the bytes the
//! context middleware captured (or the query string for read-style
//! requests), so a handler may bind the same request any number of times and
//! always get structurally identical results.
//!
//! The bind target is constrained at compile time (`DeserializeOwned`, plus
//! `Validate` for the validated variant) — there is no runtime "is this a
//! struct pointer" guard to fail.

use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{Error, Result};
use crate::request_context::RequestContext;

/// Decodes the request input into `T` based on method and content type.
///
/// Read-style requests (and requests with an empty cached body) decode the
/// URI query string; `application/x-www-form-urlencoded` bodies decode as
/// forms; everything else decodes as JSON. Decode failures surface as
/// [`Error::MalformedInput`] with the decoder's message.
pub fn bind<T: DeserializeOwned>(ctx: &RequestContext) -> Result<T> {
    let body = ctx.body().unwrap_or_default();

    if ctx.is_read_style() || body.is_empty() {
        let query = ctx.uri().query().unwrap_or("");
        return serde_urlencoded::from_str(query)
            .map_err(|e| Error::MalformedInput(e.to_string()));
    }

    if is_form_content_type(ctx.content_type()) {
        serde_urlencoded::from_bytes(&body).map_err(|e| Error::MalformedInput(e.to_string()))
    } else {
        serde_json::from_slice(&body).map_err(|e| Error::MalformedInput(e.to_string()))
    }
}

/// [`bind`] plus the target's self-check.
///
/// Validation failures surface as [`Error::RequestParamInvalid`] carrying the
/// check's message. The decoded value is dropped on failure; nothing is
/// partially handed to the caller.
pub fn bind_validated<T: DeserializeOwned + Validate>(ctx: &RequestContext) -> Result<T> {
    let value: T = bind(ctx)?;
    value
        .validate()
        .map_err(|e| Error::RequestParamInvalid(e.to_string()))?;
    Ok(value)
}

fn is_form_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .eq_ignore_ascii_case("application/x-www-form-urlencoded")
}
