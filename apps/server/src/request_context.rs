//! Per-request context injected by middleware.
//!
//! One [`RequestContext`] exists per inbound request. It owns the pieces the
//! access log needs at the end of the request regardless of what handlers did
//! in between: the start instant, a snapshot of the request line, the raw
//! body captured exactly once, and the most recently recorded response
//! envelope. Handlers reach it through `Extension<RequestContext>`.
//!
//! The transport body is a single-read stream. The context middleware drains
//! it into the cache once and hands inner layers a replayable copy, so
//! binding the same request twice always decodes the same bytes.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, Method, Uri};
use serde_json::{json, Map, Value as JsonValue};
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: String,
    started_at: Instant,
    method: Method,
    uri: Uri,
    client_ip: Option<String>,
    content_type: Option<String>,
    token: Option<String>,
    body: OnceLock<Bytes>,
    response: Mutex<Option<JsonValue>>,
}

impl RequestContext {
    /// Builds a context from the request head. The body is captured
    /// separately via [`capture_body`](Self::capture_body).
    pub fn new(parts: &Parts) -> Self {
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4().to_string(),
                started_at: Instant::now(),
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                client_ip: client_ip_from_parts(parts),
                content_type,
                token,
                body: OnceLock::new(),
                response: Mutex::new(None),
            }),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Client address, best-effort: forwarded headers first, then the peer.
    pub fn client_ip(&self) -> &str {
        self.inner.client_ip.as_deref().unwrap_or("")
    }

    pub fn content_type(&self) -> &str {
        self.inner.content_type.as_deref().unwrap_or("")
    }

    /// Raw value of the token header, empty when absent.
    pub fn token(&self) -> &str {
        self.inner.token.as_deref().unwrap_or("")
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Stores the raw body. Idempotent: the first capture wins and later
    /// calls return the already-cached bytes without touching the argument.
    pub fn capture_body(&self, bytes: Bytes) -> Bytes {
        self.inner.body.get_or_init(|| bytes).clone()
    }

    /// The cached raw body, if captured.
    pub fn body(&self) -> Option<Bytes> {
        self.inner.body.get().cloned()
    }

    /// True for methods whose input rides in the query string.
    pub fn is_read_style(&self) -> bool {
        matches!(self.inner.method, Method::GET | Method::HEAD)
    }

    /// Records the response envelope that was written to the client.
    /// Overwrite semantics: the last write wins.
    pub fn record_response(&self, envelope: JsonValue) {
        let mut slot = self
            .inner
            .response
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(envelope);
    }

    /// The recorded response envelope, or `{}` when nothing was written.
    pub fn last_response(&self) -> JsonValue {
        self.inner
            .response
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or_else(|| json!({}))
    }

    /// Reconstructs the request payload for logging.
    ///
    /// Read-style requests report their query parameters; everything else
    /// reports the cached body reparsed as a generic JSON map. Parse failures
    /// degrade to an empty map. Secret-looking fields are redacted.
    pub fn request_payload(&self) -> JsonValue {
        let payload = if self.is_read_style() {
            query_map(self.inner.uri.query().unwrap_or(""))
        } else {
            self.body()
                .and_then(|bytes| serde_json::from_slice::<Map<String, JsonValue>>(&bytes).ok())
                .map(JsonValue::Object)
                .unwrap_or_else(|| json!({}))
        };
        sanitize(payload)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.inner.request_id)
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .finish_non_exhaustive()
    }
}

fn client_ip_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            parts
                .headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// Query string as a JSON map. Repeated keys keep the last value.
fn query_map(query: &str) -> JsonValue {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        map.insert(key.into_owned(), JsonValue::String(value.into_owned()));
    }
    JsonValue::Object(map)
}

/// Redacts values of secret-looking keys, recursively.
fn sanitize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_sensitive_key(&key) {
                        (key, JsonValue::String("[redacted]".to_string()))
                    } else {
                        (key, sanitize(value))
                    }
                })
                .collect(),
        ),
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("password") || key.contains("secret") || key.contains("token")
}
