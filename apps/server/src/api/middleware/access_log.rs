//! Access log middleware and panic recovery boundary.
//!
//! Emits exactly one structured record per request under the `access_log`
//! target, on both the normal and the panic path, strictly after the inner
//! service has produced (or failed to produce) its response. A panicking
//! handler is logged with `kind = "panic"`, the client gets the generic
//! internal-error envelope, and the process keeps serving.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::error::Error;
use crate::request_context::RequestContext;
use crate::state::AppState;

pub async fn access_log_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<RequestContext>().cloned() else {
        // Context middleware is not installed above us; nothing to log against.
        return next.run(req).await;
    };

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => {
            log_completion(&state, &ctx);
            response
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            log_panic(&state, &ctx, &msg);
            Error::Internal(format!("handler panicked: {msg}")).into_response()
        }
    }
}

fn log_completion(state: &AppState, ctx: &RequestContext) {
    let uid = resolved_uid(state, ctx);
    tracing::info!(
        target: "access_log",
        kind = "api",
        uid,
        query = %ctx.request_payload(),
        response = %ctx.last_response(),
        method = %ctx.method(),
        uri = %ctx.uri(),
        latency = %latency_display(ctx),
        ip = %ctx.client_ip(),
        request_id = %ctx.request_id(),
        "api request"
    );
}

fn log_panic(state: &AppState, ctx: &RequestContext, panic_msg: &str) {
    let uid = resolved_uid(state, ctx);
    tracing::error!(
        target: "access_log",
        kind = "panic",
        panic = %panic_msg,
        uid,
        query = %ctx.request_payload(),
        response = %ctx.last_response(),
        method = %ctx.method(),
        uri = %ctx.uri(),
        latency = %latency_display(ctx),
        ip = %ctx.client_ip(),
        request_id = %ctx.request_id(),
        "handler panicked"
    );
}

/// Identity for the log record. Resolution failure is tolerated and reported
/// as the zero identity rather than erroring.
fn resolved_uid(state: &AppState, ctx: &RequestContext) -> i64 {
    state.auth.resolve(ctx.token()).map(|u| u.id).unwrap_or(0)
}

fn latency_display(ctx: &RequestContext) -> String {
    format!("{:.3}ms", ctx.elapsed().as_secs_f64() * 1000.0)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::context_middleware;
    use crate::api::response;
    use crate::auth::TokenPayload;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::Request as HttpRequest,
        middleware::from_fn_with_state,
        routing::{get, post},
        Extension, Router,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    const SECRET: &str = "access-log-test-secret";

    /// Shared buffer the JSON fmt layer writes into during a test.
    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn state() -> AppState {
        AppState::new(Config::for_tests(SECRET))
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route(
                "/echo",
                post(|Extension(ctx): Extension<RequestContext>| async move {
                    response::success(&ctx, json!({"ok": true}))
                }),
            )
            .route(
                "/boom",
                get(|| async {
                    panic!("boom");
                    #[allow(unreachable_code)]
                    ()
                }),
            )
            .layer(from_fn_with_state(state.clone(), access_log_middleware))
            .layer(from_fn_with_state(state, context_middleware))
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

    /// Runs the request under a capturing subscriber and returns every record
    /// emitted with the `access_log` target.
    async fn records_for(app: Router, req: HttpRequest<Body>) -> Vec<Value> {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let guard = tracing::subscriber::set_default(subscriber);
        let _ = app.oneshot(req).await.unwrap();
        drop(guard);

        let buf = writer
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|record| record["target"] == "access_log")
            .collect()
    }

    #[tokio::test]
    async fn completion_record_carries_identity_payload_and_response() {
        let token = token_for(42);
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(r#"{"name":"a"}"#))
            .unwrap();

        let records = records_for(app(state()), req).await;
        assert_eq!(records.len(), 1);

        let fields = &records[0]["fields"];
        assert_eq!(fields["kind"], "api");
        assert_eq!(fields["uid"], 42);
        assert_eq!(fields["method"], "POST");
        assert_eq!(fields["uri"], "/echo");
        // Request payload reflects the original body; response is the exact
        // envelope the recorder wrote.
        assert_eq!(fields["query"], r#"{"name":"a"}"#);
        let recorded: Value = serde_json::from_str(fields["response"].as_str().unwrap()).unwrap();
        assert_eq!(recorded["code"], 0);
        assert_eq!(recorded["data"]["ok"], true);
    }

    #[tokio::test]
    async fn unauthenticated_completion_logs_zero_identity() {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"a"}"#))
            .unwrap();

        let records = records_for(app(state()), req).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["fields"]["uid"], 0);
    }

    #[tokio::test]
    async fn panic_record_is_emitted_with_empty_response() {
        let req = HttpRequest::builder()
            .uri("/boom")
            .body(Body::empty())
            .unwrap();

        let records = records_for(app(state()), req).await;
        assert_eq!(records.len(), 1);

        let fields = &records[0]["fields"];
        assert_eq!(fields["kind"], "panic");
        assert_eq!(fields["panic"], "boom");
        // The handler died before any write, so the response degrades to {}.
        assert_eq!(fields["response"], "{}");
        assert_eq!(records[0]["level"], "ERROR");
    }

    #[test]
    fn panic_message_renders_str_and_string() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
