//! Authentication primitives.
//!
//! The server validates HS256 bearer tokens issued elsewhere; it never mints
//! tokens itself. Identity is a pure function of the token header value and
//! the configured secret, so it is re-derived on demand instead of being
//! cached on the request: two reads always agree.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::api::response;
use crate::error::{Error, Result};
use crate::request_context::RequestContext;
use crate::state::AppState;

/// Verified login identity. `id` is never `0` on the success path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoginUser {
    pub id: i64,
}

/// Decoded claim set of a verified token. Never persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPayload {
    pub uid: i64,
    pub exp: i64,
}

/// Resolves bearer tokens into [`LoginUser`]s.
///
/// Constructed once at startup with the process-wide secret and carried in
/// [`AppState`]; cloning shares the secret.
#[derive(Clone)]
pub struct AuthResolver {
    secret: String,
}

impl AuthResolver {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Turns a token header value into a verified identity.
    ///
    /// An empty header is [`Error::MissingToken`]; verification failures are
    /// [`Error::InvalidToken`]; a structurally valid token whose `uid` is `0`
    /// is [`Error::InvalidIdentity`] and must not authenticate.
    pub fn resolve(&self, header_value: &str) -> Result<LoginUser> {
        if header_value.is_empty() {
            return Err(Error::MissingToken);
        }

        let token = header_value
            .strip_prefix("Bearer ")
            .or_else(|| header_value.strip_prefix("bearer "))
            .unwrap_or(header_value);

        let payload = verify_token(token, &self.secret)?;
        if payload.uid == 0 {
            return Err(Error::InvalidIdentity);
        }
        Ok(LoginUser { id: payload.uid })
    }

    /// Header lookup plus [`resolve`](Self::resolve).
    pub fn resolve_request(&self, headers: &HeaderMap) -> Result<LoginUser> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        self.resolve(value)
    }
}

/// The token verification primitive: signature and expiry checks only.
fn verify_token(token: &str, secret: &str) -> Result<TokenPayload> {
    let data = decode::<TokenPayload>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| Error::InvalidToken(e.to_string()))?;
    Ok(data.claims)
}

/// Extractor for the identity attached by [`require_auth`].
///
/// Only meaningful on routes behind that middleware; elsewhere it rejects
/// with the missing-token envelope.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub LoginUser);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<LoginUser>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| Error::MissingToken.into_response())
    }
}

/// Middleware for routes that require an authenticated caller.
///
/// On success the [`LoginUser`] is attached to the request; on failure the
/// error envelope is written immediately and no inner handler runs. The
/// written envelope is recorded on the request context so the access log
/// reflects it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.auth.resolve_request(req.headers()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => match req.extensions().get::<RequestContext>() {
            Some(ctx) => response::failure(ctx, &err),
            None => err.into_response(),
        },
    }
}
