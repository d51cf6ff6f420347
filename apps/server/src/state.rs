//! Shared application state.

use std::sync::Arc;

use crate::auth::AuthResolver;
use crate::config::Config;

/// Process-wide state handed to middleware and handlers.
///
/// Everything here is read-only after startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthResolver,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let auth = AuthResolver::new(config.auth.jwt_secret.clone());
        Self {
            config: Arc::new(config),
            auth,
        }
    }
}
