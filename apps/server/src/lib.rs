//! quickapi - a JSON API scaffold on axum
//!
//! The interesting part is the per-request context layer between the
//! framework and the handlers:
//! - request bodies are captured once and replayable, so handlers can bind
//!   and re-bind input freely
//! - bearer-token identity is re-derived on demand, never cached
//! - typed input binding with optional self-validation
//! - bounded pagination extraction
//! - a response recorder feeding a panic-safe structured access log

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod request_context;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
