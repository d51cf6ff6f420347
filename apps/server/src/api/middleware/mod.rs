//! Middleware stack for the API

pub mod access_log;
pub mod context;

// Re-export public API
pub use access_log::access_log_middleware;
pub use context::context_middleware;
