//! Configuration loading for the API server.
//!
//! Layered sources, lowest precedence first: built-in defaults, an optional
//! `config.{toml,yaml,json}` file next to the binary, then environment
//! variables with the `QUICKAPI` prefix (`__` separates sections, e.g.
//! `QUICKAPI__SERVER__PORT=8080`). A `.env` file is honored via dotenvy.

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for request bodies, in bytes. Also bounds the body cache.
    pub max_request_body_size: usize,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for verifying bearer tokens. Read once at startup.
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// One of `daily`, `hourly`, `minutely`, `never`.
    pub file_rotation: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let loaded = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.max_request_body_size", 2_097_152_i64)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("auth.jwt_secret", "")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("logging.file_enabled", false)?
            .set_default("logging.file_directory", "logs")?
            .set_default("logging.file_prefix", "quickapi")?
            .set_default("logging.file_rotation", "daily")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("QUICKAPI").separator("__"))
            .build()?;

        Ok(loaded.try_deserialize()?)
    }

    /// Checks invariants that defaults alone cannot guarantee.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.auth.jwt_secret.is_empty() {
            return Err("auth.jwt_secret must be set".to_string());
        }
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.server.max_request_body_size == 0 {
            return Err("server.max_request_body_size must be non-zero".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }
}

#[cfg(test)]
impl Config {
    /// A fully-populated config for tests; no file or env access.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_request_body_size: 2_097_152,
                cors_origins: Vec::new(),
            },
            auth: AuthConfig {
                jwt_secret: jwt_secret.to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                file_enabled: false,
                file_directory: "logs".to_string(),
                file_prefix: "quickapi".to_string(),
                file_rotation: "daily".to_string(),
            },
        }
    }
}
