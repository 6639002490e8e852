//! Relay configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the relay can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address for the HTTP/WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:5000`
    pub http_addr: SocketAddr,

    /// Filesystem path of the notification database.
    /// Env: `DB_PATH`
    /// Default: `./skillswap.db`
    pub db_path: PathBuf,

    /// HMAC secret for validating bearer credentials (HS256).
    /// Env: `JWT_SECRET`
    /// Default: a dev-only placeholder (logged as a warning).
    pub jwt_secret: String,

    /// Allowed CORS origin for the web client.
    /// Env: `CLIENT_ORIGIN`
    /// Default: none (any origin is allowed; dev behavior).
    pub client_origin: Option<String>,
}

const DEV_SECRET: &str = "skillswap-dev-secret";

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 5000).into(),
            db_path: PathBuf::from("./skillswap.db"),
            jwt_secret: DEV_SECRET.to_string(),
            client_origin: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => config.jwt_secret = secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using dev-only default");
            }
        }

        if let Ok(origin) = std::env::var("CLIENT_ORIGIN") {
            if !origin.is_empty() {
                config.client_origin = Some(origin);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
