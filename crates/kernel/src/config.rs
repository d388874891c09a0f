//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::exposure::config::parse_boolish;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Public site URL, base of API endpoint URLs.
    pub site_url: String,

    /// PostgreSQL connection URL. When None, content is held in memory.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// YAML fixture seeding the in-memory content store.
    pub content_fixture: Option<PathBuf>,

    /// Bearer token identifying privileged clients. When None, no client is
    /// privileged.
    pub admin_token: Option<String>,

    /// Serve the HTML data dump to privileged browser clients (default: true).
    pub debug_dump: bool,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let database_url = non_empty_var("DATABASE_URL");

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let content_fixture = non_empty_var("CONTENT_FIXTURE").map(PathBuf::from);

        let admin_token = non_empty_var("ADMIN_TOKEN");

        let debug_dump = env::var("DEBUG_DUMP")
            .map(|v| parse_boolish(&v))
            .unwrap_or(true);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            site_url,
            database_url,
            database_max_connections,
            content_fixture,
            admin_token,
            debug_dump,
            cors_allowed_origins,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            site_url: "http://localhost:3000".to_string(),
            database_url: None,
            database_max_connections: 10,
            content_fixture: None,
            admin_token: None,
            debug_dump: true,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Trimmed value of `name`, or None when unset or blank.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
