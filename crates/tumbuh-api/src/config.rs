use std::env;

/// API server configuration loaded from environment variables
///
/// Pipeline settings come from the layered configuration; this only covers
/// the HTTP shell and storage selection.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub cors_origin: String,
    pub database_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3001, cors_origin: "http://localhost:3000".to_string(), database_url: None }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("TUMBUH_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(defaults.port);

        let cors_origin = env::var("TUMBUH_CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        Self { port, cors_origin, database_url }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Check if PostgreSQL storage is configured
    pub fn uses_postgres(&self) -> bool {
        self.database_url.is_some()
    }
}
