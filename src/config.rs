use serde::Deserialize;

use crate::services::favorites::{DEFAULT_MAX_FAVORITES, DEFAULT_RECOMMENDATION_LIMIT};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. The in-memory store is used when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Upper bound on pooled PostgreSQL connections
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of favorites a single user may hold
    #[serde(default = "default_max_favorites_per_user")]
    pub max_favorites_per_user: usize,

    /// Number of books returned alongside a new favorite
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_favorites_per_user() -> usize {
    DEFAULT_MAX_FAVORITES
}

fn default_recommendation_limit() -> usize {
    DEFAULT_RECOMMENDATION_LIMIT
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_empty() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.database_url, None);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.max_favorites_per_user, 20);
        assert_eq!(config.recommendation_limit, 5);
    }

    #[test]
    fn test_overrides_from_env() {
        let vars = vec![
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/shelf".to_string(),
            ),
            ("PORT".to_string(), "8080".to_string()),
            ("RECOMMENDATION_LIMIT".to_string(), "3".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/shelf")
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.recommendation_limit, 3);
    }
}
