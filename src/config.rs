// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! All configuration lives in an explicit `Config` passed into the
//! application state at startup; components never read ambient env vars
//! at request time.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCS bucket for slope and comment images
    pub storage_bucket: String,
    /// Server port
    pub port: u16,

    /// Signing secret for short-lived access tokens
    pub access_token_secret: Vec<u8>,
    /// Signing secret for long-lived refresh tokens (distinct key)
    pub refresh_token_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .map_err(|_| ConfigError::Missing("STORAGE_BUCKET"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
        })
    }

    /// Default config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-bucket".to_string(),
            port: 8080,
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("STORAGE_BUCKET", "slope-images");
        env::set_var("ACCESS_TOKEN_SECRET", "test_access_key_32_bytes_minimum");
        env::set_var("REFRESH_TOKEN_SECRET", "test_refresh_key_32_bytes_minimu");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.storage_bucket, "slope-images");
        assert_eq!(config.port, 8080);
        assert_ne!(config.access_token_secret, config.refresh_token_secret);
    }
}
