use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Mount point for collection routes, e.g. "/api"
    pub prefix: String,
    /// Return the bare docs array from find-many instead of the paginated envelope
    pub simple_find: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret the bearer-token key is derived from
    pub secret: String,
    /// Collection users are loaded from when a token carries no collection claim
    pub user_collection: String,
    pub token_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Settings for the bundled in-memory engine the binary serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub collections: Vec<String>,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_PREFIX") {
            self.api.prefix = normalize_prefix(&v);
        }
        if let Ok(v) = env::var("API_SIMPLE_FIND") {
            self.api.simple_find = v.parse().unwrap_or(self.api.simple_find);
        }
        if let Some(port) = env::var("COLLECTION_REST_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }

        // Security overrides
        if let Ok(v) = env::var("ENGINE_SECRET") {
            self.security.secret = v;
        }
        if let Ok(v) = env::var("AUTH_USER_COLLECTION") {
            self.security.user_collection = v;
        }
        if let Ok(v) = env::var("SECURITY_TOKEN_EXPIRY_HOURS") {
            self.security.token_expiry_hours = v.parse().unwrap_or(self.security.token_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        // Engine overrides
        if let Ok(v) = env::var("ENGINE_COLLECTIONS") {
            self.engine.collections = split_list(&v);
        }
        if let (Ok(email), Ok(password)) = (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            self.engine.seed_admin = Some(SeedAdmin { email, password });
        }

        self
    }

    /// Checks that must hold before the server binds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.secret.is_empty() {
            return Err(ConfigError::Missing("ENGINE_SECRET"));
        }
        if self.environment == Environment::Production && self.security.secret == DEV_SECRET {
            return Err(ConfigError::Invalid(
                "the development secret cannot be used in production".to_string(),
            ));
        }
        if self.security.token_expiry_hours == 0 || self.security.token_expiry_hours > MAX_TOKEN_EXPIRY_HOURS {
            return Err(ConfigError::Invalid(format!(
                "SECURITY_TOKEN_EXPIRY_HOURS must be between 1 and {}, got {}",
                MAX_TOKEN_EXPIRY_HOURS, self.security.token_expiry_hours
            )));
        }
        if !self.engine.collections.contains(&self.security.user_collection) {
            return Err(ConfigError::Invalid(format!(
                "user collection '{}' is not one of the configured collections",
                self.security.user_collection
            )));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                prefix: "/api".to_string(),
                simple_find: false,
                port: 3000,
            },
            security: SecurityConfig {
                secret: DEV_SECRET.to_string(),
                user_collection: "users".to_string(),
                token_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            engine: EngineSettings {
                collections: vec!["users".to_string(), "posts".to_string()],
                seed_admin: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                prefix: "/api".to_string(),
                simple_find: false,
                port: 3000,
            },
            security: SecurityConfig {
                secret: String::new(),
                user_collection: "users".to_string(),
                token_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            engine: EngineSettings {
                collections: vec!["users".to_string(), "posts".to_string()],
                seed_admin: None,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                prefix: "/api".to_string(),
                simple_find: false,
                port: 3000,
            },
            security: SecurityConfig {
                secret: String::new(),
                user_collection: "users".to_string(),
                token_expiry_hours: 2,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            engine: EngineSettings {
                collections: vec!["users".to_string(), "posts".to_string()],
                seed_admin: None,
            },
        }
    }
}

/// Ten years
pub const MAX_TOKEN_EXPIRY_HOURS: u64 = 24 * 365 * 10;

const DEV_SECRET: &str = "collection-rest-development-secret";

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// "api", "/api/" and "/api" all become "/api"
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("/{}", trimmed)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.api.prefix, "/api");
        assert!(!config.api.simple_find);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("ENGINE_SECRET"))));

        let mut config = AppConfig::production();
        config.security.secret = DEV_SECRET.to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_user_collection_must_be_configured() {
        let mut config = AppConfig::development();
        config.security.user_collection = "admins".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_expiry_must_be_bounded() {
        let mut config = AppConfig::development();
        config.security.token_expiry_hours = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.security.token_expiry_hours = 3_000_000_000_000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.security.token_expiry_hours = MAX_TOKEN_EXPIRY_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("api"), "/api");
        assert_eq!(normalize_prefix("/api/"), "/api");
        assert_eq!(normalize_prefix("/v1/api"), "/v1/api");
        assert_eq!(normalize_prefix("/"), "");
    }
}
