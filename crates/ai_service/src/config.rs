//! Service configuration
//!
//! Resolution order: `config/<environment>.toml` when present, otherwise
//! built-in defaults, then `COACH_*` environment variable overrides.

use crate::ServiceError;
use coach_ai_core::DEFAULT_EXTENSION_LIMIT;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
}

impl Environment {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" | "stage" => Ok(Environment::Staging),
            "testing" | "test" => Ok(Environment::Testing),
            "development" | "dev" => Ok(Environment::Development),
            _ => Err(ServiceError::ConfigError(format!(
                "Unknown environment: {value}"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Testing => "testing",
        }
    }
}

/// Inference service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding model, metadata and manifest files
    pub model_dir: PathBuf,
    /// Directory holding preprocessing artifacts
    pub artifacts_dir: PathBuf,
    /// Refuse to start when the newest files of each kind disagree on bundle id
    pub strict_bundle: bool,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    /// Largest accepted request body in bytes
    pub max_body_bytes: u64,
    /// Unseen categories each encoder may append before overflowing
    pub max_vocabulary_extensions: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from("models"),
            artifacts_dir: PathBuf::from("processed_datasets"),
            strict_bundle: false,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 64 * 1024,
            max_vocabulary_extensions: DEFAULT_EXTENSION_LIMIT,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.max_body_bytes == 0 {
            return Err(ServiceError::ConfigError(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        for origin in &self.cors_origins {
            if origin != "*" && !is_valid_origin(origin) {
                return Err(ServiceError::ConfigError(format!(
                    "Invalid CORS origin: {origin}"
                )));
            }
        }
        Ok(())
    }

    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// `scheme://host[:port]` with nothing after the authority
fn is_valid_origin(origin: &str) -> bool {
    match origin.split_once("://") {
        Some((scheme, authority)) => {
            matches!(scheme, "http" | "https")
                && !authority.is_empty()
                && !authority.contains('/')
        }
        None => false,
    }
}

/// Configuration manager
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ServiceConfig,
    environment: Environment,
}

impl ConfigManager {
    /// Detect the environment, load its file and apply env overrides
    pub fn new() -> Result<Self, ServiceError> {
        let environment = Self::detect_environment()?;
        let path = PathBuf::from(format!("config/{}.toml", environment.name()));
        let mut config = if path.exists() {
            Self::load_config_from_file(&path)?
        } else {
            ServiceConfig::default()
        };

        Self::apply_overrides(&mut config, |key| env::var(key).ok())?;
        config.validate()?;

        Ok(Self {
            config,
            environment,
        })
    }

    pub fn get_config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn get_environment(&self) -> Environment {
        self.environment
    }

    fn detect_environment() -> Result<Environment, ServiceError> {
        let value = env::var("COACH_ENV")
            .or_else(|_| env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "development".to_string());
        Environment::parse(&value)
    }

    /// Load configuration from a TOML file
    pub fn load_config_from_file(path: &Path) -> Result<ServiceConfig, ServiceError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServiceError::Io(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: ServiceConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COACH_*` overrides read through `lookup`
    pub fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("COACH_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("COACH_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ServiceError::ConfigError(format!("Invalid COACH_PORT: {port}")))?;
        }
        if let Some(dir) = lookup("COACH_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("COACH_ARTIFACTS_DIR") {
            config.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(strict) = lookup("COACH_STRICT_BUNDLE") {
            config.strict_bundle = matches!(
                strict.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(limit) = lookup("COACH_MAX_VOCABULARY_EXTENSIONS") {
            config.max_vocabulary_extensions = limit.trim().parse().map_err(|_| {
                ServiceError::ConfigError(format!(
                    "Invalid COACH_MAX_VOCABULARY_EXTENSIONS: {limit}"
                ))
            })?;
        }
        if let Some(origins) = lookup("COACH_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        Ok(())
    }
}
