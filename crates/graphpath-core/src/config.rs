//! graphpath Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Resolution engine tuning
    pub engine: EngineConfig,

    /// Schema and fixture locations
    pub storage: StorageConfig,

    /// Authentication settings
    pub auth: AuthConfig,

    /// Access rules keyed by resource signature
    pub access: Vec<AccessRule>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = parse_var("API_PORT", port)?;
        }

        // Storage
        if let Ok(path) = std::env::var("GRAPHPATH_SCHEMA") {
            config.storage.schema_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("GRAPHPATH_FIXTURE") {
            config.storage.fixture_path = Some(PathBuf::from(path));
        }

        // Engine
        if let Ok(size) = std::env::var("DEFAULT_PAGE_SIZE") {
            config.engine.default_page_size = parse_var("DEFAULT_PAGE_SIZE", size)?;
        }
        if let Ok(limit) = std::env::var("TRAVERSAL_NODE_LIMIT") {
            config.engine.traversal_node_limit = Some(parse_var("TRAVERSAL_NODE_LIMIT", limit)?);
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;

        // Only override if env values differ from defaults
        if env_config.server.host != ServerConfig::default().host {
            self.server.host = env_config.server.host;
        }
        if env_config.server.port != ServerConfig::default().port {
            self.server.port = env_config.server.port;
        }
        if env_config.engine.default_page_size != EngineConfig::default().default_page_size {
            self.engine.default_page_size = env_config.engine.default_page_size;
        }
        if env_config.engine.traversal_node_limit != EngineConfig::default().traversal_node_limit {
            self.engine.traversal_node_limit = env_config.engine.traversal_node_limit;
        }
        if env_config.storage.schema_path.is_some() {
            self.storage.schema_path = env_config.storage.schema_path;
        }
        if env_config.storage.fixture_path.is_some() {
            self.storage.fixture_path = env_config.storage.fixture_path;
        }

        // Always use env for sensitive values
        if env_config.auth.jwt_secret != AuthConfig::default().jwt_secret {
            self.auth.jwt_secret = env_config.auth.jwt_secret;
        }

        Ok(self)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors_enabled: true,
            cors_origins: vec![],
        }
    }
}

/// Resolution engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when only `page` is supplied
    pub default_page_size: usize,

    /// Upper bound for `pageSize`
    pub max_page_size: usize,

    /// Maximum number of nodes a relationship path traversal may expand
    pub traversal_node_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 1000,
            traversal_node_limit: Some(10_000),
        }
    }
}

/// Where the schema and the seed graph are loaded from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Schema TOML file
    pub schema_path: Option<PathBuf>,

    /// JSON graph fixture loaded at startup
    pub fixture_path: Option<PathBuf>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for Bearer tokens
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-key".to_string(),
        }
    }
}

/// Access flags for one resource signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessRule {
    /// Resource signature, e.g. `persons/companies`
    pub signature: String,

    /// Anonymous GET/HEAD/OPTIONS allowed
    pub public_read: bool,

    /// Anonymous POST/PUT/DELETE allowed
    pub public_write: bool,

    /// Authenticated GET/HEAD/OPTIONS allowed
    pub authenticated_read: bool,

    /// Authenticated POST/PUT/DELETE allowed
    pub authenticated_write: bool,

    /// When non-empty, authenticated access additionally requires one of these roles
    pub roles: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::GraphPathError {
    fn from(err: ConfigError) -> Self {
        crate::GraphPathError::Config(err.to_string())
    }
}
