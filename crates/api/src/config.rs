use domain::models::TenantMode;
use serde::Deserialize;
use shared::jwt::JwtConfig;
use shared::url_safety::OutboundPolicy;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
    #[serde(default)]
    pub outbound: OutboundConfig,
    #[serde(default)]
    pub settings: SettingsCacheConfig,
    /// Fallback mail configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// JWT authentication configuration
    pub jwt: JwtAuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Public base URL of the web application. Its host counts as "own app"
    /// for payment redirects and unsafe redirects land on its root.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,

    /// Expose error details in responses. Never enable in production.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// How settings scopes are resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct TenancyConfig {
    #[serde(default)]
    pub mode: TenantMode,

    /// File whose absence means the installer has not finished. Empty
    /// disables the check.
    #[serde(default = "default_installed_marker_path")]
    pub installed_marker_path: String,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            mode: TenantMode::default(),
            installed_marker_path: default_installed_marker_path(),
        }
    }
}

/// Outbound HTTP client settings shared by every channel sender.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboundConfig {
    #[serde(default = "default_outbound_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_outbound_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    /// Permit loopback and private-network destinations. Local development only.
    #[serde(default)]
    pub allow_private_network: bool,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_outbound_timeout(),
            connect_timeout_secs: default_outbound_connect_timeout(),
            telegram_api_base: default_telegram_api_base(),
            allow_private_network: false,
        }
    }
}

impl OutboundConfig {
    pub fn policy(&self) -> OutboundPolicy {
        OutboundPolicy {
            allow_private_network: self.allow_private_network,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingsCacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for SettingsCacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Email delivery configuration. SMTP credentials come from tenant settings;
/// this only selects the transport and the fallback sender.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Email provider: smtp, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// Sender address used when the tenant has none
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name used when neither the template nor the tenant has one
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_email_provider(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// HS256 shared secret. Takes precedence over the RSA key pair when set.
    #[serde(default)]
    pub secret: String,

    /// RSA private key in PEM format for signing tokens
    #[serde(default)]
    pub private_key: String,

    /// RSA public key in PEM format for verifying tokens
    #[serde(default)]
    pub public_key: String,

    /// Access token expiration in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    /// Leeway in seconds for clock skew tolerance (default: 30)
    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

impl JwtAuthConfig {
    pub fn build(&self) -> Result<JwtConfig, ConfigValidationError> {
        if !self.secret.is_empty() {
            return Ok(JwtConfig::from_secret(
                &self.secret,
                self.access_token_expiry_secs,
                self.leeway_secs,
            ));
        }

        JwtConfig::from_rsa_pem(
            &self.private_key,
            &self.public_key,
            self.access_token_expiry_secs,
            self.leeway_secs,
        )
        .map_err(|e| ConfigValidationError::InvalidValue(format!("jwt: {}", e)))
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    60
}
fn default_app_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_installed_marker_path() -> String {
    "storage/installed".to_string()
}
fn default_outbound_timeout() -> u64 {
    30
}
fn default_outbound_connect_timeout() -> u64 {
    10
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_capacity() -> u64 {
    10_000
}
fn default_email_provider() -> String {
    "smtp".to_string()
}
fn default_sender_email() -> String {
    "noreply@taskly.app".to_string()
}
fn default_sender_name() -> String {
    "Taskly".to_string()
}
fn default_access_token_expiry() -> i64 {
    3600 // 1 hour
}
fn default_jwt_leeway() -> u64 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with TD__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TD").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 60
            app_base_url = "https://app.taskly.test"
            debug = false

            [database]
            url = ""
            max_connections = 20
            min_connections = 2

            [logging]
            level = "info"
            format = "json"

            [tenancy]
            mode = "saas"
            installed_marker_path = ""

            [outbound]
            request_timeout_secs = 30
            connect_timeout_secs = 10
            telegram_api_base = "https://api.telegram.org"
            allow_private_network = false

            [settings]
            cache_ttl_secs = 300
            cache_capacity = 10000

            [email]
            provider = "console"

            [jwt]
            secret = "test-secret"
            access_token_expiry_secs = 3600
            leeway_secs = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "TD__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if url::Url::parse(&self.server.app_base_url).is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "server.app_base_url is not a URL: {}",
                self.server.app_base_url
            )));
        }

        if !matches!(self.email.provider.as_str(), "smtp" | "console") {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Unknown email provider: {}",
                self.email.provider
            )));
        }

        if self.jwt.secret.is_empty()
            && (self.jwt.private_key.is_empty() || self.jwt.public_key.is_empty())
        {
            return Err(ConfigValidationError::MissingRequired(
                "TD__JWT__SECRET or both TD__JWT__PRIVATE_KEY and TD__JWT__PUBLIC_KEY must be set"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigValidationError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| {
                ConfigValidationError::InvalidValue(format!(
                    "Invalid socket address {}:{}",
                    self.server.host, self.server.port
                ))
            })
    }

    /// Host part of `server.app_base_url`.
    pub fn app_host(&self) -> String {
        url::Url::parse(&self.server.app_base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// True while the installer has not written its marker file.
    pub fn installation_pending(&self) -> bool {
        let marker = self.tenancy.installed_marker_path.trim();
        !marker.is_empty() && !Path::new(marker).exists()
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(cfg: &DatabaseConfig) -> Self {
        Self {
            url: cfg.url.clone(),
            max_connections: cfg.max_connections,
            min_connections: cfg.min_connections,
            connect_timeout_secs: cfg.connect_timeout_secs,
            idle_timeout_secs: cfg.idle_timeout_secs,
        }
    }
}
