use std::env;

use auth::PasswordCost;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Which identity provider backs authentication.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    External,
}

/// Provider selection plus the settings of each provider.
///
/// Only the section of the selected provider is required.
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub provider: ProviderKind,
    pub local: Option<LocalProviderConfig>,
    pub external: Option<ExternalProviderConfig>,
}

#[derive(Deserialize, Clone)]
pub struct LocalProviderConfig {
    /// Checked by the provider factory; left empty in files
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_expiration_hours")]
    pub access_token_expiration_hours: i64,
    #[serde(default = "default_refresh_token_expiration_hours")]
    pub refresh_token_expiration_hours: i64,
    #[serde(default)]
    pub password: PasswordCost,
}

#[derive(Deserialize, Clone)]
pub struct ExternalProviderConfig {
    pub base_url: String,
    pub anon_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for LocalProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProviderConfig")
            .field("jwt_secret", &"<redacted>")
            .field(
                "access_token_expiration_hours",
                &self.access_token_expiration_hours,
            )
            .field(
                "refresh_token_expiration_hours",
                &self.refresh_token_expiration_hours,
            )
            .field("password", &self.password)
            .finish()
    }
}

impl std::fmt::Debug for ExternalProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalProviderConfig")
            .field("base_url", &self.base_url)
            .field("anon_key", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_access_token_expiration_hours() -> i64 {
    24
}

fn default_refresh_token_expiration_hours() -> i64 {
    24 * 7
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, IDENTITY__PROVIDER, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: IDENTITY__EXTERNAL__ANON_KEY=... overrides identity.external.anon_key
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}
