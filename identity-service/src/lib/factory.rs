use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenLifetimes;
use thiserror::Error;

use crate::config::ExternalProviderConfig;
use crate::config::IdentityConfig;
use crate::config::LocalProviderConfig;
use crate::config::ProviderKind;
use crate::identity::external::ExternalIdentityProvider;
use crate::identity::local::LocalIdentityProvider;
use crate::identity::ports::IdentityProvider;
use crate::identity::ports::UserRepository;
use crate::outbound::remote::GoTrueClient;

/// Minimum HS256 signing key length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Longest accepted token lifetime, ten years.
pub const MAX_TOKEN_LIFETIME_HOURS: i64 = 24 * 365 * 10;

/// Configuration the selected provider cannot start with.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("identity.{section} must be set when identity.provider is \"{section}\"")]
    MissingSection { section: &'static str },

    #[error("identity.{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Build the identity provider selected by `config`.
///
/// Every setting of the selected provider is checked here, so a bad
/// configuration stops startup instead of failing the first request. The
/// section of the provider that is not selected is ignored.
///
/// # Arguments
/// * `config` - Identity section of the service configuration
/// * `repository` - Credential store shared with the provider
///
/// # Errors
/// * `MissingSection` - Selected provider has no configuration section
/// * `Invalid` - A setting is missing, malformed or out of range
pub fn build_identity_provider<UR>(
    config: &IdentityConfig,
    repository: Arc<UR>,
) -> Result<Arc<dyn IdentityProvider>, ConfigurationError>
where
    UR: UserRepository,
{
    let provider: Arc<dyn IdentityProvider> = match config.provider {
        ProviderKind::Local => {
            let local = config
                .local
                .as_ref()
                .ok_or(ConfigurationError::MissingSection { section: "local" })?;
            Arc::new(build_local(local, repository)?)
        }
        ProviderKind::External => {
            let external = config
                .external
                .as_ref()
                .ok_or(ConfigurationError::MissingSection { section: "external" })?;
            Arc::new(build_external(external, repository)?)
        }
    };

    tracing::info!(provider = provider.provider_name(), "Identity provider configured");

    Ok(provider)
}

fn build_local<UR>(
    config: &LocalProviderConfig,
    repository: Arc<UR>,
) -> Result<LocalIdentityProvider<UR>, ConfigurationError>
where
    UR: UserRepository,
{
    if config.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
        return Err(invalid(
            "local.jwt_secret",
            format!("must be at least {} bytes", MIN_JWT_SECRET_BYTES),
        ));
    }
    let access = token_lifetime(
        "local.access_token_expiration_hours",
        config.access_token_expiration_hours,
    )?;
    let refresh = token_lifetime(
        "local.refresh_token_expiration_hours",
        config.refresh_token_expiration_hours,
    )?;

    let hasher = PasswordHasher::with_cost(config.password)
        .map_err(|e| invalid("local.password", e.to_string()))?;
    let cost = hasher.cost();
    tracing::info!(
        memory_kib = cost.memory_kib,
        iterations = cost.iterations,
        parallelism = cost.parallelism,
        "Local provider password cost"
    );
    let authenticator = Authenticator::with_password_hasher(config.jwt_secret.as_bytes(), hasher)
        .map_err(|e| invalid("local.password", e.to_string()))?
        .with_token_lifetimes(TokenLifetimes { access, refresh });

    Ok(LocalIdentityProvider::new(repository, Arc::new(authenticator)))
}

fn token_lifetime(
    field: &'static str,
    hours: i64,
) -> Result<chrono::Duration, ConfigurationError> {
    if hours <= 0 {
        return Err(invalid(field, "must be positive"));
    }
    if hours > MAX_TOKEN_LIFETIME_HOURS {
        return Err(invalid(
            field,
            format!("must be at most {} hours", MAX_TOKEN_LIFETIME_HOURS),
        ));
    }

    chrono::Duration::try_hours(hours).ok_or_else(|| invalid(field, "out of range"))
}

fn build_external<UR>(
    config: &ExternalProviderConfig,
    repository: Arc<UR>,
) -> Result<ExternalIdentityProvider<UR, GoTrueClient>, ConfigurationError>
where
    UR: UserRepository,
{
    let base_url = reqwest::Url::parse(&config.base_url)
        .map_err(|e| invalid("external.base_url", e.to_string()))?;
    if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
        return Err(invalid("external.base_url", "must be an http(s) URL with a host"));
    }
    if config.anon_key.trim().is_empty() {
        return Err(invalid("external.anon_key", "must not be empty"));
    }
    if config.timeout_seconds == 0 {
        return Err(invalid("external.timeout_seconds", "must be positive"));
    }

    let client = GoTrueClient::new(
        &config.base_url,
        &config.anon_key,
        Duration::from_secs(config.timeout_seconds),
    )
    .map_err(|e| invalid("external", e.to_string()))?;

    Ok(ExternalIdentityProvider::new(repository, Arc::new(client)))
}
