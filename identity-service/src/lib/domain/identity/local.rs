use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::OwnershipToken;
use auth::TokenKind;

use crate::identity::errors::IdentityError;
use crate::identity::models::AuthSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::Secret;
use crate::identity::models::TokenPair;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::IdentityProvider;
use crate::identity::ports::UserRepository;

/// Identity provider backed by the local credential store.
///
/// Secrets are hashed with Argon2 and sessions are self-issued signed
/// tokens. All hashing runs on the blocking thread pool.
pub struct LocalIdentityProvider<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
}

impl<UR> LocalIdentityProvider<UR>
where
    UR: UserRepository,
{
    /// Create a local provider.
    ///
    /// # Arguments
    /// * `repository` - Credential store
    /// * `authenticator` - Password hasher and token codec
    ///
    /// # Returns
    /// Configured provider instance
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>) -> Self {
        Self {
            repository,
            authenticator,
        }
    }

    /// Mint a delete token for an anonymous upload.
    ///
    /// Only the hash is meant to be stored; the plaintext goes back to the
    /// uploader once.
    pub fn issue_ownership_token(&self) -> OwnershipToken {
        OwnershipToken::generate()
    }

    /// Check a presented delete token against the stored hash.
    pub fn verify_ownership_token(&self, token: &str, stored_hash: &str) -> bool {
        auth::verify_ownership_token(token, stored_hash)
    }

    async fn hash_secret(&self, secret: Secret) -> Result<String, IdentityError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(secret.expose()))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing task failed");
                IdentityError::Internal
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                IdentityError::Internal
            })
    }

    /// Runs exactly one Argon2 verification whether or not `stored_hash`
    /// is usable.
    async fn check_secret(
        &self,
        secret: &str,
        stored_hash: Option<String>,
    ) -> Result<(), IdentityError> {
        let authenticator = Arc::clone(&self.authenticator);
        let secret = secret.to_string();

        tokio::task::spawn_blocking(move || {
            authenticator.verify_credentials(&secret, stored_hash.as_deref())
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password verification task failed");
            IdentityError::Internal
        })?
        .map_err(|e| match e {
            AuthenticationError::InvalidCredentials => IdentityError::InvalidCredentials,
            other => {
                tracing::error!(error = %other, "Password verification failed");
                IdentityError::Internal
            }
        })
    }

    fn issue_session(&self, user: &User) -> Result<AuthSession, IdentityError> {
        let tokens = self
            .authenticator
            .issue_tokens(&user.id.to_string())
            .map_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Token issuance failed");
                IdentityError::Internal
            })?;

        Ok(AuthSession {
            identity: Identity::from_local(user),
            tokens: TokenPair {
                access_token: tokens.access_token,
                refresh_token: Some(tokens.refresh_token),
                expires_in: Some(tokens.expires_in),
            },
        })
    }
}

#[async_trait]
impl<UR> IdentityProvider for LocalIdentityProvider<UR>
where
    UR: UserRepository,
{
    fn provider_name(&self) -> &'static str {
        "local"
    }

    async fn register(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError> {
        let email = EmailAddress::new(email)?;
        let secret = Secret::new(secret)?;

        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailAlreadyRegistered);
        }

        let credential_hash = self.hash_secret(secret).await?;

        // A concurrent registration can still win between the lookup and
        // the insert; the unique constraint reports it as EmailTaken.
        let user = self
            .repository
            .create(User::new_local(email, credential_hash))
            .await?;

        tracing::info!(user_id = %user.id, provider = "local", "User registered");

        self.issue_session(&user)
    }

    async fn login(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError> {
        let user = match EmailAddress::new(email) {
            Ok(email) => self.repository.find_by_email(&email).await?,
            Err(_) => None,
        };

        let stored_hash = user
            .as_ref()
            .and_then(User::local_credential)
            .map(str::to_string);

        self.check_secret(secret, stored_hash).await?;

        let user = user.ok_or(IdentityError::InvalidCredentials)?;
        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login refused for inactive user");
            return Err(IdentityError::UserInactive);
        }

        self.issue_session(&user)
    }

    async fn verify_token(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        let claims = match self
            .authenticator
            .validate_token(access_token, TokenKind::Access)
        {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Access token rejected");
                return Ok(None);
            }
        };

        let Ok(user_id) = UserId::from_string(&claims.sub) else {
            tracing::debug!(subject = %claims.sub, "Access token subject is not a user id");
            return Ok(None);
        };

        match self.repository.find_by_id(&user_id).await? {
            Some(user) if user.is_active => Ok(Some(Identity::from_local(&user))),
            Some(user) => {
                tracing::debug!(user_id = %user.id, "Access token belongs to inactive user");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn get_identity(&self, user_id: &UserId) -> Result<Option<Identity>, IdentityError> {
        Ok(self
            .repository
            .find_by_id(user_id)
            .await?
            .as_ref()
            .map(Identity::from_local))
    }

    async fn logout(&self, _access_token: &str) -> Result<bool, IdentityError> {
        // Self-issued tokens stay valid until they expire.
        Ok(false)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthSession, IdentityError> {
        let claims = self
            .authenticator
            .validate_token(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                IdentityError::InvalidCredentials
            })?;

        let user_id =
            UserId::from_string(&claims.sub).map_err(|_| IdentityError::InvalidCredentials)?;

        let user = self
            .repository
            .find_by_id(&user_id)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !user.is_active {
            return Err(IdentityError::UserInactive);
        }

        self.issue_session(&user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<bool, IdentityError> {
        // No delivery channel is configured for local accounts; the answer
        // is the same for known and unknown emails.
        tracing::debug!(
            valid_email = EmailAddress::new(email).is_ok(),
            "Password reset requested for local provider"
        );
        Ok(true)
    }
}
