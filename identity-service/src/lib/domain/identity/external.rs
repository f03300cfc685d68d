use std::sync::Arc;

use async_trait::async_trait;

use crate::identity::errors::IdentityError;
use crate::identity::errors::RemoteIdentityError;
use crate::identity::errors::SecretError;
use crate::identity::models::AuthSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::RemoteSession;
use crate::identity::models::RemoteUser;
use crate::identity::models::Secret;
use crate::identity::models::User;
use crate::identity::models::UserId;
use crate::identity::ports::IdentityProvider;
use crate::identity::ports::IdentityServiceClient;
use crate::identity::ports::UserRepository;

/// Identity provider delegating authentication to a remote identity service.
///
/// Every identity the remote service vouches for is mirrored into the local
/// `users` table, so callers always see the local user id. The mirror row
/// carries no usable local credential.
pub struct ExternalIdentityProvider<UR, IC>
where
    UR: UserRepository,
    IC: IdentityServiceClient,
{
    repository: Arc<UR>,
    client: Arc<IC>,
}

impl<UR, IC> ExternalIdentityProvider<UR, IC>
where
    UR: UserRepository,
    IC: IdentityServiceClient,
{
    /// Create an external provider.
    ///
    /// # Arguments
    /// * `repository` - Local credential store used for synchronization
    /// * `client` - Remote identity service client
    pub fn new(repository: Arc<UR>, client: Arc<IC>) -> Self {
        Self { repository, client }
    }

    /// Map a remote identity onto its local user row.
    ///
    /// Looks the row up by remote subject first. Otherwise a single atomic
    /// upsert either links the row that already owns the email (an account
    /// created before the switch to this provider) or creates a new one.
    ///
    /// # Errors
    /// * `ProviderUnavailable` - Remote identity carries no usable email
    /// * `Internal` - Credential store failure
    pub async fn synchronize(&self, remote: &RemoteUser) -> Result<User, IdentityError> {
        if let Some(user) = self
            .repository
            .find_by_external_subject(&remote.subject_id)
            .await?
        {
            return Ok(user);
        }

        let email = remote
            .email
            .as_deref()
            .and_then(|email| EmailAddress::new(email).ok())
            .ok_or_else(|| {
                tracing::error!(
                    subject_id = %remote.subject_id,
                    "Remote identity has no usable email, cannot synchronize"
                );
                IdentityError::ProviderUnavailable
            })?;

        let synchronized = self
            .repository
            .upsert_external(&email, &remote.subject_id)
            .await?;

        if synchronized.created {
            tracing::info!(
                user_id = %synchronized.user.id,
                subject_id = %remote.subject_id,
                "Created local user for external identity"
            );
        } else {
            tracing::info!(
                user_id = %synchronized.user.id,
                subject_id = %remote.subject_id,
                "Linked existing local user to external identity"
            );
        }

        Ok(synchronized.user)
    }

    async fn establish_session(&self, session: RemoteSession) -> Result<AuthSession, IdentityError> {
        let user = self.synchronize(&session.user).await?;

        if !user.is_active {
            tracing::info!(user_id = %user.id, "Sign-in refused for inactive user");
            return Err(IdentityError::UserInactive);
        }

        Ok(AuthSession {
            identity: Identity::from_synchronized(&user, session.user.email_verified),
            tokens: session.token_pair(),
        })
    }
}

/// Classify a remote failure for a credential-bearing call.
fn remote_failure(operation: &'static str, err: RemoteIdentityError) -> IdentityError {
    match &err {
        RemoteIdentityError::InvalidCredentials
        | RemoteIdentityError::InvalidToken
        | RemoteIdentityError::Rejected(_) => IdentityError::InvalidCredentials,
        RemoteIdentityError::AlreadyRegistered => IdentityError::EmailAlreadyRegistered,
        RemoteIdentityError::WeakPassword(reason) => {
            IdentityError::WeakSecret(SecretError::Rejected(reason.clone()))
        }
        RemoteIdentityError::Timeout(_) | RemoteIdentityError::Unavailable(_) => {
            tracing::warn!(operation, error = %err, "Identity service unavailable");
            IdentityError::ProviderUnavailable
        }
        RemoteIdentityError::Protocol(_) => {
            tracing::error!(operation, error = %err, "Identity service misbehaved");
            IdentityError::ProviderUnavailable
        }
    }
}

#[async_trait]
impl<UR, IC> IdentityProvider for ExternalIdentityProvider<UR, IC>
where
    UR: UserRepository,
    IC: IdentityServiceClient,
{
    fn provider_name(&self) -> &'static str {
        "external"
    }

    async fn register(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError> {
        let email = EmailAddress::new(email)?;
        let secret = Secret::new(secret)?;

        let outcome = self
            .client
            .sign_up(email.as_str(), secret.expose())
            .await
            .map_err(|e| remote_failure("register", e))?;

        let session = match outcome.session {
            Some(session) => session,
            None => {
                tracing::debug!(
                    subject_id = %outcome.user.subject_id,
                    "Sign-up returned no session, signing in"
                );
                self.client
                    .sign_in_with_password(email.as_str(), secret.expose())
                    .await
                    .map_err(|e| remote_failure("register", e))?
            }
        };

        let session = self.establish_session(session).await?;
        tracing::info!(
            user_id = %session.identity.user_id,
            provider = "external",
            "User registered"
        );

        Ok(session)
    }

    async fn login(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError> {
        let Ok(email) = EmailAddress::new(email) else {
            return Err(IdentityError::InvalidCredentials);
        };

        let session = self
            .client
            .sign_in_with_password(email.as_str(), secret)
            .await
            .map_err(|e| remote_failure("login", e))?;

        self.establish_session(session).await
    }

    async fn verify_token(&self, access_token: &str) -> Result<Option<Identity>, IdentityError> {
        if access_token.trim().is_empty() {
            return Ok(None);
        }

        let remote = match self.client.get_user(access_token).await {
            Ok(remote) => remote,
            Err(
                RemoteIdentityError::InvalidToken
                | RemoteIdentityError::InvalidCredentials
                | RemoteIdentityError::Rejected(_),
            ) => return Ok(None),
            Err(e) => return Err(remote_failure("verify_token", e)),
        };

        let user = self.synchronize(&remote).await?;
        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Access token belongs to inactive user");
            return Ok(None);
        }

        Ok(Some(Identity::from_synchronized(&user, remote.email_verified)))
    }

    // Verification state is not stored locally, so a lookup by id cannot report it.
    async fn get_identity(&self, user_id: &UserId) -> Result<Option<Identity>, IdentityError> {
        Ok(self
            .repository
            .find_by_id(user_id)
            .await?
            .map(|user| Identity::from_synchronized(&user, false)))
    }

    async fn logout(&self, access_token: &str) -> Result<bool, IdentityError> {
        if access_token.trim().is_empty() {
            return Ok(false);
        }

        match self.client.sign_out(access_token).await {
            Ok(()) => Ok(true),
            Err(RemoteIdentityError::InvalidToken) => Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "Remote sign-out failed");
                Ok(false)
            }
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<AuthSession, IdentityError> {
        let session = self
            .client
            .refresh_session(refresh_token)
            .await
            .map_err(|e| remote_failure("refresh_token", e))?;

        self.establish_session(session).await
    }

    async fn request_password_reset(&self, email: &str) -> Result<bool, IdentityError> {
        let Ok(email) = EmailAddress::new(email) else {
            return Ok(true);
        };

        if let Err(e) = self.client.recover(email.as_str()).await {
            tracing::warn!(error = %e, "Password reset request was not accepted");
        }

        Ok(true)
    }

    async fn confirm_password_reset(
        &self,
        reset_token: &str,
        new_secret: &str,
    ) -> Result<bool, IdentityError> {
        let new_secret = Secret::new(new_secret)?;

        match self
            .client
            .update_password(reset_token, new_secret.expose())
            .await
        {
            Ok(remote) => {
                tracing::info!(subject_id = %remote.subject_id, "Password reset completed");
                Ok(true)
            }
            Err(RemoteIdentityError::InvalidToken | RemoteIdentityError::InvalidCredentials) => {
                Ok(false)
            }
            Err(e) => Err(remote_failure("confirm_password_reset", e)),
        }
    }
}
