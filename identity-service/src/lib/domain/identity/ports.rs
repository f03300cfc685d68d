use async_trait::async_trait;

use crate::identity::errors::IdentityError;
use crate::identity::errors::RemoteIdentityError;
use crate::identity::errors::RepositoryError;
use crate::identity::models::AuthSession;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::RemoteSession;
use crate::identity::models::RemoteUser;
use crate::identity::models::SignUpOutcome;
use crate::identity::models::Synchronized;
use crate::identity::models::User;
use crate::identity::models::UserId;

/// Contract every authentication backend implements.
///
/// Exactly one implementation is selected at startup and shared by every
/// request. Identities returned always carry the local user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Short provider name used in logs and errors.
    fn provider_name(&self) -> &'static str;

    /// Create an account and sign it in.
    ///
    /// # Errors
    /// * `InvalidEmail` - Email is not syntactically valid
    /// * `WeakSecret` - Secret violates the password policy
    /// * `EmailAlreadyRegistered` - Email is taken
    /// * `ProviderUnavailable` - Remote service unreachable (external only)
    /// * `Internal` - Credential store failure
    async fn register(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError>;

    /// Authenticate with email and secret.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, wrong secret or malformed input
    /// * `UserInactive` - Credentials are valid but the account is deactivated
    /// * `ProviderUnavailable` - Remote service unreachable (external only)
    /// * `Internal` - Credential store failure
    async fn login(&self, email: &str, secret: &str) -> Result<AuthSession, IdentityError>;

    /// Resolve an access token to an identity.
    ///
    /// Malformed, expired, revoked and foreign tokens, and tokens of
    /// deactivated users, all yield `Ok(None)`.
    ///
    /// # Errors
    /// * `ProviderUnavailable` - Remote service unreachable (external only)
    /// * `Internal` - Credential store failure
    async fn verify_token(&self, access_token: &str) -> Result<Option<Identity>, IdentityError>;

    /// Look up the identity of a local user.
    async fn get_identity(&self, user_id: &UserId) -> Result<Option<Identity>, IdentityError>;

    /// Best-effort session invalidation.
    ///
    /// # Returns
    /// True if a server-side session was invalidated
    async fn logout(&self, access_token: &str) -> Result<bool, IdentityError>;

    /// Exchange a refresh token for a new token pair.
    async fn refresh_token(&self, _refresh_token: &str) -> Result<AuthSession, IdentityError> {
        Err(IdentityError::NotSupported {
            provider: self.provider_name(),
            operation: "refresh_token",
        })
    }

    /// Start a password reset. Answers true whether or not the email exists.
    async fn request_password_reset(&self, _email: &str) -> Result<bool, IdentityError> {
        Err(IdentityError::NotSupported {
            provider: self.provider_name(),
            operation: "request_password_reset",
        })
    }

    /// Complete a password reset with the token the user received.
    async fn confirm_password_reset(
        &self,
        _reset_token: &str,
        _new_secret: &str,
    ) -> Result<bool, IdentityError> {
        Err(IdentityError::NotSupported {
            provider: self.provider_name(),
            operation: "confirm_password_reset",
        })
    }
}

/// Persistence operations for local user records.
///
/// All writes are single-row statements keyed by the `email` and
/// `external_subject_id` uniqueness constraints.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `EmailTaken` - Email is already registered
    /// * `Database` - Database operation failed
    async fn create(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;

    async fn find_by_external_subject(
        &self,
        subject_id: &str,
    ) -> Result<Option<User>, RepositoryError>;

    /// Insert a user for an external identity, or link the existing row with
    /// the same email, in one atomic statement.
    ///
    /// Concurrent calls for the same identity converge on a single row.
    ///
    /// # Errors
    /// * `Database` - Database operation failed
    async fn upsert_external(
        &self,
        email: &EmailAddress,
        subject_id: &str,
    ) -> Result<Synchronized, RepositoryError>;

    /// Activate or deactivate an account.
    ///
    /// # Returns
    /// False if no such user exists
    async fn set_active(&self, id: &UserId, is_active: bool) -> Result<bool, RepositoryError>;
}

/// Remote identity service the external provider delegates to.
#[async_trait]
pub trait IdentityServiceClient: Send + Sync + 'static {
    async fn sign_up(&self, email: &str, password: &str)
        -> Result<SignUpOutcome, RemoteIdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteSession, RemoteIdentityError>;

    async fn refresh_session(&self, refresh_token: &str)
        -> Result<RemoteSession, RemoteIdentityError>;

    async fn get_user(&self, access_token: &str) -> Result<RemoteUser, RemoteIdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), RemoteIdentityError>;

    async fn recover(&self, email: &str) -> Result<(), RemoteIdentityError>;

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<RemoteUser, RemoteIdentityError>;
}
