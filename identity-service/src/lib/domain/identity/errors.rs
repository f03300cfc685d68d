use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for password policy violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("Password rejected by identity service: {0}")]
    Rejected(String),
}

/// Failures of the credential store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Email already exists: {0}")]
    EmailTaken(String),

    #[error("External subject already linked: {0}")]
    SubjectTaken(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Failures talking to the remote identity service, as classified by the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteIdentityError {
    #[error("Remote service rejected the credentials")]
    InvalidCredentials,

    #[error("Remote service rejected the token")]
    InvalidToken,

    #[error("Email already registered with remote service")]
    AlreadyRegistered,

    #[error("Remote service rejected the password: {0}")]
    WeakPassword(String),

    #[error("Remote service rejected the request: {0}")]
    Rejected(String),

    #[error("Remote service timed out after {0} ms")]
    Timeout(u128),

    #[error("Remote service unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected response from remote service: {0}")]
    Protocol(String),
}

/// Failures every identity provider reports.
///
/// Infrastructure variants carry no detail: the cause is logged where it is
/// classified and never reaches the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid password: {0}")]
    WeakSecret(#[from] SecretError),

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account is inactive")]
    UserInactive,

    #[error("Identity provider unavailable")]
    ProviderUnavailable,

    #[error("{operation} is not supported by the {provider} identity provider")]
    NotSupported {
        provider: &'static str,
        operation: &'static str,
    },

    #[error("Internal error")]
    Internal,
}

impl From<RepositoryError> for IdentityError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailTaken(_) => IdentityError::EmailAlreadyRegistered,
            RepositoryError::SubjectTaken(_) | RepositoryError::Database(_) => {
                tracing::error!(error = %err, "Credential store failure");
                IdentityError::Internal
            }
        }
    }
}
