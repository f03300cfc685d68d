use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::identity::errors::EmailError;
use crate::identity::errors::SecretError;
use crate::identity::errors::UserIdError;

/// Stored in place of a password hash for accounts managed by the external
/// provider. It is not a PHC string, so no local password check can succeed
/// against it.
pub const EXTERNAL_CREDENTIAL_SENTINEL: &str = "!external-identity";

/// Local user record.
///
/// The authoritative row every ownership relationship points at, whichever
/// provider authenticated the user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub credential_hash: String,
    pub is_active: bool,
    pub external_subject_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new active account owning a local credential.
    pub fn new_local(email: EmailAddress, credential_hash: String) -> Self {
        Self {
            id: UserId::new(),
            email,
            credential_hash,
            is_active: true,
            external_subject_id: None,
            created_at: Utc::now(),
        }
    }

    /// Build a new active account managed by the external provider.
    pub fn new_external(email: EmailAddress, external_subject_id: String) -> Self {
        Self {
            id: UserId::new(),
            email,
            credential_hash: EXTERNAL_CREDENTIAL_SENTINEL.to_string(),
            is_active: true,
            external_subject_id: Some(external_subject_id),
            created_at: Utc::now(),
        }
    }

    /// Hash a local password check may be run against, if any.
    pub fn local_credential(&self) -> Option<&str> {
        if self.credential_hash == EXTERNAL_CREDENTIAL_SENTINEL || self.credential_hash.is_empty()
        {
            None
        } else {
            Some(self.credential_hash.as_str())
        }
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 parser and stored trimmed and lower-cased, so
/// equality on this type is the case-insensitive comparison the `users`
/// table enforces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated, normalized email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: &str) -> Result<Self, EmailError> {
        let normalized = email.trim().to_lowercase();
        email_address::EmailAddress::from_str(&normalized)
            .map(|_| EmailAddress(normalized))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext secret that satisfies the password policy.
///
/// Never persisted and never printed; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub const MIN_LENGTH: usize = 8;
    pub const MAX_LENGTH: usize = 128;

    /// # Errors
    /// * `TooShort` - Fewer than 8 characters
    /// * `TooLong` - More than 128 characters
    pub fn new(secret: &str) -> Result<Self, SecretError> {
        let length = secret.chars().count();
        if length < Self::MIN_LENGTH {
            Err(SecretError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(SecretError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(secret.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Verified, provider-agnostic answer to "who is making this request".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: EmailAddress,
    pub is_active: bool,
    /// Remote verification flag, only reported by the external provider
    /// when it has just asked the remote service (login, registration,
    /// token verification). `false` everywhere else, including on
    /// lookups by id.
    pub email_verified: bool,
    pub provider_subject_id: Option<String>,
}

impl Identity {
    /// Identity for a local row, as seen by the local provider.
    pub fn from_local(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            email_verified: false,
            provider_subject_id: None,
        }
    }

    /// Identity for a synchronized row, carrying the remote verification flag.
    pub fn from_synchronized(user: &User, email_verified: bool) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            is_active: user.is_active,
            email_verified,
            provider_subject_id: user.external_subject_id.clone(),
        }
    }
}

impl Serialize for UserId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl Serialize for EmailAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Bearer credentials handed to a client after authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires, when the issuer says
    pub expires_in: Option<i64>,
}

/// Outcome of register, login and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub identity: Identity,
    pub tokens: TokenPair,
}

/// Result of the atomic synchronization write.
#[derive(Debug, Clone, PartialEq)]
pub struct Synchronized {
    pub user: User,
    /// True when the row was inserted, false when an existing row was linked
    pub created: bool,
}

/// User as reported by the remote identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser {
    pub subject_id: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

/// Session issued by the remote identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub user: RemoteUser,
}

impl RemoteSession {
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_in: self.expires_in,
        }
    }
}

/// Remote sign-up answer; the session is absent when the service requires
/// email confirmation before the first login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: RemoteUser,
    pub session: Option<RemoteSession>,
}
