use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::errors::JwtError;

/// Purpose a self-issued token was minted for.
///
/// Access tokens authorize requests; refresh tokens can only be exchanged for
/// a new token pair. The codec never accepts one kind in place of the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by self-issued bearer tokens.
///
/// Standard RFC 7519 claims plus the token kind. The subject is always the
/// local user identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (local user identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// JWT ID (unique token identifier)
    pub jti: String,

    /// Token kind
    pub typ: TokenKind,

    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Create claims for a subject, expiring `lifetime` from now.
    ///
    /// # Arguments
    /// * `subject` - Local user identifier
    /// * `kind` - Access or refresh
    /// * `lifetime` - Time until the token expires
    ///
    /// # Returns
    /// Claims with sub, exp, iat, jti and typ set
    ///
    /// # Errors
    /// * `LifetimeOutOfRange` - Expiry is not a representable instant
    pub fn for_subject(
        subject: impl ToString,
        kind: TokenKind,
        lifetime: Duration,
    ) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(lifetime)
            .ok_or(JwtError::LifetimeOutOfRange)?;

        Ok(Self {
            sub: subject.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            typ: kind,
            iss: None,
        })
    }

    /// Set issuer.
    pub fn with_issuer(mut self, iss: impl ToString) -> Self {
        self.iss = Some(iss.to_string());
        self
    }

    /// Set expiration (Unix timestamp).
    pub fn with_expiration(mut self, exp: i64) -> Self {
        self.exp = exp;
        self
    }

    /// Seconds between issuance and expiry.
    pub fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}
