use chrono::Duration;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::jwt::TokenKind;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Plaintext checked against the reference hash when there is no real hash
/// to check against. Its value is irrelevant; only the cost matters.
const REFERENCE_PASSWORD: &str = "reference-password-for-uniform-timing";

/// Lifetimes of the tokens issued by an [`Authenticator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(24),
            refresh: Duration::hours(24 * 7),
        }
    }
}

/// Authentication coordinator combining password verification and JWT generation.
///
/// Owns a reference hash produced with the same cost as real hashes, so a
/// credential check costs one full Argon2 verification whether or not the
/// account exists.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    lifetimes: TokenLifetimes,
    reference_hash: String,
}

/// Token pair minted for a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// Create a new authenticator with the default Argon2 cost.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    ///
    /// # Errors
    /// * `PasswordError` - The reference hash could not be computed
    pub fn new(jwt_secret: &[u8]) -> Result<Self, PasswordError> {
        Self::with_password_hasher(jwt_secret, PasswordHasher::new())
    }

    /// Create an authenticator around a configured password hasher.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `password_hasher` - Hasher carrying the configured Argon2 cost
    ///
    /// # Errors
    /// * `PasswordError` - The reference hash could not be computed
    pub fn with_password_hasher(
        jwt_secret: &[u8],
        password_hasher: PasswordHasher,
    ) -> Result<Self, PasswordError> {
        let reference_hash = password_hasher.hash(REFERENCE_PASSWORD)?;

        Ok(Self {
            password_hasher,
            jwt_handler: JwtHandler::new(jwt_secret),
            lifetimes: TokenLifetimes::default(),
            reference_hash,
        })
    }

    /// Override the access and refresh token lifetimes.
    pub fn with_token_lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a password against a stored hash.
    ///
    /// When `stored_hash` is absent or is not a verifiable PHC string (an
    /// account managed elsewhere), the password is checked against the
    /// reference hash instead and the result discarded, so every rejection
    /// takes the same time.
    ///
    /// # Errors
    /// * `InvalidCredentials` - No usable hash, or the password does not match
    /// * `PasswordError` - Verification itself failed
    pub fn verify_credentials(
        &self,
        password: &str,
        stored_hash: Option<&str>,
    ) -> Result<(), AuthenticationError> {
        let stored_hash = match stored_hash.filter(|hash| PasswordHasher::is_verifiable(hash)) {
            Some(hash) => hash,
            None => {
                self.burn_verification(password);
                return Err(AuthenticationError::InvalidCredentials);
            }
        };

        if self.password_hasher.verify(password, stored_hash)? {
            Ok(())
        } else {
            Err(AuthenticationError::InvalidCredentials)
        }
    }

    /// Spend one verification worth of work without checking anything.
    pub fn burn_verification(&self, password: &str) {
        let _ = self.password_hasher.verify(password, &self.reference_hash);
    }

    /// Issue an access and a refresh token for `subject`.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_tokens(&self, subject: &str) -> Result<IssuedTokens, JwtError> {
        let access_claims =
            Claims::for_subject(subject, TokenKind::Access, self.lifetimes.access)?;
        let refresh_claims =
            Claims::for_subject(subject, TokenKind::Refresh, self.lifetimes.refresh)?;

        Ok(IssuedTokens {
            access_token: self.jwt_handler.encode(&access_claims)?,
            refresh_token: self.jwt_handler.encode(&refresh_claims)?,
            expires_in: access_claims.lifetime_seconds(),
        })
    }

    /// Generate a token from explicit claims.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn generate_token(&self, claims: &Claims) -> Result<String, JwtError> {
        self.jwt_handler.encode(claims)
    }

    /// Validate a token and check it was minted for `expected` use.
    ///
    /// # Errors
    /// * `TokenExpired`, `InvalidToken`, `DecodingFailed` - Token rejected by the codec
    /// * `WrongKind` - Token is valid but of the other kind
    pub fn validate_token(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let claims: Claims = self.jwt_handler.decode(token)?;

        if claims.typ != expected {
            return Err(JwtError::WrongKind {
                expected: format!("{:?}", expected).to_lowercase(),
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::password::PasswordCost;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    fn authenticator() -> Authenticator {
        let hasher = PasswordHasher::with_cost(PasswordCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .expect("Invalid cost");
        Authenticator::with_password_hasher(SECRET, hasher).expect("Failed to build authenticator")
    }

    #[test]
    fn test_verify_credentials_success() {
        let authenticator = authenticator();
        let hash = authenticator
            .hash_password("my_password")
            .expect("Failed to hash password");

        let result = authenticator.verify_credentials("my_password", Some(&hash));
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_credentials_invalid_password() {
        let authenticator = authenticator();
        let hash = authenticator
            .hash_password("my_password")
            .expect("Failed to hash password");

        let result = authenticator.verify_credentials("wrong_password", Some(&hash));
        assert!(matches!(
            result,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_credentials_without_hash() {
        let authenticator = authenticator();

        let result = authenticator.verify_credentials("my_password", None);
        assert!(matches!(
            result,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_credentials_with_unverifiable_hash() {
        let authenticator = authenticator();

        let result = authenticator.verify_credentials("!external-identity", Some("!external-identity"));
        assert!(matches!(
            result,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_reference_password_does_not_open_accounts() {
        let authenticator = authenticator();

        let result = authenticator.verify_credentials(REFERENCE_PASSWORD, None);
        assert!(matches!(
            result,
            Err(AuthenticationError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_issue_and_validate_tokens() {
        let authenticator = authenticator();

        let tokens = authenticator
            .issue_tokens("user123")
            .expect("Failed to issue tokens");
        assert_eq!(tokens.expires_in, 24 * 60 * 60);
        assert_ne!(tokens.access_token, tokens.refresh_token);

        let access = authenticator
            .validate_token(&tokens.access_token, TokenKind::Access)
            .expect("Access token rejected");
        assert_eq!(access.sub, "user123");

        let refresh = authenticator
            .validate_token(&tokens.refresh_token, TokenKind::Refresh)
            .expect("Refresh token rejected");
        assert_eq!(refresh.sub, "user123");
    }

    #[test]
    fn test_token_kinds_are_not_interchangeable() {
        let authenticator = authenticator();
        let tokens = authenticator.issue_tokens("user123").unwrap();

        assert!(matches!(
            authenticator.validate_token(&tokens.refresh_token, TokenKind::Access),
            Err(JwtError::WrongKind { .. })
        ));
        assert!(matches!(
            authenticator.validate_token(&tokens.access_token, TokenKind::Refresh),
            Err(JwtError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_custom_lifetimes() {
        let authenticator = authenticator().with_token_lifetimes(TokenLifetimes {
            access: Duration::minutes(15),
            refresh: Duration::hours(1),
        });

        let tokens = authenticator.issue_tokens("user123").unwrap();
        assert_eq!(tokens.expires_in, 15 * 60);
    }

    #[test]
    fn test_oversized_lifetime_fails_issuance() {
        let authenticator = authenticator().with_token_lifetimes(TokenLifetimes {
            access: Duration::hours(3_000_000_000),
            refresh: Duration::hours(1),
        });

        assert!(matches!(
            authenticator.issue_tokens("user123"),
            Err(JwtError::LifetimeOutOfRange)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let authenticator = authenticator();
        let claims = Claims::for_subject("user123", TokenKind::Access, Duration::hours(1))
            .unwrap()
            .with_expiration(Utc::now().timestamp() - 120);
        let token = authenticator.generate_token(&claims).unwrap();

        assert!(matches!(
            authenticator.validate_token(&token, TokenKind::Access),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_validate_invalid_token() {
        let authenticator = authenticator();

        let result = authenticator.validate_token("invalid.token.here", TokenKind::Access);
        assert!(result.is_err());
    }
}
