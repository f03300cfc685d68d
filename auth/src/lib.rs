//! Authentication primitives for the image host.
//!
//! - Password hashing (Argon2id, configurable cost)
//! - Self-issued JWT access and refresh tokens
//! - Credential verification with uniform timing
//! - Ownership tokens for anonymous uploads
//!
//! The identity service builds its providers on top of these; nothing here
//! touches storage or the network.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::{PasswordCost, PasswordHasher};
//!
//! let cost = PasswordCost { memory_kib: 1024, iterations: 1, parallelism: 1 };
//! let hasher = PasswordHasher::with_cost(cost).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Token Pairs
//! ```
//! use auth::{Authenticator, PasswordCost, PasswordHasher, TokenKind};
//!
//! let cost = PasswordCost { memory_kib: 1024, iterations: 1, parallelism: 1 };
//! let hasher = PasswordHasher::with_cost(cost).unwrap();
//! let auth = Authenticator::with_password_hasher(b"secret_key_at_least_32_bytes_long!", hasher)
//!     .unwrap();
//! let tokens = auth.issue_tokens("user123").unwrap();
//! let claims = auth.validate_token(&tokens.access_token, TokenKind::Access).unwrap();
//! assert_eq!(claims.sub, "user123");
//! ```
//!
//! ## Ownership Tokens
//! ```
//! use auth::{verify_ownership_token, OwnershipToken};
//!
//! let issued = OwnershipToken::generate();
//! assert!(verify_ownership_token(&issued.token, &issued.token_hash));
//! ```

pub mod authenticator;
pub mod jwt;
pub mod ownership;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::IssuedTokens;
pub use authenticator::TokenLifetimes;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenKind;
pub use ownership::hash_ownership_token;
pub use ownership::verify_ownership_token;
pub use ownership::OwnershipToken;
pub use password::PasswordCost;
pub use password::PasswordError;
pub use password::PasswordHasher;
