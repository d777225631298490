//! JWT service for token generation and validation
//!
//! Tokens are stateless: nothing is stored server-side. Access tokens are
//! short-lived, refresh tokens live longer and can only be exchanged for a
//! new pair. Tokens are signed with HS256 (shared secret) or RS256 (PEM key
//! pair) depending on configuration, and verification fails closed: a token
//! that is malformed, expired, badly signed or of the wrong type is rejected.

use anyhow::Result;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use uuid::Uuid;

/// Default access token lifetime in seconds (60 minutes)
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: u64 = 3600;
/// Default refresh token lifetime in seconds (24 hours)
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: u64 = 86400;
/// Shortest accepted HMAC secret, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Key material used to sign and verify tokens
#[derive(Clone)]
pub enum SigningKey {
    /// HS256 shared secret
    Secret(String),
    /// RS256 key pair in PEM format
    Rsa {
        private_key: String,
        public_key: String,
    },
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Secret(_) => f.write_str("Secret(..)"),
            SigningKey::Rsa { .. } => f.write_str("Rsa { .. }"),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Key material for signing and verifying tokens
    pub signing_key: SigningKey,
    /// Access token expiration time in seconds (default: 60 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 24 hours)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Configuration signing with an HMAC secret and default lifetimes
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            signing_key: SigningKey::Secret(secret.into()),
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY,
        }
    }

    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC secret (at least 32 bytes); takes precedence over RSA keys
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 3600)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let signing_key = match std::env::var("JWT_SECRET") {
            Ok(secret) => SigningKey::Secret(secret),
            Err(_) => {
                let private_key = std::env::var("JWT_PRIVATE_KEY").map_err(|_| {
                    anyhow::anyhow!("JWT_SECRET or JWT_PRIVATE_KEY environment variable not set")
                })?;
                let public_key = std::env::var("JWT_PUBLIC_KEY")
                    .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;

                SigningKey::Rsa {
                    private_key: read_pem(&private_key, "private")?,
                    public_key: read_pem(&public_key, "public")?,
                }
            }
        };

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRY);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRY);

        Ok(JwtConfig {
            signing_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Accept either inline PEM text or a path to a PEM file (CWD, then crate root)
fn read_pem(value: &str, kind: &str) -> Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    let pem = std::fs::read_to_string(value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(value);
            std::fs::read_to_string(path)
        })
        .map_err(|e| anyhow::anyhow!("Failed to read {} key file: {}", kind, e))?;

    Ok(pem.trim().to_string())
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Unique token ID
    pub jti: Uuid,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("expected a {0} token")]
    WrongType(TokenType),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("system clock is before the unix epoch")]
    Clock,
}

/// Seconds since the unix epoch
pub fn now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
    refresh_token_expiry: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (algorithm, encoding_key, decoding_key) = match &config.signing_key {
            SigningKey::Secret(secret) => {
                if secret.len() < MIN_SECRET_LENGTH {
                    anyhow::bail!(
                        "JWT secret must be at least {} bytes long",
                        MIN_SECRET_LENGTH
                    );
                }
                (
                    Algorithm::HS256,
                    EncodingKey::from_secret(secret.as_bytes()),
                    DecodingKey::from_secret(secret.as_bytes()),
                )
            }
            SigningKey::Rsa {
                private_key,
                public_key,
            } => (
                Algorithm::RS256,
                EncodingKey::from_rsa_pem(private_key.as_bytes())?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(JwtService {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        })
    }

    /// Issue an access and refresh token for a user
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        self.issue_pair_at(user_id, now()?)
    }

    /// Issue a token pair as if the current time were `issued_at` (seconds since epoch)
    pub fn issue_pair_at(&self, user_id: Uuid, issued_at: u64) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.generate_token(user_id, TokenType::Access, issued_at)?,
            refresh: self.generate_token(user_id, TokenType::Refresh, issued_at)?,
        })
    }

    /// Sign a token of the given type for a user
    pub fn generate_token(
        &self,
        user_id: Uuid,
        token_type: TokenType,
        issued_at: u64,
    ) -> Result<String, TokenError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_token_expiry,
            TokenType::Refresh => self.refresh_token_expiry,
        };

        let claims = Claims {
            sub: user_id,
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime),
            jti: Uuid::new_v4(),
            token_type,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Validate a token of the expected type and return its claims
    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            },
        )?;

        if token_data.claims.token_type != expected {
            return Err(TokenError::WrongType(expected));
        }

        Ok(token_data.claims)
    }
}
