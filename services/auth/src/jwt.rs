//! JWT service for access token generation and validation
//!
//! Access tokens are short-lived and stateless. They are signed either with
//! a shared HS256 secret or an RS256 key pair, depending on configuration.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Key material used to sign access tokens
#[derive(Clone)]
pub enum SigningKey {
    /// HS256 shared secret
    Hmac(String),
    /// RS256 key pair in PEM format
    Rsa {
        private_key: String,
        public_key: String,
    },
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningKey::Hmac(_) => f.write_str("Hmac(..)"),
            SigningKey::Rsa { .. } => f.write_str("Rsa { .. }"),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signing key material
    pub signing_key: SigningKey,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
}

/// Read a PEM value, or the file it points to (CWD first, then crate root)
fn read_pem(var: &str) -> Result<String> {
    let value = std::env::var(var)
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?;

    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    let contents = std::fs::read_to_string(&value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(&value);
            std::fs::read_to_string(path)
        })
        .map_err(|e| anyhow::anyhow!("Failed to read {} file: {}", var, e))?;

    Ok(contents.trim().to_string())
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SIGNING_KEY`: HS256 shared secret
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 keys (PEM or path), used when no shared secret is set
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    pub fn from_env() -> Result<Self> {
        let signing_key = match std::env::var("JWT_SIGNING_KEY") {
            Ok(secret) if !secret.is_empty() => SigningKey::Hmac(secret),
            _ => SigningKey::Rsa {
                private_key: read_pem("JWT_PRIVATE_KEY")?,
                public_key: read_pem("JWT_PUBLIC_KEY")?,
            },
        };

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        Ok(JwtConfig {
            signing_key,
            access_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Owner id
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token id
    pub jti: Uuid,
}

/// Access token minting and verification
pub trait TokenIssuer: Send + Sync {
    /// Sign an access token asserting `owner_id`
    fn generate_access_token(&self, owner_id: Uuid) -> AuthResult<String>;

    /// Verify signature and expiry, returning the claims
    fn validate_access_token(&self, token: &str) -> AuthResult<Claims>;

    /// Access token lifetime in seconds
    fn access_token_expiry(&self) -> u64;
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let (algorithm, encoding_key, decoding_key) = match &config.signing_key {
            SigningKey::Hmac(secret) => (
                Algorithm::HS256,
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
            ),
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

        info!("JWT service initialized with {:?}", algorithm);

        Ok(JwtService {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            access_token_expiry: config.access_token_expiry,
        })
    }
}

impl TokenIssuer for JwtService {
    fn generate_access_token(&self, owner_id: Uuid) -> AuthResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Internal(format!("Failed to get current time: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: owner_id,
            iat: now,
            exp: now + self.access_token_expiry,
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        Ok(token)
    }

    fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                warn!("Rejected access token: {}", e);
                AuthError::Unauthenticated("Invalid access token".to_string())
            })?;
        Ok(token_data.claims)
    }

    fn access_token_expiry(&self) -> u64 {
        self.access_token_expiry
    }
}
