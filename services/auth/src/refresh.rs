//! Opaque refresh tokens
//!
//! A refresh token is `hex(material).session_id.owner_id`. The 32 random
//! bytes of material never touch the database: the session row stores only
//! `sha256(material || client_secret)` as hex, so a token string is useless
//! without the client secret supplied alongside it on every call.

use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Length of the random refresh material in bytes
pub const MATERIAL_LEN: usize = 32;

const SEPARATOR: char = '.';

/// Server-chosen random half of the session binding
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshSecret {
    material: [u8; MATERIAL_LEN],
}

impl std::fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshSecret(..)")
    }
}

impl RefreshSecret {
    /// Draw fresh material from the OS random source
    pub fn generate() -> Self {
        let mut material = [0u8; MATERIAL_LEN];
        OsRng.fill_bytes(&mut material);
        Self { material }
    }

    pub fn from_material(material: [u8; MATERIAL_LEN]) -> Self {
        Self { material }
    }

    /// Hex payload stored for this material and client secret
    pub fn hash(&self, client_secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.material);
        hasher.update(client_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Client-facing token binding this material to a session
    pub fn token(&self, session_id: Uuid, owner_id: Uuid) -> String {
        format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            hex::encode(self.material),
            session_id.hyphenated(),
            owner_id.hyphenated()
        )
    }
}

/// Decoded refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub session_id: Uuid,
    pub owner_id: Uuid,
    pub secret: RefreshSecret,
}

impl RefreshToken {
    /// Payload to compare against the stored session payload
    pub fn payload(&self, client_secret: &str) -> String {
        self.secret.hash(client_secret)
    }
}

/// Refresh token construction and parsing
pub trait TokenCodec: Send + Sync {
    /// Fresh material for a session that does not exist yet
    fn generate(&self) -> RefreshSecret;

    /// Decode a client-supplied token; does not check the payload
    fn parse(&self, token: &str) -> AuthResult<RefreshToken>;
}

/// Codec for the dotted hex/uuid token format
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueTokenCodec;

fn malformed() -> AuthError {
    AuthError::InvalidArgument("Malformed refresh token".to_string())
}

impl TokenCodec for OpaqueTokenCodec {
    fn generate(&self) -> RefreshSecret {
        RefreshSecret::generate()
    }

    fn parse(&self, token: &str) -> AuthResult<RefreshToken> {
        let mut parts = token.trim().split(SEPARATOR);

        let (Some(material), Some(session_id), Some(owner_id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let mut bytes = [0u8; MATERIAL_LEN];
        hex::decode_to_slice(material, &mut bytes).map_err(|_| malformed())?;

        let session_id = Uuid::parse_str(session_id).map_err(|_| malformed())?;
        let owner_id = Uuid::parse_str(owner_id).map_err(|_| malformed())?;

        Ok(RefreshToken {
            session_id,
            owner_id,
            secret: RefreshSecret::from_material(bytes),
        })
    }
}
