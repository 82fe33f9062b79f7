//! Session lifecycle: creation, refresh, sign-out and listing

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{AuthError, AuthResult},
    jwt::TokenIssuer,
    models::{Session, SortOptions, UserTokens},
    refresh::{RefreshToken, TokenCodec},
    repositories::SessionStore,
};

/// Session service
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
    issuer: Arc<dyn TokenIssuer>,
    session_ttl: chrono::Duration,
}

impl SessionService {
    /// Create a new session service
    pub fn new(
        store: Arc<dyn SessionStore>,
        codec: Arc<dyn TokenCodec>,
        issuer: Arc<dyn TokenIssuer>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            codec,
            issuer,
            session_ttl: config.ttl(),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> u64 {
        self.issuer.access_token_expiry()
    }

    /// Access token minting and verification
    pub fn issuer(&self) -> &Arc<dyn TokenIssuer> {
        &self.issuer
    }

    /// Create a session bound to `secret` and return its tokens
    pub async fn create_session(
        &self,
        owner_id: Uuid,
        ip: &str,
        secret: &str,
    ) -> AuthResult<UserTokens> {
        info!("Creating session for owner: {}", owner_id);

        let refresh = self.codec.generate();
        let session = Session {
            id: Uuid::now_v7(),
            owner_id,
            payload: refresh.hash(secret),
            ip: ip.to_string(),
            expires_at: Utc::now() + self.session_ttl,
        };

        self.store.create(&session).await?;

        let access = self
            .issuer
            .generate_access_token(owner_id)
            .map_err(|e| AuthError::incomplete("access token signing", e))?;

        Ok(UserTokens {
            access,
            refresh: refresh.token(session.id, owner_id),
        })
    }

    /// Issue a new access token; the refresh token itself is not rotated
    pub async fn refresh_token(&self, token: &str, secret: &str) -> AuthResult<String> {
        let parsed = self.codec.parse(token)?;
        info!("Refreshing access token for session: {}", parsed.session_id);

        let session = self.store.get(parsed.owner_id, parsed.session_id).await?;

        if session.payload != parsed.payload(secret) {
            warn!("Rejected refresh of session {}: payload mismatch", session.id);
            return Err(AuthError::InvalidArgument(
                "Session payload is not similar".to_string(),
            ));
        }

        self.issuer.generate_access_token(session.owner_id)
    }

    /// Delete the session a refresh token belongs to
    pub async fn sign_out(&self, token: &str, secret: &str) -> AuthResult<()> {
        let parsed = self.codec.parse(token)?;
        info!("Signing out session: {}", parsed.session_id);

        self.delete_parsed(&parsed, secret).await
    }

    /// Delete one of the caller's sessions by its refresh token
    pub async fn delete_session(&self, owner_id: Uuid, token: &str, secret: &str) -> AuthResult<()> {
        let parsed = self.codec.parse(token)?;
        info!("Deleting session {} for owner {}", parsed.session_id, owner_id);

        if parsed.owner_id != owner_id {
            return Err(AuthError::InvalidArgument(
                "User id is not similar".to_string(),
            ));
        }

        self.delete_parsed(&parsed, secret).await
    }

    async fn delete_parsed(&self, parsed: &RefreshToken, secret: &str) -> AuthResult<()> {
        self.store
            .delete(parsed.owner_id, parsed.session_id, &parsed.payload(secret))
            .await
    }

    /// Fetch a session, rejecting callers that do not own it
    pub async fn get_session(&self, id: Uuid, owner_id: Uuid) -> AuthResult<Session> {
        let session = self.store.get_by_id(id).await?;

        if session.owner_id != owner_id {
            warn!("Owner {} asked for session {} it does not own", owner_id, id);
            return Err(AuthError::InvalidArgument(
                "User id is not similar".to_string(),
            ));
        }

        Ok(session)
    }

    /// List the caller's sessions in a cursor window
    pub async fn get_sessions(&self, owner_id: Uuid, sort: &SortOptions) -> AuthResult<Vec<Session>> {
        sort.direction()?;
        self.store.get_list(owner_id, sort).await
    }

    /// Number of sessions the owner holds
    pub async fn get_total_count(&self, owner_id: Uuid) -> AuthResult<i64> {
        self.store.get_total_count(owner_id).await
    }
}
