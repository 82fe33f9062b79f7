//! Sign-up and sign-in flows
//!
//! Each flow runs its peer calls strictly in order and stops at the first
//! failure. Nothing is rolled back: once an identity or session exists, a
//! later failure is reported as [`AuthError::Incomplete`].

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    error::{AuthError, AuthResult},
    models::{SignInInput, SignUpInput, UserTokens},
    peers::{CodeVerifier, IdentityDirectory, Notifier},
    services::SessionService,
    validation::{validate_sign_in, validate_sign_up},
};

/// Identity orchestration over the peer services
#[derive(Clone)]
pub struct IdentityService {
    sessions: SessionService,
    codes: Arc<dyn CodeVerifier>,
    identities: Arc<dyn IdentityDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl IdentityService {
    pub fn new(
        sessions: SessionService,
        codes: Arc<dyn CodeVerifier>,
        identities: Arc<dyn IdentityDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sessions,
            codes,
            identities,
            notifier,
        }
    }

    /// Verify the code, create the identity, open a session, then notify
    pub async fn sign_up(&self, input: &SignUpInput) -> AuthResult<UserTokens> {
        validate_sign_up(input)?;
        info!("Sign-up attempt for user: {}", input.username);

        if !self.codes.verify_code(&input.email, input.code).await? {
            warn!("Rejected sign-up for {}: invalid verification code", input.username);
            return Err(AuthError::InvalidArgument(
                "Verification code is not valid".to_string(),
            ));
        }

        let identity = self
            .identities
            .create_identity(&input.username, &input.email, &input.password)
            .await
            .map_err(|e| match e {
                AuthError::UnreadableResponse(_) => {
                    error!("Identity for {} may exist without a session: {}", input.username, e);
                    AuthError::incomplete("identity", e)
                }
                e => e,
            })?;
        info!("Identity {} created for user: {}", identity.id, input.username);

        let tokens = self
            .sessions
            .create_session(identity.id, &input.ip, &input.secret)
            .await
            .map_err(|e| {
                error!("Identity {} created without a session: {}", identity.id, e);
                AuthError::incomplete("session", e)
            })?;

        self.notifier
            .notify_registered(&identity.email, &input.username)
            .await
            .map_err(|e| {
                error!("Registration notification for {} failed: {}", identity.id, e);
                AuthError::incomplete("registration notification", e)
            })?;

        Ok(tokens)
    }

    /// Resolve credentials, open a session, then notify
    pub async fn sign_in(&self, input: &SignInInput) -> AuthResult<UserTokens> {
        validate_sign_in(input)?;
        info!("Sign-in attempt for user: {}", input.username);

        let identity = self
            .identities
            .get_identity_by_credentials(&input.username, &input.password)
            .await?;

        let tokens = self
            .sessions
            .create_session(identity.id, &input.ip, &input.secret)
            .await?;

        self.notifier
            .notify_logged_in(&identity.email, &input.ip)
            .await
            .map_err(|e| {
                error!("Login notification for {} failed: {}", identity.id, e);
                AuthError::incomplete("login notification", e)
            })?;

        Ok(tokens)
    }
}
