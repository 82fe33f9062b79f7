//! Middleware for access token validation

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{AppState, error::AuthError};

/// Owner id taken from a validated access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentOwner(pub Uuid);

/// Require a valid bearer access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AuthError::Unauthenticated(
            "Missing access token".to_string(),
        ));
    };

    let claims = state
        .sessions
        .issuer()
        .validate_access_token(bearer.token())?;

    // Add owner id to request extensions for use in handlers
    req.extensions_mut().insert(CurrentOwner(claims.sub));

    Ok(next.run(req).await)
}
