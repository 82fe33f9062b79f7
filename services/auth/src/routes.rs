//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AuthError, AuthResult},
    middleware::{CurrentOwner, auth_middleware},
    models::{SessionView, SignInInput, SignUpInput, SortOptions, UserTokens},
    validation::validate_secret,
};

/// Response for token generation
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl TokenResponse {
    fn new(tokens: UserTokens, expires_in: u64) -> Self {
        Self {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Request carrying a refresh token and the secret it is bound to
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
    pub secret: String,
}

/// Response for token refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Request for opening an extra session
#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub ip: String,
    pub secret: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/sessions",
            get(get_sessions).post(create_session).delete(delete_session),
        )
        .route("/sessions/count", get(get_total_session_count))
        .route("/sessions/:id", get(get_session))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/sign-out", post(sign_out))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

pub async fn sign_up(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignUpInput>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let tokens = state.identities.sign_up(&payload).await?;
    let response = TokenResponse::new(tokens, state.sessions.access_token_expiry());

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SignInInput>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    let tokens = state.identities.sign_in(&payload).await?;
    let response = TokenResponse::new(tokens, state.sessions.access_token_expiry());

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RefreshTokenRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    info!("Token refresh request");

    let access_token = state
        .sessions
        .refresh_token(&payload.refresh_token, &payload.secret)
        .await?;

    Ok(Json(RefreshTokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.access_token_expiry(),
    }))
}

pub async fn sign_out(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<RefreshTokenRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    state
        .sessions
        .sign_out(&payload.refresh_token, &payload.secret)
        .await?;

    Ok(Json(serde_json::json!({"message": "Signed out successfully"})))
}

pub async fn create_session(
    State(state): State<AppState>,
    Extension(CurrentOwner(owner_id)): Extension<CurrentOwner>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateSessionRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    validate_secret(&payload.secret).map_err(AuthError::InvalidArgument)?;

    let tokens = state
        .sessions
        .create_session(owner_id, &payload.ip, &payload.secret)
        .await?;
    let response = TokenResponse::new(tokens, state.sessions.access_token_expiry());

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_sessions(
    State(state): State<AppState>,
    Extension(CurrentOwner(owner_id)): Extension<CurrentOwner>,
    WithRejection(Query(sort), _): WithRejection<Query<SortOptions>, AuthError>,
) -> AuthResult<Json<Vec<SessionView>>> {
    let sessions = state.sessions.get_sessions(owner_id, &sort).await?;

    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

pub async fn get_total_session_count(
    State(state): State<AppState>,
    Extension(CurrentOwner(owner_id)): Extension<CurrentOwner>,
) -> AuthResult<impl IntoResponse> {
    let count = state.sessions.get_total_count(owner_id).await?;

    Ok(Json(serde_json::json!({ "count": count })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(CurrentOwner(owner_id)): Extension<CurrentOwner>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AuthError>,
) -> AuthResult<Json<SessionView>> {
    let session = state.sessions.get_session(id, owner_id).await?;

    Ok(Json(session.into()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(CurrentOwner(owner_id)): Extension<CurrentOwner>,
    WithRejection(Json(payload), _): WithRejection<Json<RefreshTokenRequest>, AuthError>,
) -> AuthResult<impl IntoResponse> {
    state
        .sessions
        .delete_session(owner_id, &payload.refresh_token, &payload.secret)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SessionConfig,
        jwt::{JwtConfig, JwtService, SigningKey},
        models::Identity,
        refresh::OpaqueTokenCodec,
        services::{
            IdentityService, SessionService,
            testing::{FakePeers, MemorySessionStore},
        },
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state_for(identity: Identity) -> AppState {
        let sessions = SessionService::new(
            Arc::new(MemorySessionStore::default()),
            Arc::new(OpaqueTokenCodec),
            Arc::new(
                JwtService::new(JwtConfig {
                    signing_key: SigningKey::Hmac("test-signing-key".to_string()),
                    access_token_expiry: 900,
                })
                .unwrap(),
            ),
            &SessionConfig::default(),
        );
        let peers = Arc::new(FakePeers::new(identity));
        let identities =
            IdentityService::new(sessions.clone(), peers.clone(), peers.clone(), peers);

        AppState {
            sessions,
            identities,
        }
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "u1@example.com".to_string(),
        }
    }

    fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, bearer: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_in(app: &Router) -> TokenResponse {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/sign-in",
                None,
                json!({
                    "username": "user_one",
                    "password": "hunter22",
                    "secret": "s3cr3t",
                    "ip": "1.2.3.4"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_value(body_json(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(state_for(identity()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sign_in_then_refresh() {
        let app = create_router(state_for(identity()));
        let tokens = sign_in(&app).await;
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/refresh",
                None,
                json!({ "refresh_token": tokens.refresh_token, "secret": "s3cr3t" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/refresh",
                None,
                json!({ "refresh_token": tokens.refresh_token, "secret": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(body["committed"], false);
    }

    #[tokio::test]
    async fn test_sessions_require_bearer() {
        let app = create_router(state_for(identity()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/sessions/count").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(get_request("/sessions/count", "not-a-jwt"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_listing_and_lookup() {
        let app = create_router(state_for(identity()));
        let tokens = sign_in(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/sessions",
                Some(&tokens.access_token),
                json!({ "ip": "5.6.7.8", "secret": "other" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(get_request("/sessions/count", &tokens.access_token))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["count"], 2);

        let response = app
            .clone()
            .oneshot(get_request("/sessions?last=1", &tokens.access_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert!(page[0]["ip"].is_string());
        assert!(page[0].get("payload").is_none());

        let id = page[0]["id"].as_str().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(get_request(&format!("/sessions/{}", id), &tokens.access_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/sessions", &tokens.access_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_session_then_sign_out_is_not_found() {
        let app = create_router(state_for(identity()));
        let tokens = sign_in(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "DELETE",
                "/sessions",
                Some(&tokens.access_token),
                json!({ "refresh_token": tokens.refresh_token, "secret": "s3cr3t" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(json_request(
                "POST",
                "/auth/sign-out",
                None,
                json!({ "refresh_token": tokens.refresh_token, "secret": "s3cr3t" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn assert_invalid_argument(response: axum::response::Response) {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(body["committed"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_requests_use_error_body() {
        let app = create_router(state_for(identity()));
        let tokens = sign_in(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/refresh",
                None,
                json!({ "refresh_token": "x" }),
            ))
            .await
            .unwrap();
        assert_invalid_argument(response).await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/sign-in")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_invalid_argument(response).await;

        let response = app
            .clone()
            .oneshot(get_request("/sessions?first=-1", &tokens.access_token))
            .await
            .unwrap();
        assert_invalid_argument(response).await;

        let response = app
            .oneshot(get_request("/sessions/not-a-uuid", &tokens.access_token))
            .await
            .unwrap();
        assert_invalid_argument(response).await;
    }
}
