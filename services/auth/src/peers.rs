//! Clients for the peer services the sign-up and sign-in flows depend on
//!
//! Every call is a single JSON request over HTTP with no retry. A failed
//! call is fatal to the request that made it.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{error, info};

use crate::{
    error::{AuthError, AuthResult},
    models::Identity,
};

/// One-time code verification
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    async fn verify_code(&self, email: &str, code: u64) -> AuthResult<bool>;
}

/// Identity and credential lookups
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn create_identity(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Identity>;

    async fn get_identity_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<Identity>;
}

/// Account e-mail notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_registered(&self, email: &str, username: &str) -> AuthResult<()>;

    async fn notify_logged_in(&self, email: &str, ip: &str) -> AuthResult<()>;
}

/// Peer service configuration
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Base URL of the user service
    pub user_service_url: String,
    /// Base URL of the code service
    pub code_service_url: String,
    /// Base URL of the email service
    pub email_service_url: String,
    /// Per-request timeout in seconds
    pub timeout: u64,
}

fn required_url(var: &str) -> Result<String> {
    let url = std::env::var(var)
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?;
    Ok(url.trim_end_matches('/').to_string())
}

impl PeerConfig {
    /// Create a new PeerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `USER_SERVICE_URL`, `CODE_SERVICE_URL`, `EMAIL_SERVICE_URL`: peer base URLs
    /// - `PEER_TIMEOUT`: Request timeout in seconds (default: 10)
    pub fn from_env() -> Result<Self> {
        let timeout = std::env::var("PEER_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        Ok(PeerConfig {
            user_service_url: required_url("USER_SERVICE_URL")?,
            code_service_url: required_url("CODE_SERVICE_URL")?,
            email_service_url: required_url("EMAIL_SERVICE_URL")?,
            timeout,
        })
    }
}

/// Map a non-success peer status onto the error taxonomy
pub(crate) fn status_error(peer: &str, status: StatusCode) -> AuthError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            AuthError::InvalidArgument(format!("{} rejected the request", peer))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AuthError::Unauthenticated("Invalid credentials".to_string())
        }
        StatusCode::NOT_FOUND => AuthError::NotFound(format!("{} has no such record", peer)),
        StatusCode::CONFLICT => AuthError::Conflict(format!("{} reported a conflict", peer)),
        other => AuthError::Unavailable(format!("{} responded with {}", peer, other)),
    }
}

/// JSON-over-HTTP connection to one peer
#[derive(Clone)]
pub struct PeerClient {
    name: &'static str,
    base_url: String,
    http: Client,
}

impl PeerClient {
    pub fn new(name: &'static str, base_url: impl Into<String>, http: Client) -> Self {
        Self {
            name,
            base_url: base_url.into(),
            http,
        }
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> AuthResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            error!("Call to {} failed: {}", self.name, e);
            AuthError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("{} responded to {} with {}", self.name, path, status);
            return Err(status_error(self.name, status));
        }

        Ok(response)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> AuthResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(path, body).await?;
        // the peer already answered with success, so its side effects may stand
        response.json::<R>().await.map_err(|e| {
            error!("{} sent an unreadable response to {}: {}", self.name, path, e);
            AuthError::UnreadableResponse(format!("{}: {}", self.name, e))
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> AuthResult<()> {
        self.send(path, body).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct VerifyCodeRequest<'a> {
    email: &'a str,
    code: u64,
}

#[derive(Deserialize)]
struct VerifyCodeResponse {
    valid: bool,
}

#[derive(Serialize)]
struct CreateIdentityRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisteredEmailRequest<'a> {
    email: &'a str,
    username: &'a str,
}

#[derive(Serialize)]
struct LoggedInEmailRequest<'a> {
    email: &'a str,
    ip: &'a str,
}

/// Code service client
#[derive(Clone)]
pub struct HttpCodeClient(PeerClient);

/// User service client
#[derive(Clone)]
pub struct HttpUserClient(PeerClient);

/// Email service client
#[derive(Clone)]
pub struct HttpEmailClient(PeerClient);

#[async_trait]
impl CodeVerifier for HttpCodeClient {
    async fn verify_code(&self, email: &str, code: u64) -> AuthResult<bool> {
        let response: VerifyCodeResponse = self
            .0
            .post_json("/codes/verify", &VerifyCodeRequest { email, code })
            .await?;
        Ok(response.valid)
    }
}

#[async_trait]
impl IdentityDirectory for HttpUserClient {
    async fn create_identity(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<Identity> {
        self.0
            .post_json(
                "/users",
                &CreateIdentityRequest {
                    username,
                    email,
                    password,
                },
            )
            .await
    }

    async fn get_identity_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<Identity> {
        self.0
            .post_json("/users/credentials", &CredentialsRequest { username, password })
            .await
    }
}

#[async_trait]
impl Notifier for HttpEmailClient {
    async fn notify_registered(&self, email: &str, username: &str) -> AuthResult<()> {
        self.0
            .post("/emails/registered", &RegisteredEmailRequest { email, username })
            .await
    }

    async fn notify_logged_in(&self, email: &str, ip: &str) -> AuthResult<()> {
        self.0
            .post("/emails/logged-in", &LoggedInEmailRequest { email, ip })
            .await
    }
}

/// HTTP clients for every peer, sharing one connection pool
#[derive(Clone)]
pub struct Peers {
    pub code: HttpCodeClient,
    pub users: HttpUserClient,
    pub email: HttpEmailClient,
}

impl Peers {
    /// Build the peer clients
    pub fn connect(config: &PeerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        info!(
            "Peer clients configured: user={}, code={}, email={}",
            config.user_service_url, config.code_service_url, config.email_service_url
        );

        Ok(Self {
            code: HttpCodeClient(PeerClient::new(
                "code service",
                &config.code_service_url,
                http.clone(),
            )),
            users: HttpUserClient(PeerClient::new(
                "user service",
                &config.user_service_url,
                http.clone(),
            )),
            email: HttpEmailClient(PeerClient::new(
                "email service",
                &config.email_service_url,
                http,
            )),
        })
    }
}
