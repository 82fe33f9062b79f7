//! In-memory stand-ins for the store, the issuer and the peer services

use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex as StdMutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    jwt::{Claims, TokenIssuer},
    models::{Direction, Identity, Session, SortOptions},
    peers::{CodeVerifier, IdentityDirectory, Notifier},
    repositories::SessionStore,
};

fn not_found() -> AuthError {
    AuthError::NotFound("Session not found".to_string())
}

/// Session store backed by an id-ordered map; one lock covers each call
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<BTreeMap<Uuid, Session>>,
    list_calls: AtomicUsize,
}

impl MemorySessionStore {
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.id) {
            return Err(AuthError::Conflict("Session already exists".to_string()));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> AuthResult<Session> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn get_by_id(&self, id: Uuid) -> AuthResult<Session> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn get_list(&self, owner_id: Uuid, sort: &SortOptions) -> AuthResult<Vec<Session>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let direction = sort.direction()?;

        let sessions = self.sessions.lock().await;
        let window = sessions.values().filter(|s| {
            s.owner_id == owner_id
                && sort.before.is_none_or(|before| s.id < before)
                && sort.after.is_none_or(|after| s.id > after)
        });

        let limit = direction.limit() as usize;
        Ok(match direction {
            Direction::Ascending(_) => window.take(limit).cloned().collect(),
            Direction::Descending(_) => window.rev().take(limit).cloned().collect(),
        })
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid, payload: &str) -> AuthResult<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get(&id)
            .filter(|s| s.owner_id == owner_id)
            .ok_or_else(not_found)?;

        if session.payload != payload {
            return Err(AuthError::InvalidArgument(
                "Session payload is not similar".to_string(),
            ));
        }

        sessions.remove(&id);
        Ok(())
    }

    async fn get_total_count(&self, owner_id: Uuid) -> AuthResult<i64> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.values().filter(|s| s.owner_id == owner_id).count() as i64)
    }
}

/// Issuer whose signing always fails
pub struct FailingIssuer;

impl TokenIssuer for FailingIssuer {
    fn generate_access_token(&self, _owner_id: Uuid) -> AuthResult<String> {
        Err(AuthError::Internal("signing key unavailable".to_string()))
    }

    fn validate_access_token(&self, _token: &str) -> AuthResult<Claims> {
        Err(AuthError::Unauthenticated("Invalid access token".to_string()))
    }

    fn access_token_expiry(&self) -> u64 {
        900
    }
}

/// Scripted code, user and email services that record every call
pub struct FakePeers {
    pub valid_code: u64,
    pub identity: Identity,
    pub password: String,
    pub code_service_down: bool,
    pub identity_error: Option<fn() -> AuthError>,
    pub notify_fails: bool,
    calls: StdMutex<Vec<String>>,
}

impl FakePeers {
    pub fn new(identity: Identity) -> Self {
        Self {
            valid_code: 1234,
            identity,
            password: "hunter22".to_string(),
            code_service_down: false,
            identity_error: None,
            notify_fails: false,
            calls: StdMutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.to_string());
        }
    }
}

#[async_trait]
impl CodeVerifier for FakePeers {
    async fn verify_code(&self, _email: &str, code: u64) -> AuthResult<bool> {
        self.record("verify_code");
        if self.code_service_down {
            return Err(AuthError::Unavailable("code service down".to_string()));
        }
        Ok(code == self.valid_code)
    }
}

#[async_trait]
impl IdentityDirectory for FakePeers {
    async fn create_identity(
        &self,
        _username: &str,
        _email: &str,
        _password: &str,
    ) -> AuthResult<Identity> {
        self.record("create_identity");
        match self.identity_error {
            Some(make) => Err(make()),
            None => Ok(self.identity.clone()),
        }
    }

    async fn get_identity_by_credentials(
        &self,
        _username: &str,
        password: &str,
    ) -> AuthResult<Identity> {
        self.record("get_identity_by_credentials");
        if let Some(make) = self.identity_error {
            return Err(make());
        }
        if password != self.password {
            return Err(AuthError::Unauthenticated("Invalid credentials".to_string()));
        }
        Ok(self.identity.clone())
    }
}

#[async_trait]
impl Notifier for FakePeers {
    async fn notify_registered(&self, _email: &str, _username: &str) -> AuthResult<()> {
        self.record("notify_registered");
        if self.notify_fails {
            return Err(AuthError::Unavailable("email service down".to_string()));
        }
        Ok(())
    }

    async fn notify_logged_in(&self, _email: &str, _ip: &str) -> AuthResult<()> {
        self.record("notify_logged_in");
        if self.notify_fails {
            return Err(AuthError::Unavailable("email service down".to_string()));
        }
        Ok(())
    }
}
