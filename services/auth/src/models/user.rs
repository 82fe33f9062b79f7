//! Sign-up and sign-in inputs and the identity returned by the user service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record owned by the user service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Sign-up input
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Client secret bound to the new session
    pub secret: String,
    /// One-time verification code sent to `email`
    pub code: u64,
    pub ip: String,
}

/// Sign-in input
#[derive(Debug, Clone, Deserialize)]
pub struct SignInInput {
    pub username: String,
    pub password: String,
    /// Client secret bound to the new session
    pub secret: String,
    pub ip: String,
}
