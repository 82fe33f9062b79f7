//! Session model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Largest page a single list call returns
pub const MAX_PAGE_SIZE: u32 = 100;

/// Session entity
///
/// Rows are immutable once written; the only transition is deletion.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    /// Time-ordered id, doubles as the pagination cursor
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Hex SHA-256 of the refresh material and client secret
    pub payload: String,
    pub ip: String,
    #[sqlx(rename = "expires_in")]
    pub expires_at: DateTime<Utc>,
}

/// Client-facing projection of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub ip: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            ip: session.ip,
            expires_at: session.expires_at,
        }
    }
}

/// Token pair handed out on session creation
#[derive(Debug, Clone, Serialize)]
pub struct UserTokens {
    pub access: String,
    pub refresh: String,
}

/// Cursor pagination options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    pub first: Option<u32>,
    pub last: Option<u32>,
    pub before: Option<Uuid>,
    pub after: Option<Uuid>,
}

/// Ordering and size of a list window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Oldest first
    Ascending(u32),
    /// Newest first
    Descending(u32),
}

impl Direction {
    pub fn limit(&self) -> u32 {
        match *self {
            Direction::Ascending(n) | Direction::Descending(n) => n,
        }
    }
}

impl SortOptions {
    pub fn first(n: u32) -> Self {
        Self {
            first: Some(n),
            ..Self::default()
        }
    }

    pub fn last(n: u32) -> Self {
        Self {
            last: Some(n),
            ..Self::default()
        }
    }

    pub fn before(mut self, id: Uuid) -> Self {
        self.before = Some(id);
        self
    }

    pub fn after(mut self, id: Uuid) -> Self {
        self.after = Some(id);
        self
    }

    /// Resolve `first`/`last` into a direction, clamped to [`MAX_PAGE_SIZE`]
    pub fn direction(&self) -> AuthResult<Direction> {
        match (self.first, self.last) {
            (Some(n), None) => Ok(Direction::Ascending(n.min(MAX_PAGE_SIZE))),
            (None, Some(n)) => Ok(Direction::Descending(n.min(MAX_PAGE_SIZE))),
            (None, None) => Err(AuthError::InvalidArgument(
                "Must be `first` or `last`".to_string(),
            )),
            (Some(_), Some(_)) => Err(AuthError::InvalidArgument(
                "`first` and `last` are mutually exclusive".to_string(),
            )),
        }
    }
}
