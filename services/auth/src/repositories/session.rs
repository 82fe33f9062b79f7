//! Session repository for database operations

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AuthError, AuthResult},
    models::{Direction, Session, SortOptions},
};

/// Persistence of session records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session, `Conflict` if the id is taken
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Point lookup scoped to the owner
    async fn get(&self, owner_id: Uuid, id: Uuid) -> AuthResult<Session>;

    /// Point lookup by id alone; callers check ownership themselves
    async fn get_by_id(&self, id: Uuid) -> AuthResult<Session>;

    /// Cursor-paginated sessions of one owner
    async fn get_list(&self, owner_id: Uuid, sort: &SortOptions) -> AuthResult<Vec<Session>>;

    /// Delete a session after checking its payload in the same transaction
    async fn delete(&self, owner_id: Uuid, id: Uuid, payload: &str) -> AuthResult<()>;

    /// Number of sessions held by one owner
    async fn get_total_count(&self, owner_id: Uuid) -> AuthResult<i64>;
}

const SESSION_COLUMNS: &str = "id, owner_id, payload, ip, expires_in";

/// PostgreSQL session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a new session store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the list query for an owner and cursor window
pub(crate) fn list_query(
    owner_id: Uuid,
    sort: &SortOptions,
) -> AuthResult<QueryBuilder<'static, Postgres>> {
    let direction = sort.direction()?;

    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM user_session WHERE owner_id = ",
        SESSION_COLUMNS
    ));
    qb.push_bind(owner_id);

    if let Some(before) = sort.before {
        qb.push(" AND id < ").push_bind(before);
    }
    if let Some(after) = sort.after {
        qb.push(" AND id > ").push_bind(after);
    }

    match direction {
        Direction::Ascending(_) => qb.push(" ORDER BY id ASC"),
        Direction::Descending(_) => qb.push(" ORDER BY id DESC"),
    };
    qb.push(" LIMIT ").push_bind(i64::from(direction.limit()));

    Ok(qb)
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        info!("Creating session {} for owner {}", session.id, session.owner_id);

        sqlx::query(
            r#"
            INSERT INTO user_session (id, owner_id, payload, ip, expires_in)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id)
        .bind(session.owner_id)
        .bind(&session.payload)
        .bind(&session.ip)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, owner_id: Uuid, id: Uuid) -> AuthResult<Session> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM user_session WHERE owner_id = $1 AND id = $2",
            SESSION_COLUMNS
        ))
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or_else(|| AuthError::NotFound("Session not found".to_string()))
    }

    async fn get_by_id(&self, id: Uuid) -> AuthResult<Session> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM user_session WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or_else(|| AuthError::NotFound("Session not found".to_string()))
    }

    async fn get_list(&self, owner_id: Uuid, sort: &SortOptions) -> AuthResult<Vec<Session>> {
        let mut qb = list_query(owner_id, sort)?;

        let sessions = qb
            .build_query_as::<Session>()
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    async fn delete(&self, owner_id: Uuid, id: Uuid, payload: &str) -> AuthResult<()> {
        info!("Deleting session {} for owner {}", id, owner_id);

        let mut tx = self.pool.begin().await?;

        // row lock held until commit or rollback
        let stored: Option<String> = sqlx::query_scalar(
            "SELECT payload FROM user_session WHERE owner_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(owner_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let stored =
            stored.ok_or_else(|| AuthError::NotFound("Session not found".to_string()))?;

        if stored != payload {
            warn!("Rejected delete of session {}: payload mismatch", id);
            tx.rollback().await?;
            return Err(AuthError::InvalidArgument(
                "Session payload is not similar".to_string(),
            ));
        }

        sqlx::query("DELETE FROM user_session WHERE owner_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn get_total_count(&self, owner_id: Uuid) -> AuthResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_session WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
