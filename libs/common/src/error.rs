//! Errors raised while bootstrapping the shared PostgreSQL pool

use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Database bootstrap failure
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Missing or inconsistent `DATABASE_*` environment
    #[error("invalid database configuration: {0}")]
    Configuration(String),

    /// The pool could not open its initial connections
    #[error("could not connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    /// A pending migration failed to apply
    #[error("could not apply migrations: {0}")]
    Migration(#[source] MigrateError),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
