//! Process configuration for the authentication service

use anyhow::Result;
use common::database::DatabaseConfig;
use std::net::SocketAddr;

use crate::{jwt::JwtConfig, peers::PeerConfig};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server binds to
    pub listen_addr: SocketAddr,
}

impl ServerConfig {
    /// `AUTH_LISTEN_ADDR` (default: 0.0.0.0:3000)
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("AUTH_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid AUTH_LISTEN_ADDR: {}", e))?;

        Ok(Self { listen_addr })
    }
}

/// Upper bound for `SESSION_TTL`, ten years
const MAX_SESSION_TTL: u64 = 315_360_000;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 720 hours)
    pub ttl: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl: 2_592_000 }
    }
}

impl SessionConfig {
    /// `SESSION_TTL` in seconds
    pub fn from_env() -> Result<Self> {
        let ttl = match std::env::var("SESSION_TTL") {
            Ok(value) => value
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid SESSION_TTL: {}", e))?,
            Err(_) => Self::default().ttl,
        };

        if ttl == 0 || ttl > MAX_SESSION_TTL {
            anyhow::bail!("SESSION_TTL must be between 1 and {} seconds", MAX_SESSION_TTL);
        }

        Ok(Self { ttl })
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl.min(MAX_SESSION_TTL) as i64)
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub jwt: JwtConfig,
    pub peers: PeerConfig,
}

impl Config {
    /// Load every section from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            session: SessionConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            peers: PeerConfig::from_env()?,
        })
    }
}
