//! Process-wide configuration, loaded once at startup

use anyhow::Result;
use common::database::DatabaseConfig;
use std::net::SocketAddr;

use crate::jwt::JwtConfig;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the service listens on
    pub bind_address: SocketAddr,
}

impl ServerConfig {
    /// Create a new ServerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ACCOUNTS_BIND_ADDRESS`: Listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Result<Self> {
        let bind_address: SocketAddr = std::env::var("ACCOUNTS_BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid ACCOUNTS_BIND_ADDRESS: {}", e))?;

        Ok(Self { bind_address })
    }
}

/// Every setting the service needs, immutable after startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
        })
    }
}
