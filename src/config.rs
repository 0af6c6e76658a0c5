//! Configuration loading.
//!
//! Everything has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [server]
//! bind_address = "127.0.0.1:8080"
//!
//! [cors]
//! allowed_origins = ["https://app.example.com"]
//! allowed_methods = ["GET", "PUT"]
//! credentials = true
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cors::CorsPolicy;
use crate::error::Error;

/// Root configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// When present, seeds [`Cors::with_policy`](crate::Cors::with_policy).
    pub cors: Option<CorsPolicy>,
}

/// Listener configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:3000".to_owned() }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.bind_address.parse()?)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Reads and parses a TOML configuration file.
pub fn load(path: impl AsRef<Path>) -> Result<Config, Error> {
    fs::read_to_string(path)?.parse()
}
