use std::net::SocketAddr;

use crate::error::Error;

pub const DEFAULT_DATABASE_URL: &str = "data_structures.db";
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path or `file:` URI.
    pub database_url: String,
    pub http_host: String,
    pub http_port: u16,
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Unset keys fall
    /// back to their defaults; malformed numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let http_port = match lookup("HTTP_PORT") {
            Some(port) => port.parse().map_err(|_| Error::Config {
                message: format!("Invalid HTTP_PORT '{}'", port),
            })?,
            None => defaults.http_port,
        };

        let pool_size = match lookup("DB_POOL_SIZE") {
            Some(size) => match size.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(Error::Config {
                        message: format!("Invalid DB_POOL_SIZE '{}'", size),
                    })
                }
            },
            None => defaults.pool_size,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            http_host: lookup("HTTP_HOST").unwrap_or(defaults.http_host),
            http_port,
            pool_size,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.http_host, self.http_port)
            .parse()
            .map_err(|e| Error::Config {
                message: format!("Invalid listen address: {}", e),
            })
    }
}
