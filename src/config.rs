//! Configuration Module
//!
//! Handles loading server, backend and chunking configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::backend::MAX_BACKEND_VALUE_SIZE;
use crate::store::DEFAULT_MAX_CHUNK_SIZE;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// REST endpoint of the remote key-value service
    pub redis_rest_url: Option<String>,
    /// Bearer token for the remote key-value service
    pub redis_rest_token: Option<String>,
    /// Default TTL in seconds for stored entries
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Largest payload slice written under a single backend key
    pub max_chunk_size: usize,
    /// Value ceiling enforced by the in-memory backend
    pub max_value_size: usize,
    /// Largest accepted HTTP request body
    pub max_upload_size: usize,
    /// Timeout in seconds for each backend request
    pub request_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTASH_REDIS_REST_URL` - REST endpoint (default: unset, in-memory backend)
    /// - `UPSTASH_REDIS_REST_TOKEN` - REST bearer token (default: unset)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 900)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `MAX_CHUNK_SIZE` - Chunk size in bytes (default: 921600)
    /// - `MAX_VALUE_SIZE` - In-memory backend value ceiling (default: 1048576)
    /// - `MAX_UPLOAD_SIZE` - HTTP body limit in bytes (default: 52428800)
    /// - `REQUEST_TIMEOUT` - Backend request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_rest_url: non_empty_var("UPSTASH_REDIS_REST_URL"),
            redis_rest_token: non_empty_var("UPSTASH_REDIS_REST_TOKEN"),
            default_ttl: parsed_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parsed_var("SERVER_PORT").unwrap_or(defaults.server_port),
            max_chunk_size: parsed_var("MAX_CHUNK_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.max_chunk_size),
            max_value_size: parsed_var("MAX_VALUE_SIZE").unwrap_or(defaults.max_value_size),
            max_upload_size: parsed_var("MAX_UPLOAD_SIZE").unwrap_or(defaults.max_upload_size),
            request_timeout: parsed_var("REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout),
        }
    }

    /// Returns the REST URL and token when both are configured.
    pub fn backend_credentials(&self) -> Option<(&str, &str)> {
        match (&self.redis_rest_url, &self.redis_rest_token) {
            (Some(url), Some(token)) => Some((url.as_str(), token.as_str())),
            _ => None,
        }
    }

    /// Backend request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_rest_url: None,
            redis_rest_token: None,
            default_ttl: 900,
            server_port: 3000,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_value_size: MAX_BACKEND_VALUE_SIZE,
            max_upload_size: 50 * 1024 * 1024,
            request_timeout: 30,
        }
    }
}

// Hand-written so the token never reaches the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("redis_rest_url", &self.redis_rest_url.is_some())
            .field("redis_rest_token", &self.redis_rest_token.is_some())
            .field("default_ttl", &self.default_ttl)
            .field("server_port", &self.server_port)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("max_value_size", &self.max_value_size)
            .field("max_upload_size", &self.max_upload_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
