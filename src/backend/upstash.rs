//! Upstash REST Backend
//!
//! Talks to a Redis-compatible REST endpoint authenticated with a bearer
//! token. Single commands are posted as a JSON array to the base URL;
//! batches go to `{url}/pipeline` as an array of arrays.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Backend, Command};
use crate::error::{CacheError, Result};

// == REST Reply ==
/// Body of every REST reply: either a result or an error message.
#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl RestReply {
    fn into_result(self, command: &str) -> Result<Option<Value>> {
        match self.error {
            Some(message) => Err(CacheError::backend(command, message)),
            None => Ok(self.result.filter(|v| !v.is_null())),
        }
    }
}

// == Upstash Backend ==
/// REST client for the remote key-value service.
pub struct UpstashBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl UpstashBackend {
    /// Create a new client for the given endpoint.
    ///
    /// # Arguments
    /// * `url` - REST endpoint, e.g. `https://eu1-example.upstash.io`
    /// * `token` - Bearer token for the endpoint
    /// * `timeout` - Deadline applied to each request
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CacheError::backend("CONNECT", format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn post<T>(&self, command: &str, url: &str, body: &Value) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| CacheError::backend(command, format!("request failed: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CacheError::backend(command, format!("failed to read reply: {}", e)))?;

        if !status.is_success() {
            // Error replies still carry {"error": ...} when the service produced them
            let message = serde_json::from_slice::<RestReply>(&bytes)
                .ok()
                .and_then(|reply| reply.error)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(CacheError::backend(command, message));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::backend(command, format!("unexpected reply: {}", e)))
    }

    async fn execute(&self, args: Vec<String>) -> Result<Option<Value>> {
        let command = args.first().cloned().unwrap_or_default();
        let reply: RestReply = self
            .post(&command, &self.base_url, &Value::from(args))
            .await?;
        reply.into_result(&command)
    }
}

/// Argument vector for a pipeline command.
fn encode_command(command: &Command) -> Vec<String> {
    match command {
        Command::Set { key, value, ttl } => vec![
            "SET".to_string(),
            key.clone(),
            value.clone(),
            "EX".to_string(),
            ttl.to_string(),
        ],
        Command::Del { key } => vec!["DEL".to_string(), key.clone()],
    }
}

/// GET replies are always strings on the wire; anything else is a protocol fault.
fn expect_string(command: &str, result: Option<Value>) -> Result<Option<String>> {
    match result {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(CacheError::backend(
            command,
            format!("expected string reply, got {}", other),
        )),
    }
}

fn expect_integer(command: &str, result: Option<Value>) -> Result<u64> {
    result
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            CacheError::backend(command, format!("expected integer reply, got {:?}", result))
        })
}

/// Collapses per-command pipeline replies into one outcome.
fn pipeline_outcome(replies: Vec<RestReply>, total: usize) -> Result<()> {
    if replies.len() != total {
        return Err(CacheError::Pipeline {
            failed: total.saturating_sub(replies.len()),
            total,
            first_error: format!("expected {} replies, got {}", total, replies.len()),
        });
    }

    let errors: Vec<String> = replies.into_iter().filter_map(|r| r.error).collect();
    match errors.first() {
        None => Ok(()),
        Some(first) => Err(CacheError::Pipeline {
            failed: errors.len(),
            total,
            first_error: first.clone(),
        }),
    }
}

#[async_trait]
impl Backend for UpstashBackend {
    fn name(&self) -> &'static str {
        "upstash"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.execute(vec!["GET".to_string(), key.to_string()]).await?;
        expect_string("GET", result)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.execute(encode_command(&Command::set(key, value, ttl_seconds)))
            .await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push("DEL".to_string());
        args.extend(keys.iter().cloned());

        let result = self.execute(args).await?;
        expect_integer("DEL", result)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let result = self
            .execute(vec!["EXISTS".to_string(), key.to_string()])
            .await?;
        Ok(expect_integer("EXISTS", result)? > 0)
    }

    async fn pipeline(&self, commands: Vec<Command>) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let total = commands.len();
        let body = Value::from(
            commands
                .iter()
                .map(|c| Value::from(encode_command(c)))
                .collect::<Vec<_>>(),
        );
        debug!("upstash: pipeline of {} commands", total);

        let url = format!("{}/pipeline", self.base_url);
        let replies: Vec<RestReply> = self.post("PIPELINE", &url, &body).await?;
        pipeline_outcome(replies, total)
    }

    async fn ping(&self) -> Result<()> {
        match self.execute(vec!["PING".to_string()]).await? {
            Some(Value::String(pong)) if pong.eq_ignore_ascii_case("PONG") => Ok(()),
            other => Err(CacheError::backend(
                "PING",
                format!("unexpected reply: {:?}", other),
            )),
        }
    }
}
