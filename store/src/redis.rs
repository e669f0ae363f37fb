//! REST client for a Redis-compatible store.
//!
//! Commands are JSON arrays POSTed to the service root
//! (`["HSET", "stronghold:1:2:3", ...]` answered with `{"result": ...}`);
//! batches go to the `/pipeline` endpoint as an array of commands and come
//! back as an array of per-command replies. Authentication is a bearer
//! token on every request.

use serde::Deserialize;
use serde_json::Value;

use redoubt_types::{Stronghold, StrongholdId};

use crate::config::StoreConfig;
use crate::retry::{RetryConfig, RetryOutcome, send_with_retry};
use crate::{READY_INDEX_KEY, StoreError, StrongholdStore, fields, record_key};

const CONNECT_TIMEOUT_SECS: u64 = 5;
const TCP_KEEPALIVE_SECS: u64 = 60;
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// Per-command reply shape: exactly one of `result` / `error` is present.
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl CommandReply {
    fn into_result(self) -> Result<Value, StoreError> {
        if let Some(error) = self.error {
            return Err(StoreError::Command(error));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Client for the record store and ordering index.
#[derive(Clone)]
pub struct RedisStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryConfig,
}

// The bearer token must not reach logs through Debug formatting.
impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(config.timeout_seconds()))
            .tcp_keepalive(Some(std::time::Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: config.url().trim_end_matches('/').to_string(),
            token: config.token().to_string(),
            retry: RetryConfig {
                max_retries: config.max_retries(),
                ..RetryConfig::default()
            },
        })
    }

    /// Issue a single command and return its `result` value.
    async fn execute(&self, command: &[String]) -> Result<Value, StoreError> {
        let outcome = send_with_retry(
            || {
                self.client
                    .post(&self.base_url)
                    .bearer_auth(&self.token)
                    .json(command)
            },
            &self.retry,
        )
        .await;
        let response = Self::unwrap_outcome(outcome).await?;
        let reply: CommandReply = response.json().await?;
        reply.into_result()
    }

    /// Issue a command batch through `/pipeline`, one reply per command.
    async fn pipeline(&self, commands: &[Vec<String>]) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/pipeline", self.base_url);
        let outcome = send_with_retry(
            || self.client.post(&url).bearer_auth(&self.token).json(commands),
            &self.retry,
        )
        .await;
        let response = Self::unwrap_outcome(outcome).await?;
        let replies: Vec<CommandReply> = response.json().await?;
        if replies.len() != commands.len() {
            return Err(StoreError::Command(format!(
                "pipeline answered {} replies for {} commands",
                replies.len(),
                commands.len()
            )));
        }
        replies.into_iter().map(CommandReply::into_result).collect()
    }

    async fn unwrap_outcome(outcome: RetryOutcome) -> Result<reqwest::Response, StoreError> {
        match outcome {
            RetryOutcome::Success(response) => Ok(response),
            RetryOutcome::HttpError(response) => {
                let status = response.status();
                let body = read_capped_body(response).await;
                tracing::warn!(%status, "Storage service returned error status");
                Err(StoreError::Http { status, body })
            }
            RetryOutcome::Failed { attempts, source } => {
                tracing::warn!(attempts, error = %source, "Storage request failed");
                Err(StoreError::Transport(source))
            }
        }
    }
}

/// Read an error body without trusting its size or encoding.
async fn read_capped_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(body) => {
            if body.len() > MAX_ERROR_BODY_BYTES {
                let text = String::from_utf8_lossy(&body[..MAX_ERROR_BODY_BYTES]);
                format!("{text}...(truncated)")
            } else {
                String::from_utf8_lossy(&body).into_owned()
            }
        }
        Err(_) => String::new(),
    }
}

fn expect_integer(value: &Value) -> Result<i64, StoreError> {
    value
        .as_i64()
        .ok_or_else(|| StoreError::Command(format!("expected integer reply, got {value}")))
}

fn expect_string_array(value: Value) -> Result<Vec<String>, StoreError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| StoreError::Command(format!("expected array-of-strings reply: {e}")))
}

fn command<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

impl StrongholdStore for RedisStore {
    async fn put_record(&self, record: &Stronghold) -> Result<(), StoreError> {
        let key = record_key(&record.id);
        // DEL + HSET as one batch: HSET alone merges fields, which would let
        // a cleared alliance_name survive from a prior write.
        let mut hset = vec!["HSET".to_string(), key.clone()];
        for (field, value) in fields::encode(record) {
            hset.push(field);
            hset.push(value);
        }
        self.pipeline(&[command(["DEL", &key]), hset]).await?;
        Ok(())
    }

    async fn get_record(&self, id: &StrongholdId) -> Result<Option<Stronghold>, StoreError> {
        let reply = self.execute(&command(["HGETALL", &record_key(id)])).await?;
        let flat = expect_string_array(reply)?;
        if flat.is_empty() {
            return Ok(None);
        }
        fields::decode_flat(&flat).map(Some)
    }

    async fn delete_record(&self, id: &StrongholdId) -> Result<bool, StoreError> {
        let reply = self.execute(&command(["DEL", &record_key(id)])).await?;
        Ok(expect_integer(&reply)? > 0)
    }

    async fn set_score(&self, id: &StrongholdId, score_millis: i64) -> Result<(), StoreError> {
        self.execute(&command([
            "ZADD",
            READY_INDEX_KEY,
            &score_millis.to_string(),
            id.as_str(),
        ]))
        .await?;
        Ok(())
    }

    async fn remove_score(&self, id: &StrongholdId) -> Result<bool, StoreError> {
        let reply = self
            .execute(&command(["ZREM", READY_INDEX_KEY, id.as_str()]))
            .await?;
        Ok(expect_integer(&reply)? > 0)
    }

    async fn ids_by_score(&self) -> Result<Vec<StrongholdId>, StoreError> {
        let reply = self
            .execute(&command(["ZRANGE", READY_INDEX_KEY, "0", "-1"]))
            .await?;
        Ok(expect_string_array(reply)?
            .into_iter()
            .map(StrongholdId::from_raw)
            .collect())
    }

    async fn get_records(&self, ids: &[StrongholdId]) -> Result<Vec<Stronghold>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let commands: Vec<Vec<String>> = ids
            .iter()
            .map(|id| command(["HGETALL", &record_key(id)]))
            .collect();
        let replies = self.pipeline(&commands).await?;

        let mut records = Vec::with_capacity(ids.len());
        for (id, reply) in ids.iter().zip(replies) {
            let flat = expect_string_array(reply)?;
            if flat.is_empty() {
                // Stale index entry; the read path tolerates it.
                tracing::debug!(%id, "Indexed stronghold has no record");
                continue;
            }
            records.push(fields::decode_flat(&flat)?);
        }
        Ok(records)
    }
}
