//! Broker client.
//!
//! The [`Broker`] trait is the seam between the delivery pipeline and the
//! message queue. [`RedisBroker`] publishes each message to a Redis stream
//! whose key is the topic:
//!
//! ```text
//! XADD <topic> [MAXLEN ~ <max_len>] * headers <json> payload <raw bytes>
//! ```
//!
//! Consumers read `headers` as a JSON object of single string values and
//! `payload` as the untouched webhook body.

use async_trait::async_trait;
use deadpool_redis::redis::{cmd, Cmd};
use deadpool_redis::{Config, Pool, Runtime};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::message::OutboundMessage;

/// Errors raised while connecting to the broker at startup.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("failed to create connection pool: {0}")]
    Pool(#[from] deadpool_redis::CreatePoolError),

    #[error("broker unreachable: {0}")]
    Unreachable(String),
}

/// Errors raised while publishing a single message.
#[derive(Error, Debug)]
pub enum PublishError {
    /// No connection could be checked out of the pool
    #[error("connection error: {0}")]
    Connection(#[from] deadpool_redis::PoolError),

    /// Redis rejected the command
    #[error("redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    /// Headers could not be encoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker answered without accepting the message
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// A message broker the relay publishes to.
///
/// Implementations must be `Send + Sync`; a single instance is shared by
/// every publish task.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Short name used in logs (e.g. "redis")
    fn name(&self) -> &str;

    /// Publish one message to its topic.
    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError>;

    /// Release connections. Called once, after all publishes have finished.
    async fn close(&self);
}

/// Redis Streams broker backed by a deadpool connection pool.
#[derive(Clone)]
pub struct RedisBroker {
    pool: Pool,
    max_len: Option<usize>,
}

impl RedisBroker {
    /// Build the pool and check connectivity with `PING`.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let pool = Config::from_url(config.url.clone()).create_pool(Some(Runtime::Tokio1))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| BrokerError::Unreachable(e.to_string()))?;
        let _: String = cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| BrokerError::Unreachable(e.to_string()))?;

        info!(max_len = ?config.max_len, "Connected to Redis broker");

        Ok(Self {
            pool,
            max_len: config.max_len,
        })
    }
}

#[async_trait]
impl Broker for RedisBroker {
    fn name(&self) -> &str {
        "redis"
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        let command = xadd_command(message, self.max_len)?;
        let mut conn = self.pool.get().await?;

        let id: Option<String> = command.query_async(&mut conn).await?;
        let id = id.ok_or_else(|| {
            PublishError::Rejected(format!("XADD to {} returned no entry id", message.topic))
        })?;

        debug!(id = %id, topic = %message.topic, "XADD accepted");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
        info!("Redis broker connections closed");
    }
}

/// Build `XADD <topic> [MAXLEN ~ <n>] * headers <json> payload <bytes>`.
fn xadd_command(message: &OutboundMessage, max_len: Option<usize>) -> Result<Cmd, PublishError> {
    let headers = serde_json::to_string(&message.headers)?;

    let mut command = cmd("XADD");
    command.arg(&message.topic);
    if let Some(max_len) = max_len {
        command.arg("MAXLEN").arg("~").arg(max_len);
    }
    command
        .arg("*")
        .arg("headers")
        .arg(headers)
        .arg("payload")
        .arg(&message.payload[..]);

    Ok(command)
}
