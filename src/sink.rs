//! Redis sink connections

use crate::config::RouteConfig;
use crate::errors::{AdapterError, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// A live connection to the sink
#[async_trait]
pub trait SinkConnection: Send {
    /// Liveness probe
    async fn ping(&mut self) -> Result<()>;

    /// Append `payload` to the list at `key`
    async fn rpush(&mut self, key: &str, payload: &[u8]) -> Result<()>;

    /// Publish `payload` on `channel`
    async fn publish(&mut self, channel: &str, payload: &[u8]) -> Result<()>;
}

/// Opens new sink connections, including any handshake
#[async_trait]
pub trait Dialer: Send + Sync {
    type Conn: SinkConnection + 'static;

    async fn dial(&self) -> Result<Self::Conn>;

    /// Address dialed, for log lines
    fn address(&self) -> &str;
}

/// Connection to a Redis server
pub struct RedisConnection {
    inner: MultiplexedConnection,
}

#[async_trait]
impl SinkConnection for RedisConnection {
    async fn ping(&mut self) -> Result<()> {
        let reply: redis::Value = redis::cmd("PING")
            .query_async(&mut self.inner)
            .await
            .map_err(|e| AdapterError::Connect(format!("PING failed: {}", e)))?;
        debug!("Redis PING reply: {:?}", reply);
        Ok(())
    }

    async fn rpush(&mut self, key: &str, payload: &[u8]) -> Result<()> {
        let _: i64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(payload)
            .query_async(&mut self.inner)
            .await
            .map_err(|e| AdapterError::SinkWrite(format!("RPUSH {}: {}", key, e)))?;
        Ok(())
    }

    async fn publish(&mut self, channel: &str, payload: &[u8]) -> Result<()> {
        let _: i64 = redis::cmd("PUBLISH")
            .arg(channel)
            .arg(payload)
            .query_async(&mut self.inner)
            .await
            .map_err(|e| AdapterError::SinkWrite(format!("PUBLISH {}: {}", channel, e)))?;
        Ok(())
    }
}

/// Dials Redis over TCP and authenticates when a password is configured
#[derive(Debug, Clone)]
pub struct RedisDialer {
    address: String,
    password: Option<String>,
    connect_timeout: Duration,
}

impl RedisDialer {
    pub fn new(address: String, password: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            address,
            password,
            connect_timeout,
        }
    }

    pub fn from_config(config: &RouteConfig) -> Self {
        Self::new(
            config.address.clone(),
            config.password.clone(),
            config.connect_timeout,
        )
    }
}

#[async_trait]
impl Dialer for RedisDialer {
    type Conn = RedisConnection;

    async fn dial(&self) -> Result<RedisConnection> {
        info!("Dialing Redis at {}", self.address);

        let url = format!("redis://{}/", self.address);
        let client = redis::Client::open(url.as_str())?;

        let mut inner = timeout(self.connect_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                AdapterError::Connect(format!("timed out connecting to {}", self.address))
            })?
            .map_err(|e| {
                AdapterError::Connect(format!("cannot connect to {}: {}", self.address, e))
            })?;

        if let Some(password) = &self.password {
            let _: redis::Value = redis::cmd("AUTH")
                .arg(password)
                .query_async(&mut inner)
                .await
                .map_err(|e| {
                    AdapterError::Connect(format!(
                        "authentication rejected by {}: {}",
                        self.address, e
                    ))
                })?;
        }

        Ok(RedisConnection { inner })
    }

    fn address(&self) -> &str {
        &self.address
    }
}
