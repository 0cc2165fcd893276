//! Redis adapter: construction-time probe and the streaming loop

use crate::config::{ReconnectPolicy, Route, RouteConfig};
use crate::errors::{AdapterError, Result};
use crate::pool::ConnectionPool;
use crate::registry::{AdapterFactory, AdapterRegistry, LogAdapter, StreamStats};
use crate::sink::{Dialer, RedisDialer, SinkConnection};
use crate::telemetry::RawLogRecord;
use crate::transformer::{LogTransformer, LogstashTransformer};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Scheme the Redis factory is registered under
pub const SCHEME: &str = "redis";

/// Suppresses repeated failure logs until a write succeeds again
#[derive(Debug, Default)]
pub struct MuteGate {
    muted: bool,
}

impl MuteGate {
    /// Whether a failure should be logged. Mutes the gate as a side effect.
    pub fn should_report(&mut self) -> bool {
        !std::mem::replace(&mut self.muted, true)
    }

    pub fn restore(&mut self) {
        self.muted = false;
    }
}

/// Which step of a delivery failed
enum Undelivered {
    /// RPUSH failed, nothing reached the list
    Push(AdapterError),
    /// RPUSH landed but the follow-up PUBLISH failed
    Publish(AdapterError),
}

/// Ships forwardable container log records into a Redis list
pub struct RedisAdapter<D: Dialer = RedisDialer> {
    adapter_id: String,
    config: RouteConfig,
    pool: ConnectionPool<D>,
    transformer: Box<dyn LogTransformer>,
}

impl RedisAdapter<RedisDialer> {
    /// Resolve `route` against the environment and connect to the server it names
    pub async fn connect(route: &Route) -> Result<Self> {
        let config = RouteConfig::from_route(route)?;
        let dialer = RedisDialer::from_config(&config);
        Self::with_dialer(config, dialer).await
    }
}

impl<D: Dialer> RedisAdapter<D> {
    /// Build the adapter and verify the sink once. This is the only place a
    /// sink failure is returned to the caller.
    pub async fn with_dialer(config: RouteConfig, dialer: D) -> Result<Self> {
        debug!(
            "Using Redis server '{}', password: {}, pushkey: '{}'",
            config.address,
            config.password.is_some(),
            config.key
        );

        let pool = ConnectionPool::new(dialer, config.pool);
        pool.check().await.map_err(|e| {
            AdapterError::Connect(format!(
                "Cannot connect to Redis server {}: {}",
                config.address, e
            ))
        })?;

        Ok(Self {
            adapter_id: Uuid::new_v4().to_string(),
            transformer: Box::new(LogstashTransformer::from_config(&config)),
            config,
            pool,
        })
    }

    pub fn with_transformer(mut self, transformer: Box<dyn LogTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    /// Drain `logstream` until it is closed.
    ///
    /// One connection is held for the whole run. Failures never stop the loop:
    /// the record is dropped and only the first failure after a successful
    /// write is logged.
    #[instrument(skip_all, fields(adapter = %self.adapter_id, key = %self.config.key))]
    pub async fn run(&self, mut logstream: mpsc::Receiver<RawLogRecord>) -> StreamStats {
        info!("start stream to {}", self.pool.address());

        let mut stats = StreamStats::default();
        let mut mute = MuteGate::default();

        // Hold one connection for the stream
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                self.report(&mut mute, &mut stats, &e);
                None
            }
        };

        while let Some(record) = logstream.recv().await {
            stats.received += 1;

            let Some(envelope) = self.transformer.transform(&record) else {
                stats.filtered += 1;
                continue;
            };

            let payload = match serde_json::to_vec(&envelope) {
                Ok(payload) => payload,
                Err(e) => {
                    stats.dropped += 1;
                    self.report(&mut mute, &mut stats, &AdapterError::from(e));
                    continue;
                }
            };

            // Borrow again after a failed write; the pool probes before handing it out
            if conn.is_none() && self.config.reconnect == ReconnectPolicy::OnFailure {
                match self.pool.acquire().await {
                    Ok(fresh) => conn = Some(fresh),
                    Err(e) => {
                        stats.dropped += 1;
                        self.report(&mut mute, &mut stats, &e);
                        continue;
                    }
                }
            }

            let Some(active) = conn.as_mut() else {
                stats.dropped += 1;
                let e = AdapterError::Connect(format!("no connection to {}", self.pool.address()));
                self.report(&mut mute, &mut stats, &e);
                continue;
            };

            match self.ship(active, &payload).await {
                Ok(()) => {
                    mute.restore();
                    stats.shipped += 1;
                    debug!(container = %record.container.name, "ok");
                }
                Err(Undelivered::Publish(e)) => {
                    stats.shipped += 1;
                    stats.unpublished += 1;
                    self.report(&mut mute, &mut stats, &e);
                    self.recycle(&mut conn).await;
                }
                Err(Undelivered::Push(e)) => {
                    stats.dropped += 1;
                    self.report(&mut mute, &mut stats, &e);
                    self.recycle(&mut conn).await;
                }
            }
        }

        // Channel closed, hand the connection back
        if let Some(conn) = conn {
            self.pool.release(conn).await;
        }

        info!(
            "stream closed: {} received, {} filtered, {} shipped, {} unpublished, {} dropped",
            stats.received, stats.filtered, stats.shipped, stats.unpublished, stats.dropped
        );
        stats
    }

    async fn ship(&self, conn: &mut D::Conn, payload: &[u8]) -> std::result::Result<(), Undelivered> {
        conn.rpush(&self.config.key, payload)
            .await
            .map_err(Undelivered::Push)?;
        if let Some(channel) = &self.config.channel {
            conn.publish(channel, payload)
                .await
                .map_err(Undelivered::Publish)?;
        }
        Ok(())
    }

    /// Give the held connection back to the pool after a failed write, so the
    /// next borrow probes it and only dials when it is really gone
    async fn recycle(&self, conn: &mut Option<D::Conn>) {
        if self.config.reconnect != ReconnectPolicy::OnFailure {
            return;
        }
        if let Some(held) = conn.take() {
            self.pool.release(held).await;
        }
    }

    fn report(&self, mute: &mut MuteGate, stats: &mut StreamStats, err: &AdapterError) {
        if mute.should_report() {
            stats.errors_logged += 1;
            error!("redis: {} error (muting until restored): {}", err.kind(), err);
        }
    }
}

#[async_trait]
impl<D: Dialer + 'static> LogAdapter for RedisAdapter<D> {
    async fn stream(&self, logstream: mpsc::Receiver<RawLogRecord>) -> StreamStats {
        self.run(logstream).await
    }
}

/// Factory for `redis://` routes
#[derive(Debug, Default)]
pub struct RedisAdapterFactory;

#[async_trait]
impl AdapterFactory for RedisAdapterFactory {
    async fn create(&self, route: &Route) -> Result<Box<dyn LogAdapter>> {
        let adapter = RedisAdapter::connect(route).await?;
        Ok(Box::new(adapter))
    }
}

/// Make the Redis adapter available under its scheme
pub fn register(registry: &mut AdapterRegistry) {
    registry.register(SCHEME, Arc::new(RedisAdapterFactory));
}
