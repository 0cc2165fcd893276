//! Pool of idle sink connections

use crate::config::PoolConfig;
use crate::errors::Result;
use crate::sink::{Dialer, SinkConnection};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

struct IdleConnection<C> {
    conn: C,
    returned_at: Instant,
}

/// Lazily dialing connection pool with an idle cap, idle timeout and
/// test-on-borrow liveness probe
pub struct ConnectionPool<D: Dialer> {
    dialer: D,
    config: PoolConfig,
    idle: Mutex<VecDeque<IdleConnection<D::Conn>>>,
}

impl<D: Dialer> ConnectionPool<D> {
    pub fn new(dialer: D, config: PoolConfig) -> Self {
        Self {
            dialer,
            config,
            idle: Mutex::new(VecDeque::with_capacity(config.max_idle)),
        }
    }

    pub fn address(&self) -> &str {
        self.dialer.address()
    }

    /// Hand out a connection: the most recently returned idle one that is
    /// neither stale nor failing its probe, else a freshly dialed one.
    pub async fn acquire(&self) -> Result<D::Conn> {
        loop {
            let candidate = self.idle.lock().await.pop_front();
            let Some(IdleConnection { mut conn, returned_at }) = candidate else {
                break;
            };

            if returned_at.elapsed() > self.config.idle_timeout {
                debug!("Closing connection idle since {:?}", returned_at);
                continue;
            }

            match conn.ping().await {
                Ok(()) => return Ok(conn),
                Err(e) => warn!("Discarding idle connection to {}: {}", self.address(), e),
            }
        }

        self.dialer.dial().await
    }

    /// Return a connection to the idle set, closing the oldest one past the cap
    pub async fn release(&self, conn: D::Conn) {
        let mut idle = self.idle.lock().await;
        idle.push_front(IdleConnection {
            conn,
            returned_at: Instant::now(),
        });

        while idle.len() > self.config.max_idle {
            idle.pop_back();
            debug!("Idle cap of {} reached, closing oldest connection", self.config.max_idle);
        }
    }

    /// Acquire, probe and release once so an unreachable sink fails early
    pub async fn check(&self) -> Result<()> {
        let mut conn = self.acquire().await?;
        conn.ping().await?;
        debug!("Redis at {} answered PING", self.address());
        self.release(conn).await;
        Ok(())
    }

    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }
}
