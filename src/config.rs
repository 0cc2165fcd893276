//! Route descriptors and layered configuration resolution

use crate::errors::{AdapterError, Result};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use url::Url;

/// Port appended to sink addresses that do not carry one
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Routing key used when neither the route nor the environment names one
pub const DEFAULT_KEY: &str = "logspout";

/// Envelope `type` tag used when none is configured
pub const DEFAULT_LOG_TYPE: &str = "logspout";

/// Maximum number of idle sink connections kept by the pool
pub const DEFAULT_MAX_IDLE: usize = 3;

/// Idle connections older than this are closed instead of reused
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(240);

/// Dial timeout applied when opening a sink connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment lookup used by the resolver. Returns `None` for unset variables.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup bound to the process environment
pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Whether verbose diagnostics were requested through `DEBUG`
pub fn debug_enabled(env: EnvLookup<'_>) -> bool {
    env("DEBUG").is_some_and(|value| !value.is_empty())
}

/// A destination as handed over by the host: scheme, address and free-form options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Adapter scheme, e.g. `redis`
    pub adapter: String,

    /// Sink address, `host` or `host:port`
    pub address: String,

    /// Per-route options
    pub options: HashMap<String, String>,
}

impl Route {
    pub fn new(adapter: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            address: address.into(),
            options: HashMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Parse a route URI such as `redis://cache:6380?key=logs&password=secret`
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| AdapterError::Config(format!("invalid route '{}': {}", uri, e)))?;

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| AdapterError::Config(format!("route '{}' has no address", uri)))?;

        let address = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let options = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            adapter: url.scheme().to_string(),
            address,
            options,
        })
    }

    /// Option value, treating an empty string as unset
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// What to do with the held sink connection after a failed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Return the connection to the pool and borrow again before the next
    /// message, so a dead connection is replaced after its probe fails
    OnFailure,

    /// Keep the connection for the whole stream lifetime
    Never,
}

impl ReconnectPolicy {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "on-failure" | "true" | "yes" => Ok(ReconnectPolicy::OnFailure),
            "never" | "false" | "no" => Ok(ReconnectPolicy::Never),
            other => Err(AdapterError::Config(format!(
                "unknown reconnect policy '{}'",
                other
            ))),
        }
    }
}

/// Idle set limits for the connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_idle: usize,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Resolved, immutable settings for one adapter instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    /// Sink address in `host:port` form
    pub address: String,

    /// Name of the destination list
    pub key: String,

    /// Shared secret sent with `AUTH`
    pub password: Option<String>,

    /// Static host tag copied into every envelope
    pub docker_host: Option<String>,

    /// Envelope `type` tag
    pub log_type: String,

    /// Optional channel every envelope is also published on
    pub channel: Option<String>,

    pub reconnect: ReconnectPolicy,

    pub connect_timeout: Duration,

    pub pool: PoolConfig,
}

impl RouteConfig {
    /// Resolve a route against the process environment
    pub fn from_route(route: &Route) -> Result<Self> {
        Self::resolve(route, &process_env)
    }

    /// Resolve every field as route option, then environment, then default.
    /// Empty values at any layer fall through to the next one.
    pub fn resolve(route: &Route, env: EnvLookup<'_>) -> Result<Self> {
        let lookup = |option: Option<&str>, var: &str| -> Option<String> {
            option
                .map(str::to_string)
                .or_else(|| env(var).filter(|value| !value.is_empty()))
        };

        if route.address.trim().is_empty() {
            return Err(AdapterError::Config("route address cannot be empty".to_string()));
        }

        let reconnect = match lookup(route.option("reconnect"), "REDIS_RECONNECT") {
            Some(value) => ReconnectPolicy::parse(&value)?,
            None => ReconnectPolicy::OnFailure,
        };

        let connect_timeout = match lookup(route.option("connect_timeout"), "REDIS_CONNECT_TIMEOUT") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    AdapterError::Config(format!("invalid connect timeout '{}'", value))
                })?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        let config = Self {
            address: normalize_address(route.address.trim()),
            key: lookup(route.option("key"), "REDIS_KEY").unwrap_or_else(|| DEFAULT_KEY.to_string()),
            password: lookup(route.option("password"), "REDIS_PASSWORD"),
            docker_host: lookup(None, "REDIS_DOCKER_HOST"),
            log_type: lookup(route.option("type"), "REDIS_TYPE")
                .unwrap_or_else(|| DEFAULT_LOG_TYPE.to_string()),
            channel: lookup(route.option("channel"), "REDIS_CHANNEL"),
            reconnect,
            connect_timeout,
            pool: PoolConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(AdapterError::Config("key cannot be empty".to_string()));
        }

        if self.connect_timeout.is_zero() {
            return Err(AdapterError::Config(
                "connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.pool.max_idle == 0 {
            return Err(AdapterError::Config(
                "pool max_idle must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Append the default Redis port when the address has none
pub fn normalize_address(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, DEFAULT_REDIS_PORT)
    }
}
