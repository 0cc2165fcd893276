//! Redis Log Adapter Library
//!
//! This library turns container log lines into Logstash-style JSON envelopes
//! and pushes them onto a Redis list for downstream log aggregation.

pub mod adapter;
pub mod config;
pub mod errors;
pub mod pool;
pub mod registry;
pub mod sink;
pub mod source;
pub mod telemetry;
pub mod transformer;

pub use adapter::{RedisAdapter, RedisAdapterFactory};
pub use config::{ReconnectPolicy, Route, RouteConfig};
pub use errors::{AdapterError, Result};
pub use registry::{AdapterFactory, AdapterRegistry, LogAdapter, StreamStats};
pub use telemetry::{ContainerInfo, DockerFields, LogEnvelope, MarathonFields, RawLogRecord};
pub use transformer::{LogTransformer, LogstashTransformer};
