//! Error types for the Redis log adapter

use std::fmt;

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug)]
pub enum AdapterError {
    /// Sink unreachable, dial timed out or credential rejected
    Connect(String),

    /// Redis driver failure while establishing a connection
    Redis(redis::RedisError),

    /// Envelope could not be encoded
    Serialization(serde_json::Error),

    /// Queue append or publish failed
    SinkWrite(String),

    /// Configuration error
    Config(String),

    /// No factory registered for a route scheme
    UnknownAdapter(String),

    /// IO operation failed
    Io(std::io::Error),

    /// Generic error with message
    Other(String),
}

impl AdapterError {
    /// Short category name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Connect(_) | AdapterError::Redis(_) => "connect",
            AdapterError::Serialization(_) => "serialization",
            AdapterError::SinkWrite(_) => "sink write",
            AdapterError::Config(_) => "config",
            AdapterError::UnknownAdapter(_) => "registry",
            AdapterError::Io(_) => "io",
            AdapterError::Other(_) => "other",
        }
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Connect(msg) => write!(f, "Connect error: {}", msg),
            AdapterError::Redis(err) => write!(f, "Redis error: {}", err),
            AdapterError::Serialization(err) => write!(f, "Serialization error: {}", err),
            AdapterError::SinkWrite(msg) => write!(f, "Sink write error: {}", msg),
            AdapterError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AdapterError::UnknownAdapter(scheme) => {
                write!(f, "No adapter registered for scheme '{}'", scheme)
            }
            AdapterError::Io(err) => write!(f, "IO error: {}", err),
            AdapterError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AdapterError::Redis(err) => Some(err),
            AdapterError::Serialization(err) => Some(err),
            AdapterError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::Io(err)
    }
}

impl From<redis::RedisError> for AdapterError {
    fn from(err: redis::RedisError) -> Self {
        AdapterError::Redis(err)
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Serialization(err)
    }
}
