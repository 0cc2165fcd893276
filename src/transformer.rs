//! Turns raw container log lines into Logstash-style envelopes

use crate::config::RouteConfig;
use crate::telemetry::{
    format_timestamp, DockerFields, LogEnvelope, MarathonFields, RawLogRecord,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level payload key that marks a line as coming from a structured logger
pub const TIMESTAMP_KEY: &str = "timestamp";

pub const MARATHON_APP_ID: &str = "MARATHON_APP_ID";
pub const MARATHON_APP_VERSION: &str = "MARATHON_APP_VERSION";
pub const FAKE_FLAG: &str = "FAKE";

const SHORT_ID_LEN: usize = 12;

/// Trait for deciding forwardability and building envelopes
pub trait LogTransformer: Send + Sync {
    /// `None` means the record is not forwardable and must be dropped silently
    fn transform(&self, record: &RawLogRecord) -> Option<LogEnvelope>;
}

/// Transformer producing the `type`/`@timestamp`/`docker`/`marathon` envelope
#[derive(Debug, Clone)]
pub struct LogstashTransformer {
    log_type: String,
    docker_host: Option<String>,
}

impl LogstashTransformer {
    pub fn new(log_type: impl Into<String>, docker_host: Option<String>) -> Self {
        Self {
            log_type: log_type.into(),
            docker_host,
        }
    }

    pub fn from_config(config: &RouteConfig) -> Self {
        Self::new(config.log_type.clone(), config.docker_host.clone())
    }
}

impl LogTransformer for LogstashTransformer {
    fn transform(&self, record: &RawLogRecord) -> Option<LogEnvelope> {
        let container = &record.container;
        let (image, image_tag) = split_image(&container.image);

        let data = parse_payload(&record.data)?;
        if !data.contains_key(TIMESTAMP_KEY) {
            return None;
        }

        debug!(container = %container.name, env = ?container.env, "building envelope");

        Some(LogEnvelope {
            log_type: self.log_type.clone(),
            timestamp: format_timestamp(&record.time),
            host: container.hostname.clone(),
            data,
            docker: DockerFields {
                name: display_name(&container.name).to_string(),
                cid: short_id(&container.id).to_string(),
                image: image.to_string(),
                image_tag: image_tag.to_string(),
                source: record.source.clone(),
                docker_host: self.docker_host.clone(),
            },
            marathon: MarathonFields {
                id: env_value(MARATHON_APP_ID, &container.env),
                version: env_value(MARATHON_APP_VERSION, &container.env),
                fake: env_value(FAKE_FLAG, &container.env),
            },
        })
    }
}

/// Best-effort decode of the payload as a JSON object.
/// Non-JSON payloads and non-object documents yield `None`.
fn parse_payload(data: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            debug!("payload is not JSON: {}", e);
            None
        }
    }
}

/// Split `repository[:tag]` on the first `:`
pub fn split_image(image: &str) -> (&str, &str) {
    image.split_once(':').unwrap_or((image, ""))
}

/// First 12 characters of a container id. Shorter ids are returned whole.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Display name with a single leading `/` removed
pub fn display_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Value of `key` in a `KEY=value` list.
///
/// Only the part before the first `=` is compared, and the value returned is
/// whatever follows the last `=`. `A=b=c` therefore yields `c`; values that
/// contain `=` are not supported.
pub fn env_value(key: &str, env: &[String]) -> Option<String> {
    env.iter().find_map(|entry| {
        let mut parts = entry.split('=');
        if parts.next() == Some(key) {
            entry.rsplit('=').next().map(str::to_string)
        } else {
            None
        }
    })
}
