//! Log record and envelope data structures

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Static metadata of the container a log line came from
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ContainerInfo {
    /// Full container identifier
    pub id: String,

    /// Display name as reported by the runtime, usually with a leading `/`
    pub name: String,

    /// Image reference, `repository[:tag]`
    pub image: String,

    /// Hostname declared in the container config
    #[serde(default)]
    pub hostname: String,

    /// Declared environment, `KEY=value` entries
    #[serde(default)]
    pub env: Vec<String>,
}

/// One log line handed over by the host runtime
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RawLogRecord {
    /// Payload of the line
    pub data: String,

    /// Emission time
    pub time: DateTime<Utc>,

    /// Stream the line was read from, `stdout` or `stderr`
    pub source: String,

    pub container: Arc<ContainerInfo>,
}

impl RawLogRecord {
    pub fn new(data: impl Into<String>, source: impl Into<String>, container: Arc<ContainerInfo>) -> Self {
        Self {
            data: data.into(),
            time: Utc::now(),
            source: source.into(),
            container,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }
}

/// Container fields of an envelope
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DockerFields {
    pub name: String,
    pub cid: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_tag: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_host: Option<String>,
}

/// Orchestrator fields lifted from the container environment
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct MarathonFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fake: Option<String>,
}

/// Structured unit written to the sink
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEnvelope {
    #[serde(rename = "type")]
    pub log_type: String,

    #[serde(rename = "@timestamp")]
    pub timestamp: String,

    pub host: String,

    /// The payload decoded as a JSON object
    pub data: Map<String, Value>,

    pub docker: DockerFields,

    pub marathon: MarathonFields,
}

/// RFC 3339 rendering with nanosecond precision, `Z` suffixed
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
