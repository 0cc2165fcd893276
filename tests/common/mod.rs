//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod mock_redis;

use redis_log_adapter::{ContainerInfo, RawLogRecord};
use std::sync::Arc;

pub fn container() -> Arc<ContainerInfo> {
    Arc::new(ContainerInfo {
        id: "f00dfeedbeefcafe0123456789".to_string(),
        name: "/billing".to_string(),
        image: "registry.example.com/billing:2.4.1".to_string(),
        hostname: "billing-7c9f".to_string(),
        env: vec![
            "MARATHON_APP_ID=/billing".to_string(),
            "MARATHON_APP_VERSION=2024-02-11T10:00:00.000Z".to_string(),
        ],
    })
}

pub fn structured_record(message: &str) -> RawLogRecord {
    let data = serde_json::json!({
        "timestamp": "2024-02-11T10:00:01Z",
        "level": "info",
        "message": message,
    });
    RawLogRecord::new(data.to_string(), "stdout", container())
}

pub fn plain_record(line: &str) -> RawLogRecord {
    RawLogRecord::new(line, "stderr", container())
}
