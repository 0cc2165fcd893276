//! Newline-delimited JSON record source

use crate::errors::Result;
use crate::telemetry::RawLogRecord;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Read one `RawLogRecord` per line from `reader` and send it down `sender`.
///
/// Blank lines are skipped and malformed lines are logged and skipped. Returns
/// the number of records sent once the reader hits EOF or the receiver is gone;
/// the sender is dropped on return, which closes the channel.
pub async fn forward_lines<R>(mut reader: R, sender: mpsc::Sender<RawLogRecord>) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut sent = 0;
    let mut line_number = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        line_number += 1;

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }

        let record: RawLogRecord = match serde_json::from_str(trimmed) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed record on line {}: {}", line_number, e);
                continue;
            }
        };

        if sender.send(record).await.is_err() {
            debug!("Record receiver closed, stopping source");
            break;
        }
        sent += 1;
    }

    debug!("Source finished after {} lines, {} records sent", line_number, sent);
    Ok(sent)
}
