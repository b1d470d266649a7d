//! On-disk format of the history file
//!
//! ```json
//! { "version": 1, "retention": 100,
//!   "services": { "<project>::<service>": { "nextSeq": 4, "events": [...] } } }
//! ```

use super::bucket::HistoryBucket;
use crate::error::{Error, Result};
use crate::event::HistoryEvent;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

const FILE_VERSION: u32 = 1;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile<'a> {
    version: u32,
    retention: usize,
    services: &'a BTreeMap<String, HistoryBucket>,
}

/// Serialize every bucket into the file format
pub(crate) fn encode(buckets: &BTreeMap<String, HistoryBucket>, retention: usize) -> Result<String> {
    let file = HistoryFile {
        version: FILE_VERSION,
        retention,
        services: buckets,
    };
    serde_json::to_string_pretty(&file).map_err(|e| Error::Serialization(e.to_string()))
}

/// Parse a history file, dropping whatever does not validate
pub(crate) fn decode(raw: &str, retention: usize) -> BTreeMap<String, HistoryBucket> {
    let mut buckets = BTreeMap::new();

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable history file");
            return buckets;
        }
    };
    let Some(services) = value.get("services").and_then(Value::as_object) else {
        return buckets;
    };

    for (key, raw_bucket) in services {
        let Some(next_seq) = raw_bucket.get("nextSeq").and_then(Value::as_u64) else {
            debug!(key = %key, "Dropping history bucket without nextSeq");
            continue;
        };
        let Some(raw_events) = raw_bucket.get("events").and_then(Value::as_array) else {
            debug!(key = %key, "Dropping history bucket without events");
            continue;
        };

        let mut events: Vec<HistoryEvent> = raw_events
            .iter()
            .filter_map(|raw| serde_json::from_value(raw.clone()).ok())
            .collect();
        let dropped = raw_events.len() - events.len();
        if dropped > 0 {
            debug!(key = %key, dropped, "Dropped malformed history events");
        }
        events.sort_by_key(|e| e.seq);
        events.dedup_by_key(|e| e.seq);

        let mut bucket = HistoryBucket { next_seq, events };
        bucket.trim(retention);
        bucket.next_seq = bucket.next_seq.max(bucket.latest_seq() + 1).max(1);
        buckets.insert(key.clone(), bucket);
    }

    buckets
}

/// Write the file next to its final location, then move it into place
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("create {}: {e}", parent.display())))?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| Error::Storage(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::Storage(format!("rename {}: {e}", path.display())))?;
    Ok(())
}
