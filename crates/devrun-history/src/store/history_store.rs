//! ServiceHistoryStore - append, cursor reads and project cleanup

use super::bucket::HistoryBucket;
use super::helpers::{bucket_key, clamp_retention, project_prefix};
use super::persist;
use crate::error::{Error, Result};
use crate::event::{HistoryEvent, NewHistoryEvent};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One page of a cursor-based history read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    /// Events with `seq > afterSeq`, oldest first
    pub events: Vec<HistoryEvent>,
    /// Newest retained seq in the bucket (0 when empty)
    pub latest_seq: u64,
    /// Cursor for the next call
    pub next_after_seq: u64,
    /// Whether events newer than `next_after_seq` remain
    pub has_more: bool,
    /// Number of events currently retained in the bucket
    pub retained: usize,
}

impl HistoryPage {
    fn empty(after_seq: u64) -> Self {
        Self {
            events: Vec::new(),
            latest_seq: 0,
            next_after_seq: after_seq,
            has_more: false,
            retained: 0,
        }
    }
}

/// Durable, retention-bounded history of service lifecycle events
///
/// All buckets sit behind one async mutex, which also orders file writes.
pub struct ServiceHistoryStore {
    retention: usize,
    path: Option<PathBuf>,
    buckets: Mutex<BTreeMap<String, HistoryBucket>>,
}

impl ServiceHistoryStore {
    /// Open a file-backed store, loading whatever valid history the file holds
    pub async fn open(path: impl Into<PathBuf>, retention: usize) -> Result<Self> {
        let path = path.into();
        let retention = clamp_retention(retention);

        let buckets = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => persist::decode(&raw, retention),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Storage(format!("read {}: {e}", path.display()))),
        };

        info!(
            path = %path.display(),
            buckets = buckets.len(),
            retention,
            "History store opened"
        );

        Ok(Self {
            retention,
            path: Some(path),
            buckets: Mutex::new(buckets),
        })
    }

    /// Create a store that never touches the disk
    #[must_use]
    pub fn in_memory(retention: usize) -> Self {
        Self {
            retention: clamp_retention(retention),
            path: None,
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Events kept per bucket
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an event, assigning its seq and timestamp
    ///
    /// The event stays in memory even when persisting fails; the write error
    /// is returned to the caller.
    pub async fn append(&self, input: NewHistoryEvent) -> Result<HistoryEvent> {
        let mut buckets = self.buckets.lock().await;

        let key = bucket_key(&input.project_id, &input.service_name);
        let bucket = buckets.entry(key).or_default();
        let seq = bucket.take_seq();
        let event = input.into_event(seq, Utc::now());
        bucket.events.push(event.clone());
        bucket.trim(self.retention);

        debug!(
            project_id = %event.project_id,
            service = %event.service_name,
            seq,
            event_type = %event.event_type,
            "History event appended"
        );

        self.persist(&buckets).await?;
        Ok(event)
    }

    /// Events after `after_seq`, at most `limit` of them
    pub async fn list(
        &self,
        project_id: &str,
        service_name: &str,
        after_seq: u64,
        limit: usize,
    ) -> HistoryPage {
        let buckets = self.buckets.lock().await;
        let Some(bucket) = buckets.get(&bucket_key(project_id, service_name)) else {
            return HistoryPage::empty(after_seq);
        };

        let events: Vec<HistoryEvent> = bucket
            .events
            .iter()
            .filter(|e| e.seq > after_seq)
            .take(limit)
            .cloned()
            .collect();
        let latest_seq = bucket.latest_seq();
        let next_after_seq = events.last().map_or(after_seq, |e| e.seq);

        HistoryPage {
            events,
            latest_seq,
            next_after_seq,
            has_more: next_after_seq < latest_seq,
            retained: bucket.events.len(),
        }
    }

    /// Delete every bucket of a project; returns whether anything was removed
    pub async fn clear_project(&self, project_id: &str) -> Result<bool> {
        let mut buckets = self.buckets.lock().await;
        let prefix = project_prefix(project_id);
        let before = buckets.len();
        buckets.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - buckets.len();

        if removed == 0 {
            return Ok(false);
        }

        info!(project_id = %project_id, removed, "Cleared project history");
        self.persist(&buckets).await?;
        Ok(true)
    }

    async fn persist(&self, buckets: &BTreeMap<String, HistoryBucket>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = persist::encode(buckets, self.retention)?;
        persist::write_atomic(path, &contents).await
    }
}
