//! HistoryBucket - one service's counter and retained events

use crate::event::HistoryEvent;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryBucket {
    pub(crate) next_seq: u64,
    pub(crate) events: Vec<HistoryEvent>,
}

impl Default for HistoryBucket {
    fn default() -> Self {
        Self {
            next_seq: 1,
            events: Vec::new(),
        }
    }
}

impl HistoryBucket {
    /// Take the next sequence number
    pub(crate) fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Keep only the newest `retention` events
    pub(crate) fn trim(&mut self, retention: usize) {
        if self.events.len() > retention {
            let excess = self.events.len() - retention;
            self.events.drain(..excess);
        }
    }

    /// Newest retained seq, 0 when empty
    pub(crate) fn latest_seq(&self) -> u64 {
        self.events.last().map_or(0, |e| e.seq)
    }
}
