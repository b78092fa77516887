use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::PersistenceError;
use crate::record::{self, DailyRecord, DateKey};
use crate::remote::{RecordsRemote, SnapshotEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    /// No snapshot received yet.
    Loading,
    Live,
    /// The feed reported an error; the mapping below is the last-known state.
    Degraded(String),
}

/// The full dateKey -> record mapping, fed by the remote subscription and
/// nothing else. Writes do not touch the mapping directly; their effect
/// comes back through the feed.
pub struct RecordStore {
    remote: Arc<dyn RecordsRemote>,
    records: BTreeMap<DateKey, DailyRecord>,
    status: StoreStatus,
}

impl RecordStore {
    pub fn new(remote: Arc<dyn RecordsRemote>) -> Self {
        Self {
            remote,
            records: BTreeMap::new(),
            status: StoreStatus::Loading,
        }
    }

    pub fn get(&self, key: &DateKey) -> Option<&DailyRecord> {
        self.records.get(key)
    }

    /// Membership is key presence, never content inspection.
    pub fn has_record(&self, key: &DateKey) -> bool {
        self.records.contains_key(key)
    }

    /// Chronological iteration, for trend/export consumers.
    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &DailyRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    /// Applies one feed event and returns the keys whose value changed
    /// (including keys that disappeared), for routing to the reconciler.
    pub fn apply_event(&mut self, event: SnapshotEvent) -> Vec<DateKey> {
        match event {
            SnapshotEvent::Snapshot(map) => {
                let mut next = BTreeMap::new();
                for (raw_key, doc) in map {
                    match DateKey::parse(&raw_key) {
                        Ok(key) => {
                            next.insert(key, record::normalize(&doc));
                        }
                        Err(e) => warn!(error = %e, "skipping document with bad id"),
                    }
                }

                let mut changed: Vec<DateKey> = Vec::new();
                for (key, value) in &next {
                    if self.records.get(key) != Some(value) {
                        changed.push(key.clone());
                    }
                }
                for key in self.records.keys() {
                    if !next.contains_key(key) {
                        changed.push(key.clone());
                    }
                }

                debug!(records = next.len(), changed = changed.len(), "snapshot applied");
                self.records = next;
                self.status = StoreStatus::Live;
                changed
            }
            SnapshotEvent::Error(message) => {
                error!(%message, "snapshot feed error; keeping last-known mapping");
                self.status = StoreStatus::Degraded(message);
                Vec::new()
            }
        }
    }

    /// Merge-writes `patch` into the document at `key`.
    pub async fn write(&self, key: &DateKey, patch: Value) -> Result<(), PersistenceError> {
        self.remote.set_merge(key.as_str(), patch).await
    }
}
