use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{PersistenceError, SubscriptionError};
use crate::record::merge_value;

/// Raw document id -> JSON document, as delivered by the remote collection.
pub type SnapshotMap = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    /// Full current state of the collection. The first event after
    /// subscribing carries the initial mapping.
    Snapshot(SnapshotMap),
    /// The feed reported an error; the connection may recover on its own.
    Error(String),
}

/// The keyed-document store behind the daily records: a live snapshot feed
/// over the whole per-user collection plus a merge-write to one document.
/// Exactly one subscription is opened per session lifetime.
#[async_trait]
pub trait RecordsRemote: Send + Sync {
    async fn subscribe(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<SnapshotEvent>, SubscriptionError>;

    /// Merge-writes `patch` into the document at `key`: fields present in
    /// the patch are updated, everything else in the remote document is left
    /// untouched. Idempotent under retry.
    async fn set_merge(&self, key: &str, patch: Value) -> Result<(), PersistenceError>;
}

/// In-memory backend, used by `Session::fake` and tests the same way the
/// real backend is used: writes echo back through the snapshot feed.
pub struct MemoryRemote {
    docs: Mutex<SnapshotMap>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SnapshotEvent>>>,
    fail_writes: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Injects a document as if another device had written it, and notifies
    /// subscribers.
    pub async fn seed(&self, key: &str, doc: Value) {
        self.docs.lock().await.insert(key.to_string(), doc);
        self.broadcast().await;
    }

    /// Pushes a feed error to all subscribers without touching documents.
    pub async fn emit_error(&self, message: &str) {
        self.fan_out(SnapshotEvent::Error(message.to_string())).await;
    }

    /// Makes subsequent `set_merge` calls fail, for exercising retry paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn doc(&self, key: &str) -> Option<Value> {
        self.docs.lock().await.get(key).cloned()
    }

    async fn broadcast(&self) {
        let snapshot = self.docs.lock().await.clone();
        self.fan_out(SnapshotEvent::Snapshot(snapshot)).await;
    }

    async fn fan_out(&self, event: SnapshotEvent) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordsRemote for MemoryRemote {
    async fn subscribe(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<SnapshotEvent>, SubscriptionError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = self.docs.lock().await.clone();
        tx.send(SnapshotEvent::Snapshot(snapshot))
            .map_err(|_| SubscriptionError::ChannelClosed)?;
        self.subscribers.lock().await.push(tx);
        Ok(rx)
    }

    async fn set_merge(&self, key: &str, patch: Value) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Remote("injected write failure".into()));
        }
        {
            let mut docs = self.docs.lock().await;
            let doc = docs
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            merge_value(doc, &patch);
        }
        debug!(key, "merge-write applied");
        self.broadcast().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribe_delivers_initial_snapshot() {
        let remote = MemoryRemote::new();
        remote.seed("2024-05-01", json!({ "diary": "hi" })).await;

        let mut rx = remote.subscribe().await.expect("subscribe");
        match rx.recv().await.expect("initial event") {
            SnapshotEvent::Snapshot(map) => {
                assert_eq!(map.len(), 1);
                assert_eq!(map["2024-05-01"]["diary"], json!("hi"));
            }
            SnapshotEvent::Error(e) => panic!("unexpected error event: {e}"),
        }
    }

    #[tokio::test]
    async fn merge_write_preserves_other_fields_and_notifies() {
        let remote = MemoryRemote::new();
        remote.seed("2024-05-01", json!({ "diary": "keep me" })).await;
        let mut rx = remote.subscribe().await.expect("subscribe");
        let _initial = rx.recv().await;

        remote
            .set_merge("2024-05-01", json!({ "overtime": { "type": "2h" } }))
            .await
            .expect("write");

        let doc = remote.doc("2024-05-01").await.expect("doc exists");
        assert_eq!(doc["diary"], json!("keep me"));
        assert_eq!(doc["overtime"]["type"], json!("2h"));

        match rx.recv().await.expect("echo event") {
            SnapshotEvent::Snapshot(map) => {
                assert_eq!(map["2024-05-01"]["diary"], json!("keep me"))
            }
            SnapshotEvent::Error(e) => panic!("unexpected error event: {e}"),
        }
    }

    #[tokio::test]
    async fn injected_failures_surface_as_persistence_errors() {
        let remote = MemoryRemote::new();
        remote.set_fail_writes(true);
        let err = remote
            .set_merge("2024-05-01", json!({}))
            .await
            .expect_err("write should fail");
        assert!(matches!(err, PersistenceError::Remote(_)));
        assert!(remote.doc("2024-05-01").await.is_none());
    }
}
