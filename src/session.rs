use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::draft::{CloseOutcome, DraftReconciler, DraftState};
use crate::error::{DraftError, PersistenceError, SubscriptionError};
use crate::images::{EncodedPhoto, ImagePipeline, PhotoDest};
use crate::prefs::{self, UiPrefs};
use crate::record::{DailyRecord, DateKey, MealSlot, PHOTO_SLOTS};
use crate::remote::{MemoryRemote, RecordsRemote, SnapshotEvent};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Draft was clean (or edited back to its saved state); nothing written.
    NoChanges,
    /// A write is already in flight; this call was a no-op.
    AlreadySaving,
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoOutcome {
    Attached(EncodedPhoto),
    /// A newer upload to the same slot started before this one finished.
    Superseded,
}

/// One authenticated user's session: record store, open-day draft and photo
/// pipeline, driven from a single logical thread. Remote snapshots queue on
/// a channel and never interleave inside an edit or save.
pub struct Session {
    config: Arc<AppConfig>,
    store: RecordStore,
    reconciler: DraftReconciler,
    pipeline: ImagePipeline,
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
}

impl Session {
    /// Opens the one subscription this session will ever hold.
    pub async fn connect(
        config: Arc<AppConfig>,
        remote: Arc<dyn RecordsRemote>,
    ) -> Result<Self, SubscriptionError> {
        let events = remote.subscribe().await?;
        Ok(Self {
            config,
            store: RecordStore::new(remote),
            reconciler: DraftReconciler::new(),
            pipeline: ImagePipeline::new(),
            events,
        })
    }

    /// Session over an in-memory backend, for tests and offline development.
    pub async fn fake() -> (Self, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let config = Arc::new(AppConfig::fake());
        let session = Self::connect(config, remote.clone())
            .await
            .expect("in-memory subscribe cannot fail");
        (session, remote)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn draft(&self) -> Option<&DailyRecord> {
        self.reconciler.draft()
    }

    pub fn draft_state(&self) -> DraftState {
        self.reconciler.state()
    }

    pub fn open_date(&self) -> Option<&DateKey> {
        self.reconciler.date_key()
    }

    /// Applies every queued remote event and returns how many were handled.
    pub fn pump_remote(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Awaits and applies the next remote event.
    pub async fn next_remote(&mut self) -> Result<(), SubscriptionError> {
        match self.events.recv().await {
            Some(event) => {
                self.handle_event(event);
                Ok(())
            }
            None => Err(SubscriptionError::ChannelClosed),
        }
    }

    fn handle_event(&mut self, event: SnapshotEvent) {
        let changed = self.store.apply_event(event);
        for key in changed {
            match self.store.get(&key) {
                Some(value) => self.reconciler.on_remote_update(&key, value),
                // Deleted remotely: the open day falls back to an empty record.
                None => self
                    .reconciler
                    .on_remote_update(&key, &DailyRecord::default()),
            }
        }
    }

    /// Navigates to a day, discarding any previous draft. The returned
    /// outcome tells the caller whether unsaved edits were thrown away.
    pub fn open_day(&mut self, key: DateKey) -> CloseOutcome {
        let outcome = self.reconciler.close_day();
        self.reconciler.open_day(key.clone(), self.store.get(&key));
        outcome
    }

    pub fn close_day(&mut self) -> CloseOutcome {
        self.reconciler.close_day()
    }

    pub fn edit<F>(&mut self, mutate: F) -> Result<(), DraftError>
    where
        F: FnOnce(&mut DailyRecord),
    {
        self.reconciler.edit(mutate)
    }

    /// Persists the draft's changes as a field-level merge-write. At most
    /// one write is in flight; an overlapping call reports `AlreadySaving`.
    pub async fn save(&mut self) -> Result<SaveOutcome, PersistenceError> {
        let ticket = match self.reconciler.begin_save() {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return Ok(SaveOutcome::NoChanges),
            Err(DraftError::SaveInFlight) => return Ok(SaveOutcome::AlreadySaving),
            Err(DraftError::Closed) => return Ok(SaveOutcome::NotOpen),
            Err(DraftError::Encode(e)) => return Err(PersistenceError::Encode(e)),
        };

        match self.store.write(&ticket.date_key, ticket.patch).await {
            Ok(()) => {
                self.reconciler.complete_save(true);
                info!(day = %ticket.date_key, "record saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.reconciler.complete_save(false);
                Err(e)
            }
        }
    }

    /// Normalizes a photo and stores it in the given meal slot of the open
    /// draft. Returns `Superseded` if a newer upload to the same slot
    /// started in the meantime; the slot is then left unchanged.
    pub async fn attach_photo(
        &mut self,
        meal: MealSlot,
        index: usize,
        raw: Bytes,
    ) -> anyhow::Result<PhotoOutcome> {
        anyhow::ensure!(index < PHOTO_SLOTS, "photo index {index} out of range");
        if self.reconciler.state() == DraftState::Closed {
            return Err(DraftError::Closed.into());
        }

        let dest = PhotoDest { meal, index };
        match self.pipeline.normalize_photo(dest, raw).await? {
            None => Ok(PhotoOutcome::Superseded),
            Some(photo) => {
                let data_url = photo.data_url.clone();
                self.reconciler
                    .edit(|rec| rec.meals.slot_mut(meal).photos[index] = Some(data_url))?;
                Ok(PhotoOutcome::Attached(photo))
            }
        }
    }

    pub fn remove_photo(&mut self, meal: MealSlot, index: usize) -> anyhow::Result<()> {
        anyhow::ensure!(index < PHOTO_SLOTS, "photo index {index} out of range");
        self.reconciler
            .edit(|rec| rec.meals.slot_mut(meal).photos[index] = None)?;
        Ok(())
    }

    /// Last-viewed month and last-selected date, restored on startup.
    pub fn load_prefs(&self) -> UiPrefs {
        prefs::load(&self.config.prefs_path)
    }

    pub fn save_prefs(&self, prefs: &UiPrefs) -> anyhow::Result<()> {
        prefs::save(prefs, &self.config.prefs_path)
    }
}
