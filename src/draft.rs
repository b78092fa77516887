use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DraftError;
use crate::record::{self, DailyRecord, DateKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Closed,
    Clean,
    Dirty,
    Saving,
}

/// Distinguishes a deliberate "discard unsaved changes" from a clean close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    NotOpen,
    Closed,
    DiscardedUnsaved,
}

#[derive(Debug)]
pub struct SaveTicket {
    pub date_key: DateKey,
    pub patch: Value,
}

struct OpenDraft {
    date_key: DateKey,
    draft: DailyRecord,
    /// Newest remote value seen for this day; refreshed even while dirty.
    baseline: DailyRecord,
    /// What the current edits are relative to. Save patches diff against
    /// this, not `baseline`, so untouched fields stay out of the write.
    edit_base: DailyRecord,
    dirty: bool,
    /// Payload of the in-flight write, if any.
    saving: Option<DailyRecord>,
}

/// Owns the working copy of the currently open day. The one rule that
/// matters: a remote update never overwrites unsaved edits.
#[derive(Default)]
pub struct DraftReconciler {
    open: Option<OpenDraft>,
}

impl DraftReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DraftState {
        match &self.open {
            None => DraftState::Closed,
            Some(o) if o.saving.is_some() => DraftState::Saving,
            Some(o) if o.dirty => DraftState::Dirty,
            Some(_) => DraftState::Clean,
        }
    }

    pub fn date_key(&self) -> Option<&DateKey> {
        self.open.as_ref().map(|o| &o.date_key)
    }

    pub fn draft(&self) -> Option<&DailyRecord> {
        self.open.as_ref().map(|o| &o.draft)
    }

    pub fn baseline(&self) -> Option<&DailyRecord> {
        self.open.as_ref().map(|o| &o.baseline)
    }

    /// Opens a day from the store's current value (or a fresh default),
    /// replacing any previous draft.
    pub fn open_day(&mut self, date_key: DateKey, remote: Option<&DailyRecord>) {
        let baseline = remote.cloned().unwrap_or_default();
        debug!(day = %date_key, existing = remote.is_some(), "day opened");
        self.open = Some(OpenDraft {
            date_key,
            draft: baseline.clone(),
            edit_base: baseline.clone(),
            baseline,
            dirty: false,
            saving: None,
        });
    }

    /// Mutates the draft only; dirty from the first edit onward.
    pub fn edit<F>(&mut self, mutate: F) -> Result<(), DraftError>
    where
        F: FnOnce(&mut DailyRecord),
    {
        let open = self.open.as_mut().ok_or(DraftError::Closed)?;
        mutate(&mut open.draft);
        open.dirty = true;
        Ok(())
    }

    /// Clean: re-baseline and take the remote value as the new draft.
    /// Dirty or saving: remember it as the newest baseline but keep the
    /// unsaved edits verbatim. Other days are ignored here.
    pub fn on_remote_update(&mut self, date_key: &DateKey, value: &DailyRecord) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if open.date_key != *date_key {
            return;
        }
        open.baseline = value.clone();
        if open.dirty || open.saving.is_some() {
            debug!(day = %date_key, "remote update while editing; draft preserved");
        } else {
            open.edit_base = value.clone();
            open.draft = value.clone();
            debug!(day = %date_key, "remote update adopted into clean draft");
        }
    }

    /// Starts a save. `Ok(None)` means there is nothing to write. While
    /// `Saving`, a second `begin_save` is rejected, so at most one write is
    /// ever in flight.
    pub fn begin_save(&mut self) -> Result<Option<SaveTicket>, DraftError> {
        let open = self.open.as_mut().ok_or(DraftError::Closed)?;
        if open.saving.is_some() {
            return Err(DraftError::SaveInFlight);
        }
        if !open.dirty {
            return Ok(None);
        }

        let patch = record::diff(&open.edit_base, &open.draft)
            .map_err(|e| DraftError::Encode(e.to_string()))?;
        if patch.as_object().is_some_and(|o| o.is_empty()) {
            // Edited back to the saved state: nothing to write.
            open.dirty = false;
            return Ok(None);
        }

        open.saving = Some(open.draft.clone());
        open.dirty = false;
        Ok(Some(SaveTicket {
            date_key: open.date_key.clone(),
            patch,
        }))
    }

    /// Resolves the in-flight save. On success the saved payload becomes
    /// the new baseline; on failure the draft is unchanged and stays dirty.
    /// A completion arriving after `close_day` must not resurrect the draft.
    pub fn complete_save(&mut self, success: bool) {
        let Some(open) = self.open.as_mut() else {
            debug!("save completed after day was closed; ignoring");
            return;
        };
        let Some(saved) = open.saving.take() else {
            warn!("save completion without a save in flight");
            return;
        };
        if success {
            open.edit_base = saved.clone();
            open.baseline = saved;
            open.dirty = open.draft != open.edit_base;
            debug!(day = %open.date_key, "save confirmed");
        } else {
            open.dirty = true;
            debug!(day = %open.date_key, "save failed; draft stays dirty");
        }
    }

    /// Discards the draft. An in-flight write may still complete in the
    /// background.
    pub fn close_day(&mut self) -> CloseOutcome {
        match self.open.take() {
            None => CloseOutcome::NotOpen,
            Some(open) if open.dirty => {
                debug!(day = %open.date_key, "unsaved edits discarded");
                CloseOutcome::DiscardedUnsaved
            }
            Some(_) => CloseOutcome::Closed,
        }
    }
}
