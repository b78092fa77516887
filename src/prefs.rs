use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::record::DateKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// 1..=12
    pub month: u8,
}

/// The two scalars of UI state that survive restarts. Not part of the
/// record data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiPrefs {
    #[serde(default)]
    pub last_month: Option<MonthKey>,
    #[serde(default)]
    pub last_selected: Option<DateKey>,
}

/// Missing or unreadable prefs are not an error; startup falls back to
/// defaults.
pub fn load(path: &Path) -> UiPrefs {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no saved prefs; using defaults");
            return UiPrefs::default();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(prefs) => prefs,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt prefs file; using defaults");
            UiPrefs::default()
        }
    }
}

pub fn save(prefs: &UiPrefs, path: &Path) -> anyhow::Result<()> {
    let raw = serde_json::to_vec_pretty(prefs).context("encode prefs")?;
    fs::write(path, raw).with_context(|| format!("write prefs to {}", path.display()))
}
