//! Core state management for a single-user daily health diary: weights,
//! meals with inline photos, alcohol intake, overtime and a short diary,
//! one record per calendar day.
//!
//! Records live in a remote keyed-document store that streams snapshots back
//! to the client. The hard problems this crate owns are (a) reconciling that
//! live feed with an in-progress local edit without ever losing unsaved
//! work, and (b) normalizing user photos into a bounded inline payload while
//! overlapping uploads to the same slot stay consistent. Everything else
//! (rendering, navigation, export formatting) sits above this crate.

pub mod config;
pub mod draft;
pub mod error;
pub mod images;
pub mod prefs;
pub mod record;
pub mod remote;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod trend;

pub use config::{AppConfig, RemoteConfig};
pub use draft::{CloseOutcome, DraftReconciler, DraftState};
pub use error::{DraftError, ImageError, InvalidDateKey, PersistenceError, SubscriptionError};
pub use images::{EncodedPhoto, ImagePipeline, PhotoDest};
pub use prefs::{MonthKey, UiPrefs};
pub use record::{DailyRecord, DateKey, MealSlot, OvertimeKind, WeightSlot};
pub use remote::{MemoryRemote, RecordsRemote, SnapshotEvent};
pub use session::{PhotoOutcome, SaveOutcome, Session};
pub use store::{RecordStore, StoreStatus};
pub use trend::{weight_series, TrendPoint, TrendRange};
