use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use base64ct::{Base64, Encoding};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ImageError;
use crate::record::MealSlot;

/// Longer side of a normalized photo. Portrait and landscape inputs share
/// the single bound; the aspect ratio is never altered.
pub const MAX_LONG_SIDE: u32 = 640;
/// Fixed lossy quality (0.8) for the re-encode.
pub const JPEG_QUALITY: u8 = 80;

/// Where a photo is headed: one of the two slots of one meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhotoDest {
    pub meal: MealSlot,
    pub index: usize,
}

/// Self-contained encoded payload, storable inline in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPhoto {
    /// `data:image/jpeg;base64,...`
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Decode -> resize -> encode staging for meal photos. Overlapping requests
/// to the same destination are resolved by initiation order: once a newer
/// request has started, any older in-flight result for that slot is
/// discarded on arrival.
#[derive(Default)]
pub struct ImagePipeline {
    counter: AtomicU64,
    latest: Mutex<HashMap<PhotoDest, u64>>,
}

impl ImagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `raw` for `dest`. `Ok(None)` means a newer request for the
    /// same destination superseded this one; the caller leaves the slot as
    /// is. Decode failures also leave the slot unchanged.
    pub async fn normalize_photo(
        &self,
        dest: PhotoDest,
        raw: Bytes,
    ) -> Result<Option<EncodedPhoto>, ImageError> {
        let id = self.begin(dest).await;
        let result = tokio::task::spawn_blocking(move || encode_bounded(raw.as_ref()))
            .await
            .map_err(|e| ImageError::Worker(e.to_string()))?;
        match result {
            Ok(photo) => Ok(self.finish(dest, id, photo).await),
            Err(e) => {
                if self.is_current(dest, id).await {
                    Err(e)
                } else {
                    // A newer request owns the slot; this failure is moot.
                    Ok(None)
                }
            }
        }
    }

    async fn begin(&self, dest: PhotoDest) -> u64 {
        // Allocate and register under one lock: a concurrently initiated
        // request must not register an older id after a newer one.
        let mut latest = self.latest.lock().await;
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        latest.insert(dest, id);
        id
    }

    async fn finish(&self, dest: PhotoDest, id: u64, photo: EncodedPhoto) -> Option<EncodedPhoto> {
        if self.is_current(dest, id).await {
            Some(photo)
        } else {
            debug!(?dest, id, "stale photo result discarded");
            None
        }
    }

    async fn is_current(&self, dest: PhotoDest, id: u64) -> bool {
        self.latest.lock().await.get(&dest) == Some(&id)
    }
}

fn encode_bounded(raw: &[u8]) -> Result<EncodedPhoto, ImageError> {
    let img = image::load_from_memory(raw).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (width, height) = target_dimensions(img.width(), img.height());
    let resized = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&resized.to_rgb8())
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    Ok(EncodedPhoto {
        data_url: format!("data:image/jpeg;base64,{}", Base64::encode_string(&jpeg)),
        width,
        height,
    })
}

/// Scales so the longer side lands exactly on [`MAX_LONG_SIDE`], the other
/// side by the same factor rounded to the nearest pixel. Images already
/// inside the bound keep their dimensions.
fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= MAX_LONG_SIDE {
        return (width, height);
    }
    let scale = f64::from(MAX_LONG_SIDE) / f64::from(long);
    let short = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    if width >= height {
        (MAX_LONG_SIDE, short(height))
    } else {
        (short(width), MAX_LONG_SIDE)
    }
}
