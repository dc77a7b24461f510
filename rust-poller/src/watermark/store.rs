//! Watermark persistence.
//!
//! Runs are assumed to be serialized by whatever schedules them. Nothing here
//! locks the file, so two concurrent runs would race on `save`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::info;

use super::types::{Watermark, DEFAULT_LOOKBACK_HOURS};
use crate::error::WatermarkError;

/// Loads and saves the single watermark value.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Previously saved watermark, or `now - lookback` if none exists yet.
    async fn load(&self) -> Result<Watermark, WatermarkError>;

    /// Overwrite the saved watermark.
    async fn save(&self, watermark: Watermark) -> Result<(), WatermarkError>;
}

/// Watermark kept in a flat text file.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
    lookback: Duration,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>, lookback: Duration) -> Self {
        Self {
            path: path.into(),
            lookback,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn load(&self) -> Result<Watermark, WatermarkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let watermark = Watermark::bootstrap(Utc::now(), self.lookback)?;
                info!(
                    path = %self.path.display(),
                    lookback_hours = self.lookback.num_hours(),
                    watermark = %watermark,
                    "watermark_bootstrapped"
                );
                return Ok(watermark);
            }
            Err(source) => {
                return Err(WatermarkError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let raw = content.trim_end();
        let watermark = Watermark::parse_persisted(raw)?;

        info!(
            path = %self.path.display(),
            watermark = %watermark,
            "watermark_loaded"
        );

        Ok(watermark)
    }

    async fn save(&self, watermark: Watermark) -> Result<(), WatermarkError> {
        tokio::fs::write(&self.path, watermark.to_persisted())
            .await
            .map_err(|source| WatermarkError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(
            path = %self.path.display(),
            watermark = %watermark,
            "watermark_saved"
        );

        Ok(())
    }
}

/// In-process watermark store.
#[derive(Debug)]
pub struct MemoryWatermarkStore {
    current: Mutex<Option<Watermark>>,
    lookback: Duration,
    saves: Mutex<usize>,
}

impl MemoryWatermarkStore {
    /// Empty store; the first `load` bootstraps from the default lookback.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            lookback: Duration::hours(i64::from(DEFAULT_LOOKBACK_HOURS)),
            saves: Mutex::new(0),
        }
    }

    /// Store that already holds `watermark`.
    pub fn with_watermark(watermark: Watermark) -> Self {
        Self {
            current: Mutex::new(Some(watermark)),
            ..Self::new()
        }
    }

    /// The saved value, if any.
    pub async fn current(&self) -> Option<Watermark> {
        *self.current.lock().await
    }

    /// How many times `save` has been called.
    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

impl Default for MemoryWatermarkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn load(&self) -> Result<Watermark, WatermarkError> {
        match *self.current.lock().await {
            Some(watermark) => Ok(watermark),
            None => Watermark::bootstrap(Utc::now(), self.lookback),
        }
    }

    async fn save(&self, watermark: Watermark) -> Result<(), WatermarkError> {
        *self.current.lock().await = Some(watermark);
        *self.saves.lock().await += 1;
        Ok(())
    }
}
