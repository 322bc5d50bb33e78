use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{MasklineError, MasklineResult};

/// Options for the mutation path and the projector.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditOpts {
    /// Regions whose width or height is at or below this extent (native pixels) are rejected.
    pub min_region_extent: i32,
    /// Tracking write-back only records a move when the box shifted more than this on an axis.
    pub tracking_min_delta_px: i32,
    /// Number of replayed event frames between memoized projection checkpoints.
    pub projection_checkpoint_interval: usize,
}

impl Default for EditOpts {
    fn default() -> Self {
        Self {
            min_region_extent: 10,
            tracking_min_delta_px: 5,
            projection_checkpoint_interval: 64,
        }
    }
}

/// Options for debounced persistence of the event log.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AutoSaveOpts {
    /// Attach an auto-saver to new edit sessions.
    pub enabled: bool,
    /// Quiet period after the last change before a save is issued.
    pub debounce_ms: u64,
}

impl AutoSaveOpts {
    /// Debounce interval as a [`std::time::Duration`].
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AutoSaveOpts {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,
        }
    }
}

/// Defaults applied to background job requests.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct JobOpts {
    /// Preview spans this many frames after the first keyframe (inclusive of both ends).
    pub preview_window_frames: u64,
    /// Blur radius handed to the encoder when a request does not specify one.
    pub default_blur_radius: u32,
    /// Video codec handed to the encoder when a request does not specify one.
    pub default_codec: String,
}

impl Default for JobOpts {
    fn default() -> Self {
        Self {
            preview_window_frames: 200,
            default_blur_radius: 15,
            default_codec: "libx264".to_string(),
        }
    }
}

/// Filesystem storage options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StorageOpts {
    /// Directory holding serialized region logs.
    pub root: PathBuf,
}

impl Default for StorageOpts {
    fn default() -> Self {
        Self {
            root: PathBuf::from("exports"),
        }
    }
}

/// Complete engine configuration, loadable from JSON.
///
/// Every section is optional in the file; missing sections and fields fall back to defaults.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mutation and projection options.
    pub edit: EditOpts,
    /// Auto-save options.
    pub autosave: AutoSaveOpts,
    /// Job defaults.
    pub jobs: JobOpts,
    /// Storage options.
    pub storage: StorageOpts,
}

impl EngineConfig {
    /// Read and validate a JSON config file.
    pub fn from_path(path: &Path) -> MasklineResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&s)
            .map_err(|e| MasklineError::serde(format!("config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check option ranges.
    pub fn validate(&self) -> MasklineResult<()> {
        if self.edit.min_region_extent < 0 {
            return Err(MasklineError::validation(
                "edit.min_region_extent must be >= 0",
            ));
        }
        if self.edit.tracking_min_delta_px < 0 {
            return Err(MasklineError::validation(
                "edit.tracking_min_delta_px must be >= 0",
            ));
        }
        if self.edit.projection_checkpoint_interval == 0 {
            return Err(MasklineError::validation(
                "edit.projection_checkpoint_interval must be >= 1",
            ));
        }
        if self.autosave.debounce_ms == 0 {
            return Err(MasklineError::validation(
                "autosave.debounce_ms must be >= 1",
            ));
        }
        if self.jobs.default_codec.trim().is_empty() {
            return Err(MasklineError::validation(
                "jobs.default_codec must be non-empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
