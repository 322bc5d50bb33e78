use std::collections::BTreeMap;

use crate::foundation::core::{FrameIndex, FrameRange, FrameSize};
use crate::foundation::error::MasklineResult;
use crate::projection::keyframes::frames_with_changes;
use crate::projection::projector::ReplayState;
use crate::region::geometry::Geometry;
use crate::region::log::RegionEventLog;

/// Active region geometry for every frame of a range: the input handed to the encoder.
///
/// Frames without active regions are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegionPlan {
    frames: BTreeMap<FrameIndex, Vec<Geometry>>,
}

impl RegionPlan {
    /// Build the plan over `range` with a single incremental replay pass.
    ///
    /// With `clip` set, each geometry is clipped to the frame bounds and regions left with no
    /// area are dropped.
    #[tracing::instrument(level = "debug", skip(log), fields(frames = range.len_frames()))]
    pub fn build(log: &RegionEventLog, range: FrameRange, clip: Option<FrameSize>) -> Self {
        let mut state = ReplayState::default();
        if let Some(before) = range.start.prev() {
            for (f, bucket) in log.buckets_between(None, before) {
                state.apply_bucket(f, bucket.events());
            }
        }

        let mut frames = BTreeMap::new();
        for frame in range.frames() {
            let bucket = log.bucket(frame);
            if !bucket.is_empty() {
                state.apply_bucket(frame, bucket);
            }
            let mut geoms = state.active_geometries();
            if let Some(size) = clip {
                geoms = geoms.into_iter().filter_map(|g| g.clip_to(size)).collect();
            }
            if !geoms.is_empty() {
                frames.insert(frame, geoms);
            }
        }
        Self { frames }
    }

    /// Build a plan from explicit per-frame geometry.
    pub fn from_frames(frames: BTreeMap<FrameIndex, Vec<Geometry>>) -> Self {
        Self {
            frames: frames.into_iter().filter(|(_, g)| !g.is_empty()).collect(),
        }
    }

    /// Geometry for `frame` (empty when no region is active there).
    pub fn regions_at(&self, frame: FrameIndex) -> &[Geometry] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Frames carrying at least one region, ascending.
    pub fn frames(&self) -> impl Iterator<Item = (FrameIndex, &[Geometry])> + '_ {
        self.frames.iter().map(|(f, g)| (*f, g.as_slice()))
    }

    /// Number of frames with regions.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of region instances across all frames.
    pub fn region_count(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// Return `true` when no frame carries a region.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Preview range: the first keyframe through `window` frames later, clamped to the video.
///
/// Returns `Ok(None)` when the log has no keyframe inside the video.
pub fn preview_range(
    log: &RegionEventLog,
    total_frames: u64,
    window: u64,
) -> MasklineResult<Option<FrameRange>> {
    let Some(first) = frames_with_changes(log)
        .into_iter()
        .find(|f| f.0 < total_frames)
    else {
        return Ok(None);
    };
    let last = first.0.saturating_add(window).min(total_frames - 1);
    FrameRange::inclusive(first, FrameIndex(last)).map(Some)
}

#[cfg(test)]
#[path = "../../tests/unit/projection/plan.rs"]
mod tests;
