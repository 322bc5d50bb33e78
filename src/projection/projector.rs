use std::collections::BTreeMap;

use crate::foundation::core::FrameIndex;
use crate::region::event::{EventKind, RegionEvent, RegionId};
use crate::region::geometry::Geometry;
use crate::region::log::RegionEventLog;

/// Which regions a projection reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Only regions that are not deleted (export / blur input).
    Active,
    /// Active regions plus ghosts of regions deleted exactly at the projected frame.
    Complete,
}

/// Reconstructed state of one region at a frame. Derived, never stored in the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ProjectedRegion {
    /// Region identity.
    pub id: RegionId,
    /// Frame carrying the region's `Create` event.
    pub origin_frame: FrameIndex,
    /// Effective geometry.
    pub geometry: Geometry,
    /// Set once a tombstone has been replayed.
    pub is_deleted: bool,
    /// Frame of the most recent replayed tombstone.
    pub deletion_frame: Option<FrameIndex>,
    /// Frame of the most recent replayed move.
    pub last_move_frame: Option<FrameIndex>,
    /// Frame of the most recent replayed resize.
    pub last_resize_frame: Option<FrameIndex>,
}

impl ProjectedRegion {
    /// Return `true` when this region is rendered as a ghost at `frame`.
    pub fn is_ghost_at(&self, frame: FrameIndex) -> bool {
        self.is_deleted && self.deletion_frame == Some(frame)
    }

    fn visible(&self, frame: FrameIndex, mode: ProjectionMode) -> bool {
        match mode {
            ProjectionMode::Active => !self.is_deleted,
            ProjectionMode::Complete => !self.is_deleted || self.is_ghost_at(frame),
        }
    }
}

/// Result of projecting the log at one frame, ordered by region id.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Projection {
    /// Projected frame.
    pub frame: FrameIndex,
    /// Filter that produced this projection.
    pub mode: ProjectionMode,
    regions: Vec<ProjectedRegion>,
}

impl Projection {
    /// Regions in ascending id order.
    pub fn regions(&self) -> &[ProjectedRegion] {
        &self.regions
    }

    /// Look up a region by id.
    pub fn get(&self, id: RegionId) -> Option<&ProjectedRegion> {
        self.regions
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|i| &self.regions[i])
    }

    /// Return `true` when `id` is part of the projection.
    pub fn contains(&self, id: RegionId) -> bool {
        self.get(id).is_some()
    }

    /// Region ids in ascending order.
    pub fn ids(&self) -> Vec<RegionId> {
        self.regions.iter().map(|r| r.id).collect()
    }

    /// Geometries in region id order.
    pub fn geometries(&self) -> Vec<Geometry> {
        self.regions.iter().map(|r| r.geometry).collect()
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Return `true` when no region is visible.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

// Within one bucket, kinds are applied in this order so bucket order never matters:
// a region created and edited on the same frame exists before the edit is applied, and
// a resize carries the final geometry when a move and a resize share a frame.
const APPLY_ORDER: [EventKind; 4] = [
    EventKind::Create,
    EventKind::Move,
    EventKind::Resize,
    EventKind::Tombstone,
];

/// Accumulated region states after replaying a prefix of the log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReplayState {
    regions: BTreeMap<RegionId, ProjectedRegion>,
}

impl ReplayState {
    pub(crate) fn apply_bucket(&mut self, frame: FrameIndex, events: &[RegionEvent]) {
        for kind in APPLY_ORDER {
            for ev in events.iter().filter(|e| e.kind() == kind) {
                self.apply(frame, ev);
            }
        }
    }

    fn apply(&mut self, frame: FrameIndex, ev: &RegionEvent) {
        match *ev {
            RegionEvent::Create { id, geometry } => {
                self.regions.insert(
                    id,
                    ProjectedRegion {
                        id,
                        origin_frame: frame,
                        geometry,
                        is_deleted: false,
                        deletion_frame: None,
                        last_move_frame: None,
                        last_resize_frame: None,
                    },
                );
            }
            RegionEvent::Move { target, geometry } => {
                if let Some(r) = self.regions.get_mut(&target) {
                    r.geometry = geometry;
                    r.last_move_frame = Some(frame);
                }
            }
            RegionEvent::Resize { target, geometry } => {
                if let Some(r) = self.regions.get_mut(&target) {
                    r.geometry = geometry;
                    r.last_resize_frame = Some(frame);
                }
            }
            RegionEvent::Tombstone { target } => {
                if let Some(r) = self.regions.get_mut(&target) {
                    r.is_deleted = true;
                    r.deletion_frame = Some(frame);
                }
            }
        }
    }

    pub(crate) fn view(&self, frame: FrameIndex, mode: ProjectionMode) -> Projection {
        Projection {
            frame,
            mode,
            regions: self
                .regions
                .values()
                .filter(|r| r.visible(frame, mode))
                .copied()
                .collect(),
        }
    }

    pub(crate) fn active_geometries(&self) -> Vec<Geometry> {
        self.regions
            .values()
            .filter(|r| !r.is_deleted)
            .map(|r| r.geometry)
            .collect()
    }

    pub(crate) fn has_active(&self) -> bool {
        self.regions.values().any(|r| !r.is_deleted)
    }
}

/// Replay `log` from frame 0 through `frame` (inclusive) and filter by `mode`.
///
/// This from-scratch replay defines projection semantics; memoized projections must agree
/// with it for every frame.
#[tracing::instrument(level = "trace", skip(log), fields(events = log.event_count()))]
pub fn project(log: &RegionEventLog, frame: FrameIndex, mode: ProjectionMode) -> Projection {
    let mut state = ReplayState::default();
    for (f, bucket) in log.buckets_between(None, frame) {
        state.apply_bucket(f, bucket.events());
    }
    state.view(frame, mode)
}

#[cfg(test)]
#[path = "../../tests/unit/projection/projector.rs"]
mod tests;
