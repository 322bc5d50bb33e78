use crate::edit::gateway::MutationGateway;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::projection::projector::{ProjectionMode, project};
use crate::region::event::{EventKind, RegionId};
use crate::region::geometry::Geometry;

/// One position reported by the tracker, serialized as `{frame, x, y, width, height}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrackPoint {
    /// Frame the position belongs to.
    pub frame: FrameIndex,
    /// Tracked box.
    #[serde(flatten)]
    pub geometry: Geometry,
}

/// Counts from one tracking write-back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TrackingSummary {
    /// Points written as moves (or folded into the `Create`).
    pub written: usize,
    /// Points within the movement threshold of the last recorded position.
    pub skipped: usize,
    /// Points before the origin, before the start frame, or too small.
    pub rejected: usize,
}

impl MutationGateway {
    /// Write a tracker's output for `id` back into the log as consolidated moves.
    ///
    /// Starting from the region's active geometry at `start_frame`, a point is recorded only
    /// when it is more than `tracking_min_delta_px` away from the last recorded position on
    /// either axis. Observers are notified once for the whole batch.
    pub fn apply_tracking(
        &mut self,
        id: RegionId,
        start_frame: FrameIndex,
        points: &[TrackPoint],
    ) -> MasklineResult<TrackingSummary> {
        if !self.log().contains_region(id) {
            return Err(MasklineError::not_found(format!("region {id}")));
        }
        let mut last = project(self.log(), start_frame, ProjectionMode::Active)
            .get(id)
            .map(|r| r.geometry)
            .ok_or_else(|| {
                MasklineError::not_found(format!(
                    "region {id} is not active at frame {start_frame}"
                ))
            })?;

        let delta = u32::try_from(self.opts().tracking_min_delta_px).unwrap_or(0);
        let mut summary = TrackingSummary::default();
        for p in points {
            if p.frame < start_frame
                || p.frame < id.origin
                || self.check_size(p.geometry).is_some()
            {
                summary.rejected += 1;
                continue;
            }
            let dx = p.geometry.x.abs_diff(last.x);
            let dy = p.geometry.y.abs_diff(last.y);
            if dx <= delta && dy <= delta {
                summary.skipped += 1;
                continue;
            }
            self.write_geometry(EventKind::Move, p.frame, id, p.geometry);
            last = p.geometry;
            summary.written += 1;
        }

        tracing::debug!(
            region = %id,
            start = start_frame.0,
            written = summary.written,
            skipped = summary.skipped,
            rejected = summary.rejected,
            "tracking applied"
        );
        if summary.written > 0 {
            self.notify();
        }
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edit/tracking.rs"]
mod tests;
