use std::path::PathBuf;
use std::sync::Arc;

use crate::edit::gateway::{EditOutcome, MutationGateway};
use crate::edit::tracking::TrackingSummary;
use crate::foundation::config::EngineConfig;
use crate::foundation::core::{FrameIndex, FrameRange, FrameSize};
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::jobs::collaborators::VideoInfo;
use crate::jobs::state::{JobOutput, JobPhase, JobSnapshot};
use crate::jobs::tasks::{JobRequest, RenderParams, TrackingParams};
use crate::persist::autosave::{AutoSaveStats, AutoSaver};
use crate::persist::store::{LogStore, SessionId, open_log, save_log};
use crate::projection::cursor::ProjectionCursor;
use crate::projection::keyframes::{
    ChangeSummary, frames_with_changes, next_change, previous_change,
};
use crate::projection::plan::{RegionPlan, preview_range};
use crate::projection::projector::{Projection, ProjectionMode};
use crate::region::event::RegionId;
use crate::region::geometry::Geometry;
use crate::region::log::RegionEventLog;

/// One video's editing session.
///
/// Owns the region log (through its [`MutationGateway`]), a memoized projection cursor for
/// frame navigation and, when enabled, the auto-saver. Builds job requests from the current
/// log and folds finished jobs back into the session.
pub struct EditSession {
    id: SessionId,
    gateway: MutationGateway,
    cursor: ProjectionCursor,
    store: Option<Arc<dyn LogStore>>,
    saver: Option<AutoSaver>,
    video: Option<VideoInfo>,
    preview_window: u64,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("id", &self.id)
            .field("events", &self.gateway.log().event_count())
            .field("video", &self.video)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Session over an empty, unpersisted log.
    pub fn new(id: SessionId, cfg: &EngineConfig) -> Self {
        Self {
            id,
            gateway: MutationGateway::new(cfg.edit.clone()),
            cursor: ProjectionCursor::new(cfg.edit.projection_checkpoint_interval),
            store: None,
            saver: None,
            video: None,
            preview_window: cfg.jobs.preview_window_frames,
        }
    }

    /// Load the stored log of `id` (empty if none) and attach auto-save when enabled.
    pub fn open(
        id: SessionId,
        store: Arc<dyn LogStore>,
        cfg: &EngineConfig,
    ) -> MasklineResult<Self> {
        cfg.validate()?;
        let log = open_log(store.as_ref(), &id)?;
        tracing::info!(
            session = %id,
            events = log.event_count(),
            frames = log.frame_count(),
            "session opened"
        );

        let mut gateway = MutationGateway::from_log(log, cfg.edit.clone());
        let saver = if cfg.autosave.enabled {
            let saver = AutoSaver::spawn(store.clone(), id.clone(), cfg.autosave.debounce())?;
            gateway.subscribe(saver.observer());
            Some(saver)
        } else {
            None
        };

        Ok(Self {
            id,
            gateway,
            cursor: ProjectionCursor::new(cfg.edit.projection_checkpoint_interval),
            store: Some(store),
            saver,
            video: None,
            preview_window: cfg.jobs.preview_window_frames,
        })
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Read access to the region log.
    pub fn log(&self) -> &RegionEventLog {
        self.gateway.log()
    }

    /// Mutable access to the gateway, e.g. to register observers.
    pub fn gateway_mut(&mut self) -> &mut MutationGateway {
        &mut self.gateway
    }

    /// Source video properties, once known.
    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    /// Record the source video properties.
    pub fn set_video(&mut self, info: VideoInfo) {
        self.video = Some(info);
    }

    // ---- edits ----

    /// See [`MutationGateway::create`].
    pub fn create(&mut self, frame: FrameIndex, geometry: Geometry) -> EditOutcome {
        self.gateway.create(frame, geometry)
    }

    /// See [`MutationGateway::move_region`].
    pub fn move_region(
        &mut self,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) -> MasklineResult<EditOutcome> {
        self.gateway.move_region(frame, id, geometry)
    }

    /// See [`MutationGateway::resize_region`].
    pub fn resize_region(
        &mut self,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) -> MasklineResult<EditOutcome> {
        self.gateway.resize_region(frame, id, geometry)
    }

    /// See [`MutationGateway::remove`].
    pub fn remove(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        self.gateway.remove(frame, id)
    }

    /// See [`MutationGateway::restore`].
    pub fn restore(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        self.gateway.restore(frame, id)
    }

    /// See [`MutationGateway::revert`].
    pub fn revert(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        self.gateway.revert(frame, id)
    }

    /// See [`MutationGateway::clear`].
    pub fn clear(&mut self) -> usize {
        self.gateway.clear()
    }

    // ---- navigation ----

    /// Project the log at `frame` through the session's memoized cursor.
    pub fn project(&mut self, frame: FrameIndex, mode: ProjectionMode) -> Projection {
        self.cursor.seek(self.gateway.log(), frame, mode)
    }

    /// Keyframes, ascending.
    pub fn keyframes(&self) -> Vec<FrameIndex> {
        frames_with_changes(self.gateway.log())
    }

    /// Next keyframe after `current`, wrapping around.
    pub fn next_change(&self, current: FrameIndex) -> Option<FrameIndex> {
        next_change(self.gateway.log(), current)
    }

    /// Previous keyframe before `current`, wrapping around.
    pub fn previous_change(&self, current: FrameIndex) -> Option<FrameIndex> {
        previous_change(self.gateway.log(), current)
    }

    /// Changes authored at `frame`.
    pub fn change_summary(&self, frame: FrameIndex) -> ChangeSummary {
        ChangeSummary::at(self.gateway.log(), frame)
    }

    // ---- jobs ----

    fn require_video(&self) -> MasklineResult<VideoInfo> {
        self.video.ok_or_else(|| {
            MasklineError::validation(format!("session {}: video not extracted yet", self.id))
        })
    }

    /// Per-frame active regions over `range`, clipped to the video when its size is known.
    pub fn plan(&self, range: FrameRange) -> RegionPlan {
        let clip: Option<FrameSize> = self.video.map(|v| v.size);
        RegionPlan::build(self.gateway.log(), range, clip)
    }

    /// Export request over `range` (the whole video when `None`).
    pub fn export_request(
        &self,
        range: Option<FrameRange>,
        output: PathBuf,
    ) -> MasklineResult<JobRequest> {
        let video = self.require_video()?;
        let range = match range {
            Some(r) => r,
            None => FrameRange::new(FrameIndex(0), FrameIndex(video.frame_count))?,
        };
        Ok(JobRequest::Export(self.render_params(video, range, output)))
    }

    /// Preview request from the first keyframe; `None` when nothing is marked.
    pub fn preview_request(&self, output: PathBuf) -> MasklineResult<Option<JobRequest>> {
        let video = self.require_video()?;
        let window = self.preview_window;
        let Some(range) = preview_range(self.gateway.log(), video.frame_count, window)? else {
            return Ok(None);
        };
        Ok(Some(JobRequest::Preview(self.render_params(video, range, output))))
    }

    fn render_params(&self, video: VideoInfo, range: FrameRange, output: PathBuf) -> RenderParams {
        RenderParams {
            session: self.id.clone(),
            range,
            size: video.size,
            fps: video.fps,
            plan: RegionPlan::build(self.gateway.log(), range, Some(video.size)),
            output,
            blur_radius: None,
            codec: None,
        }
    }

    /// Tracking request for `id`, starting from its active geometry at `start_frame`.
    pub fn tracking_request(
        &mut self,
        id: RegionId,
        start_frame: FrameIndex,
    ) -> MasklineResult<JobRequest> {
        let geometry = self
            .project(start_frame, ProjectionMode::Active)
            .get(id)
            .map(|r| r.geometry)
            .ok_or_else(|| {
                MasklineError::not_found(format!(
                    "region {id} is not active at frame {start_frame}"
                ))
            })?;
        Ok(JobRequest::Tracking(TrackingParams {
            session: self.id.clone(),
            region: id,
            geometry,
            start_frame,
        }))
    }

    /// Adopt the video properties reported by a completed extraction job.
    pub fn apply_extraction(&mut self, snap: &JobSnapshot) -> MasklineResult<VideoInfo> {
        match (&snap.phase, &snap.output) {
            (JobPhase::Completed, Some(JobOutput::Extraction { frame_count, fps, size, .. })) => {
                let info = VideoInfo {
                    frame_count: *frame_count,
                    fps: *fps,
                    size: *size,
                };
                self.video = Some(info);
                Ok(info)
            }
            _ => Err(MasklineError::validation(format!(
                "job {} is not a completed extraction",
                snap.job_id
            ))),
        }
    }

    /// Write the points of a completed tracking job back into the log.
    pub fn apply_tracking(&mut self, snap: &JobSnapshot) -> MasklineResult<TrackingSummary> {
        match (&snap.phase, &snap.output) {
            (
                JobPhase::Completed,
                Some(JobOutput::Tracking {
                    region,
                    start_frame,
                    points,
                }),
            ) => self.gateway.apply_tracking(*region, *start_frame, points),
            _ => Err(MasklineError::validation(format!(
                "job {} is not a completed tracking job",
                snap.job_id
            ))),
        }
    }

    // ---- persistence ----

    /// Persist the current log now, bypassing the debounce.
    pub fn save(&self) -> MasklineResult<()> {
        match (&self.saver, &self.store) {
            (Some(saver), _) => {
                saver.notify(self.gateway.log());
                saver.flush()
            }
            (None, Some(store)) => save_log(store.as_ref(), &self.id, self.gateway.log()),
            (None, None) => Ok(()),
        }
    }

    /// Auto-save counters, when auto-save is attached.
    pub fn autosave_stats(&self) -> Option<AutoSaveStats> {
        self.saver.as_ref().map(AutoSaver::stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/edit_session.rs"]
mod tests;
