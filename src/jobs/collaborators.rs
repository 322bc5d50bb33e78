use std::path::PathBuf;

use crate::edit::tracking::TrackPoint;
use crate::foundation::core::{Fps, FrameIndex, FrameRange, FrameSize};
use crate::foundation::error::MasklineResult;
use crate::jobs::state::JobKind;
use crate::persist::store::SessionId;
use crate::region::geometry::Geometry;

/// Properties of a source video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoInfo {
    /// Number of frames.
    pub frame_count: u64,
    /// Frame rate.
    pub fps: Fps,
    /// Native frame size.
    pub size: FrameSize,
}

/// Stream of extracted frame indices; each item is one unit of work.
pub type FrameStream<'a> = Box<dyn Iterator<Item = MasklineResult<FrameIndex>> + Send + 'a>;

/// Stream of tracker positions in frame order.
pub type TrackStream<'a> = Box<dyn Iterator<Item = MasklineResult<TrackPoint>> + Send + 'a>;

/// Video decoding and frame extraction.
pub trait VideoSource: Send + Sync {
    /// Inspect the source video of `session`.
    fn probe(&self, session: &SessionId) -> MasklineResult<VideoInfo>;

    /// Number of frames already extracted for `session`, if a previous extraction is usable.
    fn cached_frames(&self, session: &SessionId) -> MasklineResult<Option<u64>>;

    /// Start extracting every frame of `session`.
    fn extract<'a>(
        &'a self,
        session: &SessionId,
        info: &VideoInfo,
    ) -> MasklineResult<FrameStream<'a>>;
}

/// Configuration provided to a [`RegionSink`] before any frame is pushed.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Export or preview.
    pub kind: JobKind,
    /// Source session.
    pub session: SessionId,
    /// Frames to render.
    pub range: FrameRange,
    /// Native frame size.
    pub size: FrameSize,
    /// Output frame rate.
    pub fps: Fps,
    /// Blur radius in pixels.
    pub blur_radius: u32,
    /// Video codec name.
    pub codec: String,
    /// Output file.
    pub output: PathBuf,
}

/// Sink contract for the blur-and-encode pipeline.
///
/// Ordering contract: `push_frame` is called once per frame of the range, in strictly
/// increasing `FrameIndex` order, between `begin` and `end`.
pub trait RegionSink: Send {
    /// Called once before any frame is pushed.
    fn begin(&mut self, cfg: &RenderConfig) -> MasklineResult<()>;
    /// Push the regions to blur on one frame (possibly none).
    fn push_frame(&mut self, idx: FrameIndex, regions: &[Geometry]) -> MasklineResult<()>;
    /// Finalize encoding; returns the written file.
    fn end(&mut self) -> MasklineResult<PathBuf>;
}

/// Opens a [`RegionSink`] per export or preview job.
pub trait SinkFactory: Send + Sync {
    /// Create a sink for one job.
    fn open(&self, cfg: &RenderConfig) -> MasklineResult<Box<dyn RegionSink>>;
}

/// Black-box object tracker.
pub trait RegionTracker: Send + Sync {
    /// Track `region` forward from `start_frame`.
    fn track_region<'a>(
        &'a self,
        session: &SessionId,
        region: Geometry,
        start_frame: FrameIndex,
    ) -> MasklineResult<TrackStream<'a>>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<RenderConfig>,
    frames: Vec<(FrameIndex, Vec<Geometry>)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&RenderConfig> {
        self.cfg.as_ref()
    }

    /// Frames in timeline order.
    pub fn frames(&self) -> &[(FrameIndex, Vec<Geometry>)] {
        &self.frames
    }

    /// Return `true` once `end` was called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl RegionSink for InMemorySink {
    fn begin(&mut self, cfg: &RenderConfig) -> MasklineResult<()> {
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, regions: &[Geometry]) -> MasklineResult<()> {
        self.frames.push((idx, regions.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> MasklineResult<PathBuf> {
        self.ended = true;
        Ok(self
            .cfg
            .as_ref()
            .map(|c| c.output.clone())
            .unwrap_or_default())
    }
}
