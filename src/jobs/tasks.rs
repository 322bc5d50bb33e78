use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::foundation::core::{Fps, FrameIndex, FrameRange, FrameSize};
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::jobs::collaborators::{RegionTracker, RenderConfig, SinkFactory, VideoSource};
use crate::jobs::state::{JobKind, JobOutput, JobPhase, JobSnapshot};
use crate::persist::store::SessionId;
use crate::projection::plan::RegionPlan;
use crate::region::event::RegionId;
use crate::region::geometry::Geometry;

/// Parameters of an extraction job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractionParams {
    /// Session whose video is extracted.
    pub session: SessionId,
    /// Re-extract even when cached frames exist.
    #[serde(default)]
    pub force: bool,
}

/// Parameters of an export or preview job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderParams {
    /// Source session.
    pub session: SessionId,
    /// Frames to render.
    pub range: FrameRange,
    /// Native frame size.
    pub size: FrameSize,
    /// Output frame rate.
    pub fps: Fps,
    /// Per-frame regions, usually built by [`RegionPlan::build`].
    pub plan: RegionPlan,
    /// Output file.
    pub output: PathBuf,
    /// Blur radius; the orchestrator default applies when absent.
    #[serde(default)]
    pub blur_radius: Option<u32>,
    /// Codec; the orchestrator default applies when absent.
    #[serde(default)]
    pub codec: Option<String>,
}

impl RenderParams {
    fn validate(&self) -> MasklineResult<()> {
        if self.range.start > self.range.end || self.range.is_empty() {
            return Err(MasklineError::validation("render range must contain at least one frame"));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.size.width == 0 || self.size.height == 0 {
            return Err(MasklineError::validation("frame size must be non-zero"));
        }
        if self.output.as_os_str().is_empty() {
            return Err(MasklineError::validation("output path must not be empty"));
        }
        Ok(())
    }
}

/// Parameters of a tracking job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackingParams {
    /// Source session.
    pub session: SessionId,
    /// Region being tracked.
    pub region: RegionId,
    /// Region geometry at `start_frame`.
    pub geometry: Geometry,
    /// Frame tracking starts from.
    pub start_frame: FrameIndex,
}

/// A job submission.
#[derive(Clone, Debug, PartialEq)]
pub enum JobRequest {
    /// Extract frames.
    Extraction(ExtractionParams),
    /// Full export.
    Export(RenderParams),
    /// Preview render.
    Preview(RenderParams),
    /// Forward tracking.
    Tracking(TrackingParams),
}

impl JobRequest {
    /// Kind of job this request starts.
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Extraction(_) => JobKind::Extraction,
            Self::Export(_) => JobKind::Export,
            Self::Preview(_) => JobKind::Preview,
            Self::Tracking(_) => JobKind::Tracking,
        }
    }

    /// Parse protocol parameters for `kind`.
    pub fn from_json(kind: JobKind, params: serde_json::Value) -> MasklineResult<Self> {
        fn parse<T: serde::de::DeserializeOwned>(
            kind: JobKind,
            v: serde_json::Value,
        ) -> MasklineResult<T> {
            serde_json::from_value(v)
                .map_err(|e| MasklineError::validation(format!("invalid {kind} parameters: {e}")))
        }
        Ok(match kind {
            JobKind::Extraction => Self::Extraction(parse(kind, params)?),
            JobKind::Export => Self::Export(parse(kind, params)?),
            JobKind::Preview => Self::Preview(parse(kind, params)?),
            JobKind::Tracking => Self::Tracking(parse(kind, params)?),
        })
    }

    pub(crate) fn validate(&self) -> MasklineResult<()> {
        match self {
            Self::Export(p) | Self::Preview(p) => p.validate(),
            Self::Extraction(_) | Self::Tracking(_) => Ok(()),
        }
    }
}

/// External services a job may call.
#[derive(Clone)]
pub struct Collaborators {
    /// Frame extraction.
    pub source: Arc<dyn VideoSource>,
    /// Blur/encode pipeline.
    pub sinks: Arc<dyn SinkFactory>,
    /// Object tracker.
    pub tracker: Arc<dyn RegionTracker>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Handle a running task uses to report progress and observe cancellation.
pub(crate) struct TaskCtx {
    pub(crate) snapshot: Arc<RwLock<JobSnapshot>>,
    pub(crate) cancel: Arc<AtomicBool>,
    started: Instant,
}

impl TaskCtx {
    pub(crate) fn new(snapshot: Arc<RwLock<JobSnapshot>>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            snapshot,
            cancel,
            started: Instant::now(),
        }
    }

    /// Cancellation checkpoint.
    pub(crate) fn checkpoint(&self) -> MasklineResult<()> {
        if self.cancel.load(Ordering::SeqCst) {
            return Err(MasklineError::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn update(
        &self,
        f: impl FnOnce(&mut JobSnapshot) -> MasklineResult<()>,
    ) -> MasklineResult<()> {
        let mut s = self
            .snapshot
            .write()
            .map_err(|_| MasklineError::Other(anyhow::anyhow!("job snapshot lock poisoned")))?;
        f(&mut s)
    }

    fn advance(
        &self,
        phase: JobPhase,
        progress: u8,
        message: impl Into<String>,
    ) -> MasklineResult<()> {
        let message = message.into();
        self.update(|s| {
            let entering = s.phase != phase;
            s.advance(phase, progress, message)?;
            if entering {
                tracing::info!(job = %s.job_id, kind = %s.kind, phase = %phase, "job phase");
            }
            Ok(())
        })
    }

    fn count(&self, processed: u64, total: Option<u64>) -> MasklineResult<()> {
        let secs = self.started.elapsed().as_secs_f64();
        self.update(|s| {
            s.counters.frames_processed = processed;
            s.counters.frames_total = total;
            s.counters.frames_per_second = if secs > 0.0 { processed as f64 / secs } else { 0.0 };
            Ok(())
        })
    }
}

// Linear progress inside [lo, hi] for `done` of `total` units.
fn span(lo: u8, hi: u8, done: u64, total: u64) -> u8 {
    if total == 0 {
        return hi;
    }
    let frac = (done.min(total) as f64) / (total as f64);
    lo + ((f64::from(hi - lo)) * frac).round() as u8
}

pub(crate) fn run_extraction(
    ctx: &TaskCtx,
    source: &dyn VideoSource,
    p: &ExtractionParams,
) -> MasklineResult<JobOutput> {
    ctx.checkpoint()?;
    ctx.advance(JobPhase::Analyzing, 0, "analyzing video")?;
    let info = source.probe(&p.session)?;
    ctx.count(0, Some(info.frame_count))?;

    if !p.force
        && let Some(cached) = source.cached_frames(&p.session)?
    {
        ctx.checkpoint()?;
        ctx.count(cached, Some(cached))?;
        ctx.advance(JobPhase::Completing, 100, format!("using {cached} cached frames"))?;
        return Ok(JobOutput::Extraction {
            frame_count: cached,
            fps: info.fps,
            size: info.size,
            cached: true,
        });
    }

    ctx.checkpoint()?;
    ctx.advance(JobPhase::Extracting, 5, "extracting frames")?;
    let mut extracted = 0u64;
    for item in source.extract(&p.session, &info)? {
        ctx.checkpoint()?;
        let frame = item?;
        extracted += 1;
        ctx.count(extracted, Some(info.frame_count))?;
        ctx.advance(
            JobPhase::Extracting,
            span(5, 95, extracted, info.frame_count),
            format!("extracted frame {}", frame.0 + 1),
        )?;
    }

    ctx.checkpoint()?;
    ctx.advance(JobPhase::Completing, 95, format!("extracted {extracted} frames"))?;
    Ok(JobOutput::Extraction {
        frame_count: extracted,
        fps: info.fps,
        size: info.size,
        cached: false,
    })
}

pub(crate) fn run_render(
    ctx: &TaskCtx,
    sinks: &dyn SinkFactory,
    cfg: RenderConfig,
    plan: &RegionPlan,
) -> MasklineResult<JobOutput> {
    ctx.checkpoint()?;
    ctx.advance(JobPhase::Initializing, 0, format!("preparing {}", cfg.kind))?;
    let mut sink = sinks.open(&cfg)?;
    sink.begin(&cfg)?;

    let total = cfg.range.len_frames();
    let duration_secs = cfg.fps.frames_to_secs(total);
    tracing::info!(
        kind = %cfg.kind,
        frames = total,
        fps = cfg.fps.as_f64(),
        seconds = duration_secs,
        "render started"
    );
    ctx.count(0, Some(total))?;
    ctx.advance(JobPhase::ProcessingFrames, 5, "processing frames")?;
    let mut done = 0u64;
    let mut regions = 0u64;
    for frame in cfg.range.frames() {
        ctx.checkpoint()?;
        let rects = plan.regions_at(frame);
        sink.push_frame(frame, rects)?;
        done += 1;
        regions += rects.len() as u64;
        ctx.count(done, Some(total))?;
        ctx.advance(
            JobPhase::ProcessingFrames,
            span(5, 90, done, total),
            format!("processed frame {done}/{total}"),
        )?;
    }

    ctx.checkpoint()?;
    ctx.advance(JobPhase::Encoding, 90, format!("encoding with {}", cfg.codec))?;
    let output = sink.end()?;
    Ok(JobOutput::Render {
        output,
        range: cfg.range,
        frames: done,
        regions,
        duration_secs,
    })
}

pub(crate) fn run_tracking(
    ctx: &TaskCtx,
    tracker: &dyn RegionTracker,
    p: &TrackingParams,
) -> MasklineResult<JobOutput> {
    ctx.checkpoint()?;
    ctx.advance(JobPhase::Tracking, 0, format!("tracking region {}", p.region))?;
    let mut points = Vec::new();
    for item in tracker.track_region(&p.session, p.geometry, p.start_frame)? {
        ctx.checkpoint()?;
        points.push(item?);
        ctx.count(points.len() as u64, None)?;
        ctx.advance(
            JobPhase::Tracking,
            0,
            format!("tracked {} frames", points.len()),
        )?;
    }
    points.sort_by_key(|pt| pt.frame);
    Ok(JobOutput::Tracking {
        region: p.region,
        start_frame: p.start_frame,
        points,
    })
}
