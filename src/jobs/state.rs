use std::path::PathBuf;
use std::str::FromStr;

use crate::edit::tracking::TrackPoint;
use crate::foundation::core::{Fps, FrameIndex, FrameRange, FrameSize};
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::region::event::RegionId;

/// Identifier handed out by [`crate::JobOrchestrator::submit`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of background job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Frame extraction from the source video.
    Extraction,
    /// Full blurred export.
    Export,
    /// Short blurred preview.
    Preview,
    /// Automatic forward tracking of one region.
    Tracking,
}

impl JobKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Export => "export",
            Self::Preview => "preview",
            Self::Tracking => "tracking",
        }
    }

    /// Working phases of this kind, in order.
    pub fn phases(self) -> &'static [JobPhase] {
        match self {
            Self::Extraction => &[
                JobPhase::Analyzing,
                JobPhase::Extracting,
                JobPhase::Completing,
            ],
            Self::Export | Self::Preview => &[
                JobPhase::Initializing,
                JobPhase::ProcessingFrames,
                JobPhase::Encoding,
            ],
            Self::Tracking => &[JobPhase::Tracking],
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = MasklineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extraction" => Ok(Self::Extraction),
            "export" => Ok(Self::Export),
            "preview" => Ok(Self::Preview),
            "tracking" => Ok(Self::Tracking),
            other => Err(MasklineError::validation(format!("unknown job kind '{other}'"))),
        }
    }
}

/// Lifecycle phase of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Submitted, worker not yet running.
    Queued,
    /// Extraction: probing the source.
    Analyzing,
    /// Extraction: writing frames.
    Extracting,
    /// Extraction: finishing up.
    Completing,
    /// Export/preview: preparing the encoder.
    Initializing,
    /// Export/preview: streaming per-frame regions.
    ProcessingFrames,
    /// Export/preview: finalizing the output.
    Encoding,
    /// Tracking: consuming tracker output.
    Tracking,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Error,
    /// Stopped at a cancellation checkpoint.
    Cancelled,
}

impl JobPhase {
    /// Position in the lifecycle; transitions never decrease it.
    pub fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Analyzing | Self::Initializing | Self::Tracking => 1,
            Self::Extracting | Self::ProcessingFrames => 2,
            Self::Completing | Self::Encoding => 3,
            Self::Completed | Self::Error | Self::Cancelled => 4,
        }
    }

    /// Return `true` for `completed`, `error` and `cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Analyzing => "analyzing",
            Self::Extracting => "extracting",
            Self::Completing => "completing",
            Self::Initializing => "initializing",
            Self::ProcessingFrames => "processing_frames",
            Self::Encoding => "encoding",
            Self::Tracking => "tracking",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain counters reported while a job runs.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct JobCounters {
    /// Units (frames or track points) handled so far.
    pub frames_processed: u64,
    /// Expected units, when known.
    pub frames_total: Option<u64>,
    /// Throughput over the working phases.
    pub frames_per_second: f64,
}

/// Result payload of a completed job.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutput {
    /// Extraction result.
    Extraction {
        /// Frames available for editing.
        frame_count: u64,
        /// Source frame rate.
        fps: Fps,
        /// Native frame size.
        size: FrameSize,
        /// Frames were already extracted and reused.
        cached: bool,
    },
    /// Export or preview result.
    Render {
        /// File written by the encoder.
        output: PathBuf,
        /// Rendered range.
        range: FrameRange,
        /// Frames handed to the encoder.
        frames: u64,
        /// Region instances handed to the encoder.
        regions: u64,
        /// Playback length of the range at the output frame rate.
        duration_secs: f64,
    },
    /// Tracking result; not yet written to any log.
    Tracking {
        /// Tracked region.
        region: RegionId,
        /// Frame tracking started from.
        start_frame: FrameIndex,
        /// Tracker positions in frame order.
        points: Vec<TrackPoint>,
    },
}

/// Read-only status record returned by polling.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct JobSnapshot {
    /// Job id.
    pub job_id: JobId,
    /// Job kind.
    pub kind: JobKind,
    /// Current phase.
    #[serde(rename = "state")]
    pub phase: JobPhase,
    /// Percent complete, 0..=100.
    pub progress: u8,
    /// Human-readable status line.
    pub message: String,
    /// Domain counters.
    pub counters: JobCounters,
    /// Output of a completed job.
    #[serde(rename = "result", skip_serializing_if = "Option::is_none")]
    pub output: Option<JobOutput>,
    /// Failure message of an errored job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    pub(crate) fn queued(job_id: JobId, kind: JobKind) -> Self {
        Self {
            job_id,
            kind,
            phase: JobPhase::Queued,
            progress: 0,
            message: "queued".to_string(),
            counters: JobCounters::default(),
            output: None,
            error: None,
        }
    }

    /// Return `true` once the job reached a terminal phase.
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move to `phase`, enforcing the kind's phase order.
    ///
    /// Staying in the current phase is allowed (progress updates); leaving a terminal phase,
    /// entering another kind's phase or going back to an earlier one is not.
    pub fn advance(
        &mut self,
        phase: JobPhase,
        progress: u8,
        message: impl Into<String>,
    ) -> MasklineResult<()> {
        let allowed = !self.phase.is_terminal()
            && (phase.is_terminal()
                || phase == self.phase
                || (self.kind.phases().contains(&phase) && phase.rank() > self.phase.rank()));
        if !allowed {
            return Err(MasklineError::validation(format!(
                "job {}: illegal transition {} -> {phase}",
                self.job_id, self.phase
            )));
        }
        self.phase = phase;
        self.progress = progress.min(100).max(self.progress);
        self.message = message.into();
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/state.rs"]
mod tests;
