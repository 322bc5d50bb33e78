//! Maskline is a frame-indexed region annotation engine for video redaction.
//!
//! Regions are never stored per frame. Every edit is recorded once, at the frame it was made,
//! in a [`RegionEventLog`], and the state at any frame is the replay of everything up to it.
//! The public API is session-oriented:
//!
//! - Open an [`EditSession`] over a [`LogStore`]
//! - Create, move, resize and remove regions through its [`MutationGateway`]
//! - [`project`] any frame, or build a [`RegionPlan`] for a range
//! - Hand export, preview and tracking requests to the [`JobOrchestrator`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod edit;
pub(crate) mod jobs;
pub(crate) mod persist;
pub(crate) mod projection;
pub(crate) mod region;
pub(crate) mod session;
pub(crate) mod wire;

pub use crate::foundation::config::{AutoSaveOpts, EditOpts, EngineConfig, JobOpts, StorageOpts};
pub use crate::foundation::core::{Fps, FrameIndex, FrameRange, FrameSize};
pub use crate::foundation::error::{MasklineError, MasklineResult};

pub use crate::region::event::{EventKind, RegionEvent, RegionId};
pub use crate::region::geometry::Geometry;
pub use crate::region::log::{FrameBucket, RegionEventLog};

pub use crate::projection::cursor::ProjectionCursor;
pub use crate::projection::keyframes::{
    ChangeSummary, frames_with_changes, next_change, previous_change,
};
pub use crate::projection::plan::{RegionPlan, preview_range};
pub use crate::projection::projector::{Projection, ProjectedRegion, ProjectionMode, project};

pub use crate::edit::gateway::{EditOutcome, LogObserver, MutationGateway, Rejection};
pub use crate::edit::tracking::{TrackPoint, TrackingSummary};

pub use crate::wire::format::{WireLog, WireRecord, decode, decode_json, encode, encode_json};

pub use crate::persist::autosave::{AutoSaveStats, AutoSaver};
pub use crate::persist::store::{
    FsLogStore, LogStore, MemoryLogStore, SessionId, open_log, save_log,
};

pub use crate::jobs::collaborators::{
    FrameStream, InMemorySink, RegionSink, RegionTracker, RenderConfig, SinkFactory, TrackStream,
    VideoInfo, VideoSource,
};
pub use crate::jobs::orchestrator::JobOrchestrator;
pub use crate::jobs::state::{JobCounters, JobId, JobKind, JobOutput, JobPhase, JobSnapshot};
pub use crate::jobs::tasks::{
    Collaborators, ExtractionParams, JobRequest, RenderParams, TrackingParams,
};

pub use crate::session::edit_session::EditSession;
