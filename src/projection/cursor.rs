use std::collections::BTreeMap;

use crate::foundation::core::FrameIndex;
use crate::projection::projector::{Projection, ProjectionMode, ReplayState};
use crate::region::log::RegionEventLog;

/// Memoized projector for sequential frame navigation.
///
/// The cursor keeps the replay state of the last visited frame and a checkpoint every
/// `checkpoint_interval` replayed event frames. Seeking forward replays only the new
/// buckets; seeking backward resumes from the nearest checkpoint at or before the target.
/// Any change to the log (observed through [`RegionEventLog::revision`]) drops all
/// memoized state.
///
/// Results are identical to [`crate::project`] for every frame.
#[derive(Debug)]
pub struct ProjectionCursor {
    checkpoint_interval: usize,
    revision: Option<u64>,
    state: ReplayState,
    // Every bucket at or before this frame has been applied to `state`.
    applied_through: Option<FrameIndex>,
    checkpoints: BTreeMap<FrameIndex, ReplayState>,
    since_checkpoint: usize,
    replayed_buckets: u64,
}

impl ProjectionCursor {
    /// Create a cursor; an interval of 0 is treated as 1.
    pub fn new(checkpoint_interval: usize) -> Self {
        Self {
            checkpoint_interval: checkpoint_interval.max(1),
            revision: None,
            state: ReplayState::default(),
            applied_through: None,
            checkpoints: BTreeMap::new(),
            since_checkpoint: 0,
            replayed_buckets: 0,
        }
    }

    /// Project `log` at `frame`, reusing memoized state where the log is unchanged.
    pub fn seek(
        &mut self,
        log: &RegionEventLog,
        frame: FrameIndex,
        mode: ProjectionMode,
    ) -> Projection {
        if self.revision != Some(log.revision()) {
            if self.revision.is_some() {
                tracing::trace!(revision = log.revision(), "projection cursor invalidated");
            }
            self.reset();
            self.revision = Some(log.revision());
        }

        if self.applied_through.is_some_and(|at| frame < at) {
            self.rewind(frame);
        }

        for (f, bucket) in log.buckets_between(self.applied_through, frame) {
            self.state.apply_bucket(f, bucket.events());
            self.replayed_buckets += 1;
            self.since_checkpoint += 1;
            if self.since_checkpoint >= self.checkpoint_interval {
                self.checkpoints.insert(f, self.state.clone());
                self.since_checkpoint = 0;
            }
        }
        if self.applied_through.is_none_or(|at| at < frame) {
            self.applied_through = Some(frame);
        }

        self.state.view(frame, mode)
    }

    fn rewind(&mut self, frame: FrameIndex) {
        match self.checkpoints.range(..=frame).next_back() {
            Some((f, state)) => {
                self.state = state.clone();
                self.applied_through = Some(*f);
            }
            None => {
                self.state = ReplayState::default();
                self.applied_through = None;
            }
        }
        self.since_checkpoint = 0;
    }

    /// Drop all memoized state.
    pub fn reset(&mut self) {
        self.revision = None;
        self.state = ReplayState::default();
        self.applied_through = None;
        self.checkpoints.clear();
        self.since_checkpoint = 0;
    }

    /// Number of stored checkpoints.
    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Total buckets replayed since construction; grows only when work was not memoized.
    pub fn replayed_buckets(&self) -> u64 {
        self.replayed_buckets
    }
}

impl Default for ProjectionCursor {
    fn default() -> Self {
        Self::new(crate::EditOpts::default().projection_checkpoint_interval)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/projection/cursor.rs"]
mod tests;
