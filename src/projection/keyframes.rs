use crate::foundation::core::FrameIndex;
use crate::projection::projector::ReplayState;
use crate::region::event::RegionEvent;
use crate::region::log::RegionEventLog;

/// Per-frame counts of authored changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ChangeSummary {
    /// `Create` events.
    pub additions: usize,
    /// `Tombstone` events.
    pub removals: usize,
    /// `Move` events.
    pub moves: usize,
    /// `Resize` events.
    pub resizes: usize,
}

impl ChangeSummary {
    /// Count the events of one bucket.
    pub fn from_events(events: &[RegionEvent]) -> Self {
        let mut s = Self::default();
        for ev in events {
            match ev {
                RegionEvent::Create { .. } => s.additions += 1,
                RegionEvent::Tombstone { .. } => s.removals += 1,
                RegionEvent::Move { .. } => s.moves += 1,
                RegionEvent::Resize { .. } => s.resizes += 1,
            }
        }
        s
    }

    /// Summary of the bucket at `frame`.
    pub fn at(log: &RegionEventLog, frame: FrameIndex) -> Self {
        Self::from_events(log.bucket(frame))
    }

    /// Total number of counted events.
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.moves + self.resizes
    }

    /// Return `true` when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            (self.additions, "addition"),
            (self.removals, "removal"),
            (self.moves, "move"),
            (self.resizes, "resize"),
        ];
        let mut first = true;
        for (n, noun) in parts.into_iter().filter(|(n, _)| *n > 0) {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{n} {noun}{}", if n == 1 { "" } else { "s" })?;
        }
        if first {
            f.write_str("no changes")?;
        }
        Ok(())
    }
}

/// Frames worth stopping at while scrubbing, ascending.
///
/// A frame qualifies when it carries a create, move or resize. A frame carrying only
/// tombstones qualifies while some region is still active there after the removal.
pub fn frames_with_changes(log: &RegionEventLog) -> Vec<FrameIndex> {
    let mut state = ReplayState::default();
    let mut out = Vec::new();
    for (frame, bucket) in log.buckets() {
        state.apply_bucket(frame, bucket.events());
        let edits = bucket
            .events()
            .iter()
            .any(|e| !matches!(e, RegionEvent::Tombstone { .. }));
        if edits || state.has_active() {
            out.push(frame);
        }
    }
    out
}

/// First keyframe after `current`, wrapping to the start of the timeline.
///
/// Returns `None` when no keyframe other than `current` exists.
pub fn next_change(log: &RegionEventLog, current: FrameIndex) -> Option<FrameIndex> {
    let keys = frames_with_changes(log);
    if let Some(f) = keys.iter().copied().find(|f| *f > current) {
        return Some(f);
    }
    keys.iter().copied().find(|f| *f != current)
}

/// Last keyframe before `current`, wrapping to the end of the timeline.
///
/// Returns `None` when no keyframe other than `current` exists.
pub fn previous_change(log: &RegionEventLog, current: FrameIndex) -> Option<FrameIndex> {
    let keys = frames_with_changes(log);
    if let Some(f) = keys.iter().rev().copied().find(|f| *f < current) {
        return Some(f);
    }
    keys.iter().rev().copied().find(|f| *f != current)
}
