use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::foundation::core::FrameIndex;
use crate::region::event::{EventKind, RegionEvent, RegionId};
use crate::region::geometry::Geometry;

/// Events authored at one frame. Order inside a bucket carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameBucket {
    events: Vec<RegionEvent>,
}

impl FrameBucket {
    /// Borrow the bucket's events.
    pub fn events(&self) -> &[RegionEvent] {
        &self.events
    }

    /// Number of events in the bucket.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` when the bucket holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn references(&self, id: RegionId) -> bool {
        self.events.iter().any(|e| e.target() == id)
    }
}

/// Sparse, frame-ordered store of event buckets for one editing session.
///
/// Invariants maintained here:
/// - at most one event per `(frame, target, kind)`; a later put replaces the earlier one
/// - frames present in the log always carry at least one event
/// - `refs` lists, for every region id, exactly the frames whose bucket references it
///
/// The log does not interpret events; identity rules are enforced by the mutation gateway.
#[derive(Clone, Debug, Default)]
pub struct RegionEventLog {
    buckets: BTreeMap<FrameIndex, FrameBucket>,
    refs: HashMap<RegionId, BTreeSet<FrameIndex>>,
    revision: u64,
}

impl PartialEq for RegionEventLog {
    fn eq(&self, other: &Self) -> bool {
        // Bucket order is irrelevant; compare as sorted multisets per frame.
        self.buckets.len() == other.buckets.len()
            && self
                .buckets
                .iter()
                .zip(other.buckets.iter())
                .all(|((fa, a), (fb, b))| fa == fb && sorted_events(a) == sorted_events(b))
    }
}

fn sorted_events(b: &FrameBucket) -> Vec<(RegionId, EventKind, Option<Geometry>)> {
    let mut v = b
        .events
        .iter()
        .map(|e| (e.target(), e.kind(), e.geometry()))
        .collect::<Vec<_>>();
    v.sort_by_key(|(id, kind, _)| (*id, *kind));
    v
}

impl RegionEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter bumped on every mutation; used to invalidate memoized projections.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert `event` at `frame`, replacing any event with the same target and kind.
    ///
    /// Returns the replaced event, if any.
    pub fn put_event(&mut self, frame: FrameIndex, event: RegionEvent) -> Option<RegionEvent> {
        let bucket = self.buckets.entry(frame).or_default();
        let slot = event.slot();
        let replaced = match bucket.events.iter_mut().find(|e| e.slot() == slot) {
            Some(existing) => Some(std::mem::replace(existing, event)),
            None => {
                bucket.events.push(event);
                None
            }
        };
        self.refs.entry(event.target()).or_default().insert(frame);
        self.revision += 1;
        replaced
    }

    /// Remove every event at `frame` matching `pred`; returns the removed events.
    ///
    /// A bucket left empty is pruned from the log.
    pub fn remove_events(
        &mut self,
        frame: FrameIndex,
        mut pred: impl FnMut(&RegionEvent) -> bool,
    ) -> Vec<RegionEvent> {
        let Some(bucket) = self.buckets.get_mut(&frame) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        bucket.events.retain(|e| {
            if pred(e) {
                removed.push(*e);
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            return removed;
        }

        let unlinked = removed
            .iter()
            .map(|e| e.target())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|id| !bucket.references(*id))
            .collect::<Vec<_>>();
        let now_empty = bucket.is_empty();

        for id in unlinked {
            self.unlink(id, frame);
        }
        if now_empty {
            self.buckets.remove(&frame);
        }
        self.revision += 1;
        removed
    }

    fn unlink(&mut self, id: RegionId, frame: FrameIndex) {
        if let Some(frames) = self.refs.get_mut(&id) {
            frames.remove(&frame);
            if frames.is_empty() {
                self.refs.remove(&id);
            }
        }
    }

    /// Remove every event targeting `id` on any frame; returns how many were removed.
    pub fn purge_region(&mut self, id: RegionId) -> usize {
        let frames = self.frames_referencing(id).collect::<Vec<_>>();
        frames
            .into_iter()
            .map(|f| self.remove_events(f, |e| e.target() == id).len())
            .sum()
    }

    /// Purge every region tombstoned on its own origin frame.
    ///
    /// A removal at the origin is a hard delete, so such a tombstone never survives in a
    /// well-formed log. Returns the purged ids, ascending.
    pub fn purge_origin_tombstones(&mut self) -> Vec<RegionId> {
        let ids = self
            .buckets
            .iter()
            .flat_map(|(frame, b)| {
                b.events.iter().filter_map(move |e| match e {
                    RegionEvent::Tombstone { target } if target.origin == *frame => Some(*target),
                    _ => None,
                })
            })
            .collect::<BTreeSet<_>>();
        for id in &ids {
            self.purge_region(*id);
        }
        ids.into_iter().collect()
    }

    /// Events authored at `frame` (empty when the frame has none).
    pub fn bucket(&self, frame: FrameIndex) -> &[RegionEvent] {
        self.buckets
            .get(&frame)
            .map(FrameBucket::events)
            .unwrap_or(&[])
    }

    /// Look up the event for `(frame, target, kind)`.
    pub fn find(
        &self,
        frame: FrameIndex,
        target: RegionId,
        kind: EventKind,
    ) -> Option<&RegionEvent> {
        self.bucket(frame)
            .iter()
            .find(|e| e.target() == target && e.kind() == kind)
    }

    /// Ascending frame indices whose buckets are non-empty.
    pub fn frames_with_events(&self) -> impl DoubleEndedIterator<Item = FrameIndex> + '_ {
        self.buckets.keys().copied()
    }

    /// Buckets in ascending frame order.
    pub fn buckets(&self) -> impl Iterator<Item = (FrameIndex, &FrameBucket)> + '_ {
        self.buckets.iter().map(|(f, b)| (*f, b))
    }

    /// Buckets with frame index in `(after, through]`, ascending; `after = None` starts at 0.
    pub fn buckets_between(
        &self,
        after: Option<FrameIndex>,
        through: FrameIndex,
    ) -> impl Iterator<Item = (FrameIndex, &FrameBucket)> + '_ {
        use std::ops::Bound;
        let lower = match after {
            Some(f) => Bound::Excluded(f),
            None => Bound::Unbounded,
        };
        // An inverted range would panic in BTreeMap::range; collapse it to an empty one.
        let upper = match after {
            Some(f) if f >= through => Bound::Included(f),
            _ => Bound::Included(through),
        };
        self.buckets.range((lower, upper)).map(|(f, b)| (*f, b))
    }

    /// Frames whose buckets reference `id` (any kind), ascending.
    pub fn frames_referencing(&self, id: RegionId) -> impl Iterator<Item = FrameIndex> + '_ {
        self.refs.get(&id).into_iter().flatten().copied()
    }

    /// Return `true` when `id` has a `Create` event at its origin frame.
    pub fn contains_region(&self, id: RegionId) -> bool {
        self.find(id.origin, id, EventKind::Create).is_some()
    }

    /// All region ids with a `Create` event, ascending.
    pub fn region_ids(&self) -> Vec<RegionId> {
        let mut ids = self
            .buckets
            .values()
            .flat_map(|b| b.events.iter())
            .filter_map(|e| match e {
                RegionEvent::Create { id, .. } => Some(*id),
                _ => None,
            })
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Total number of events across all buckets.
    pub fn event_count(&self) -> usize {
        self.buckets.values().map(FrameBucket::len).sum()
    }

    /// Number of non-empty frames.
    pub fn frame_count(&self) -> usize {
        self.buckets.len()
    }

    /// Return `true` when no events are stored.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Remove every event.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.refs.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/region/log.rs"]
mod tests;
