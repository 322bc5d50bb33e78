use std::collections::BTreeMap;

use crate::foundation::config::EditOpts;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MasklineError, MasklineResult};
use crate::region::event::{EventKind, RegionEvent, RegionId};
use crate::region::geometry::Geometry;
use crate::region::log::RegionEventLog;

/// Why a gesture was dropped instead of applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Width or height at or below the minimum extent.
    TooSmall {
        /// Offending geometry.
        geometry: Geometry,
        /// Configured minimum extent.
        min_extent: i32,
    },
    /// The edit targets a frame before the region exists.
    BeforeOrigin {
        /// Frame of the attempted edit.
        frame: FrameIndex,
        /// Origin frame of the region.
        origin: FrameIndex,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall {
                geometry,
                min_extent,
            } => write!(
                f,
                "{}x{} is not larger than {min_extent}px",
                geometry.width, geometry.height
            ),
            Self::BeforeOrigin { frame, origin } => {
                write!(f, "frame {frame} precedes origin frame {origin}")
            }
        }
    }
}

/// Result of a mutation that reached the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// A new region was created.
    Created(RegionId),
    /// A geometry edit was recorded (or folded into the `Create`).
    Updated,
    /// A soft delete was recorded.
    Tombstoned,
    /// The region was deleted at its origin and every event referencing it was removed.
    Purged {
        /// Number of removed events.
        events: usize,
    },
    /// A tombstone was removed.
    Restored,
    /// Move/resize events at one frame were removed.
    Reverted {
        /// Number of removed events.
        events: usize,
    },
    /// The gesture was dropped; the log is unchanged.
    Rejected(Rejection),
}

impl EditOutcome {
    /// Return `true` when the log was modified.
    pub fn changed_log(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

/// Receives a signal after every successful mutation.
pub trait LogObserver: Send {
    /// Called with the log as it stands after the mutation.
    fn log_changed(&mut self, log: &RegionEventLog);
}

/// The only writer of a [`RegionEventLog`].
///
/// Translates edit gestures into well-formed events: assigns region ids, folds edits on a
/// region's origin frame into its `Create`, purges regions deleted at their origin and
/// drops gestures that would produce degenerate regions.
pub struct MutationGateway {
    log: RegionEventLog,
    opts: EditOpts,
    // Next sequence per origin frame. Never decreases within a session, so purged ids are
    // not handed out again.
    next_seq: BTreeMap<FrameIndex, u32>,
    observers: Vec<Box<dyn LogObserver>>,
}

impl std::fmt::Debug for MutationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGateway")
            .field("log", &self.log)
            .field("opts", &self.opts)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl MutationGateway {
    /// Gateway over an empty log.
    pub fn new(opts: EditOpts) -> Self {
        Self::from_log(RegionEventLog::new(), opts)
    }

    /// Gateway over an existing log (for example one loaded from storage).
    ///
    /// Regions tombstoned on their own origin frame are purged first.
    pub fn from_log(mut log: RegionEventLog, opts: EditOpts) -> Self {
        let purged = log.purge_origin_tombstones();
        if !purged.is_empty() {
            tracing::debug!(regions = purged.len(), "purged regions removed at their origin");
        }
        let mut next_seq = BTreeMap::<FrameIndex, u32>::new();
        for (_, bucket) in log.buckets() {
            for ev in bucket.events() {
                let id = ev.target();
                let next = next_seq.entry(id.origin).or_default();
                *next = (*next).max(id.sequence.saturating_add(1));
            }
        }
        Self {
            log,
            opts,
            next_seq,
            observers: Vec::new(),
        }
    }

    /// Read access to the log.
    pub fn log(&self) -> &RegionEventLog {
        &self.log
    }

    /// Options in effect.
    pub fn opts(&self) -> &EditOpts {
        &self.opts
    }

    /// Consume the gateway and return its log.
    pub fn into_log(self) -> RegionEventLog {
        self.log
    }

    /// Register an observer notified after every successful mutation.
    pub fn subscribe(&mut self, observer: Box<dyn LogObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn notify(&mut self) {
        for obs in self.observers.iter_mut() {
            obs.log_changed(&self.log);
        }
    }

    pub(crate) fn check_size(&self, geometry: Geometry) -> Option<Rejection> {
        let min_extent = self.opts.min_region_extent;
        (!geometry.exceeds(min_extent)).then_some(Rejection::TooSmall {
            geometry,
            min_extent,
        })
    }

    fn reject(&self, op: &'static str, frame: FrameIndex, rejection: Rejection) -> EditOutcome {
        tracing::debug!(op, frame = frame.0, %rejection, "edit rejected");
        EditOutcome::Rejected(rejection)
    }

    fn require_region(&self, id: RegionId) -> MasklineResult<()> {
        if self.log.contains_region(id) {
            Ok(())
        } else {
            Err(MasklineError::not_found(format!("region {id}")))
        }
    }

    /// Create a region at `frame`; identities are `(frame, next sequence for frame)`.
    pub fn create(&mut self, frame: FrameIndex, geometry: Geometry) -> EditOutcome {
        if let Some(r) = self.check_size(geometry) {
            return self.reject("create", frame, r);
        }
        let next = self.next_seq.entry(frame).or_default();
        let id = RegionId::new(frame, *next);
        *next += 1;
        self.log.put_event(frame, RegionEvent::Create { id, geometry });
        tracing::debug!(frame = frame.0, region = %id, "region created");
        self.notify();
        EditOutcome::Created(id)
    }

    /// Record a move of `id` at `frame`.
    pub fn move_region(
        &mut self,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) -> MasklineResult<EditOutcome> {
        self.edit_geometry("move", EventKind::Move, frame, id, geometry)
    }

    /// Record a resize of `id` at `frame`.
    pub fn resize_region(
        &mut self,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) -> MasklineResult<EditOutcome> {
        self.edit_geometry("resize", EventKind::Resize, frame, id, geometry)
    }

    fn edit_geometry(
        &mut self,
        op: &'static str,
        kind: EventKind,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) -> MasklineResult<EditOutcome> {
        self.require_region(id)?;
        if frame < id.origin {
            return Ok(self.reject(op, frame, Rejection::BeforeOrigin { frame, origin: id.origin }));
        }
        if let Some(r) = self.check_size(geometry) {
            return Ok(self.reject(op, frame, r));
        }
        self.write_geometry(kind, frame, id, geometry);
        tracing::debug!(op, frame = frame.0, region = %id, "region edited");
        self.notify();
        Ok(EditOutcome::Updated)
    }

    /// Write a geometry edit without validation or notification.
    ///
    /// On the origin frame the `Create` carries the new geometry. Elsewhere the event of
    /// `kind` is put with replace semantics and a sibling move/resize on the same frame is
    /// kept in agreement, so the frame's final geometry is the last one written.
    pub(crate) fn write_geometry(
        &mut self,
        kind: EventKind,
        frame: FrameIndex,
        id: RegionId,
        geometry: Geometry,
    ) {
        if frame == id.origin {
            self.log.put_event(frame, RegionEvent::Create { id, geometry });
        }
        let sibling = match kind {
            EventKind::Move => EventKind::Resize,
            _ => EventKind::Move,
        };
        let has_sibling = self.log.find(frame, id, sibling).is_some();
        let has_own = self.log.find(frame, id, kind).is_some();

        if frame != id.origin || has_own {
            self.log.put_event(frame, geometry_event(kind, id, geometry));
        }
        if has_sibling {
            self.log.put_event(frame, geometry_event(sibling, id, geometry));
        }
    }

    /// Delete `id` at `frame`: a purge on the origin frame, a tombstone after it.
    pub fn remove(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        self.require_region(id)?;
        if frame < id.origin {
            let rejection = Rejection::BeforeOrigin {
                frame,
                origin: id.origin,
            };
            return Ok(self.reject("remove", frame, rejection));
        }
        if frame == id.origin {
            let events = self.log.purge_region(id);
            tracing::debug!(frame = frame.0, region = %id, events, "region purged");
            self.notify();
            return Ok(EditOutcome::Purged { events });
        }
        self.log.put_event(frame, RegionEvent::Tombstone { target: id });
        tracing::debug!(frame = frame.0, region = %id, "region tombstoned");
        self.notify();
        Ok(EditOutcome::Tombstoned)
    }

    /// Undo a soft delete by removing the tombstone authored exactly at `frame`.
    pub fn restore(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        let removed = self
            .log
            .remove_events(frame, |e| *e == RegionEvent::Tombstone { target: id });
        if removed.is_empty() {
            return Err(MasklineError::not_found(format!(
                "no tombstone for region {id} at frame {frame}"
            )));
        }
        tracing::debug!(frame = frame.0, region = %id, "region restored");
        self.notify();
        Ok(EditOutcome::Restored)
    }

    /// Remove the move/resize events authored for `id` exactly at `frame`.
    pub fn revert(&mut self, frame: FrameIndex, id: RegionId) -> MasklineResult<EditOutcome> {
        let removed = self.log.remove_events(frame, |e| {
            e.target() == id && matches!(e.kind(), EventKind::Move | EventKind::Resize)
        });
        if removed.is_empty() {
            return Err(MasklineError::not_found(format!(
                "no local edit for region {id} at frame {frame}"
            )));
        }
        tracing::debug!(
            frame = frame.0,
            region = %id,
            events = removed.len(),
            "local edit reverted"
        );
        self.notify();
        Ok(EditOutcome::Reverted {
            events: removed.len(),
        })
    }

    /// Remove every event; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let events = self.log.event_count();
        self.log.clear();
        tracing::debug!(events, "log cleared");
        self.notify();
        events
    }
}

fn geometry_event(kind: EventKind, target: RegionId, geometry: Geometry) -> RegionEvent {
    match kind {
        EventKind::Resize => RegionEvent::Resize { target, geometry },
        _ => RegionEvent::Move { target, geometry },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edit/gateway.rs"]
mod tests;
