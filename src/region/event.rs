use std::str::FromStr;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::MasklineError;
use crate::region::geometry::Geometry;

/// Immutable identity of a region: the frame it was created on plus a per-frame sequence.
///
/// The textual form is `"<origin>_<sequence>"`, which is also the wire representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId {
    /// Frame carrying the region's `Create` event.
    pub origin: FrameIndex,
    /// Sequence number among regions created on `origin`.
    pub sequence: u32,
}

impl RegionId {
    /// Construct an id from its parts.
    pub const fn new(origin: FrameIndex, sequence: u32) -> Self {
        Self { origin, sequence }
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.origin.0, self.sequence)
    }
}

impl FromStr for RegionId {
    type Err = MasklineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (origin, sequence) = s
            .split_once('_')
            .ok_or_else(|| {
                MasklineError::serde(format!("region id '{s}' is not '<frame>_<seq>'"))
            })?;
        let origin = origin
            .parse::<u64>()
            .map_err(|e| MasklineError::serde(format!("region id '{s}' frame: {e}")))?;
        let sequence = sequence
            .parse::<u32>()
            .map_err(|e| MasklineError::serde(format!("region id '{s}' sequence: {e}")))?;
        Ok(Self::new(FrameIndex(origin), sequence))
    }
}

impl serde::Serialize for RegionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for RegionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Discriminant of a [`RegionEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Region creation.
    Create,
    /// Geometry change recorded as a move.
    Move,
    /// Geometry change recorded as a resize.
    Resize,
    /// Soft delete marker.
    Tombstone,
}

/// One event authored at a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionEvent {
    /// Instantiate region `id`; only valid at `id.origin`.
    Create {
        /// Identity of the new region.
        id: RegionId,
        /// Initial geometry.
        geometry: Geometry,
    },
    /// Replace the geometry of `target` from this frame on.
    Move {
        /// Region being moved.
        target: RegionId,
        /// Geometry after the move.
        geometry: Geometry,
    },
    /// Replace the geometry of `target` from this frame on.
    Resize {
        /// Region being resized.
        target: RegionId,
        /// Geometry after the resize.
        geometry: Geometry,
    },
    /// Hide `target` from this frame on (ghost exactly at this frame).
    Tombstone {
        /// Region being deleted.
        target: RegionId,
    },
}

impl RegionEvent {
    /// Region the event refers to (the created id for `Create`).
    pub fn target(&self) -> RegionId {
        match *self {
            Self::Create { id, .. } => id,
            Self::Move { target, .. }
            | Self::Resize { target, .. }
            | Self::Tombstone { target } => target,
        }
    }

    /// Event discriminant.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Create { .. } => EventKind::Create,
            Self::Move { .. } => EventKind::Move,
            Self::Resize { .. } => EventKind::Resize,
            Self::Tombstone { .. } => EventKind::Tombstone,
        }
    }

    /// Geometry carried by the event, if any.
    pub fn geometry(&self) -> Option<Geometry> {
        match *self {
            Self::Create { geometry, .. }
            | Self::Move { geometry, .. }
            | Self::Resize { geometry, .. } => Some(geometry),
            Self::Tombstone { .. } => None,
        }
    }

    /// Slot key used for replace semantics inside a bucket.
    pub(crate) fn slot(&self) -> (RegionId, EventKind) {
        (self.target(), self.kind())
    }
}
