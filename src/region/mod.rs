//! Region identity, events, and the frame-indexed event log.

pub(crate) mod event;
pub(crate) mod geometry;
pub(crate) mod log;
