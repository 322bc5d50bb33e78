//! Frame projection: replaying the event log into per-frame region state.

pub(crate) mod cursor;
pub(crate) mod keyframes;
pub(crate) mod plan;
pub(crate) mod projector;
