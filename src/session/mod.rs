//! Per-video editing session facade.

pub(crate) mod edit_session;
