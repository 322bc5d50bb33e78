//! Save/load contract for region logs and debounced auto-save.

pub(crate) mod autosave;
pub(crate) mod store;
