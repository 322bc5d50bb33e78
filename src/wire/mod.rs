//! Serialized form of the region log exchanged with storage.

pub(crate) mod format;
