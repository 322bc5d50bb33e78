//! Mutation path: the gateway that owns the region log.

pub(crate) mod gateway;
pub(crate) mod tracking;
