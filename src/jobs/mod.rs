//! Background jobs: phase state machine, collaborator contracts and the orchestrator.

pub(crate) mod collaborators;
pub(crate) mod orchestrator;
pub(crate) mod protocol;
pub(crate) mod state;
pub(crate) mod tasks;
