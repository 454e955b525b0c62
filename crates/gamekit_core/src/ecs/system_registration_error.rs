use crate::ecs::execution_group::ExecutionGroup;
use crate::ecs::system_descriptor::SystemId;
use thiserror::Error;

/// Errors that can occur while registering or removing a component system.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SystemRegistrationError {
    #[error("system {id} is already registered in the {group} group")]
    DuplicateId { id: SystemId, group: ExecutionGroup },

    #[error("system {id} is not registered in the {group} group")]
    UnknownSystem { id: SystemId, group: ExecutionGroup },
}
