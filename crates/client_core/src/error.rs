use shared::{domain::UserId, error::ServiceError};
use thiserror::Error;

/// Failures surfaced by [`crate::UserController`] transitions.
///
/// Every variant is logged at the call site before it is returned; front ends
/// are not expected to display them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("failed to fetch users: {0}")]
    Fetch(#[source] ServiceError),
    #[error("failed to create user: {0}")]
    Create(#[source] ServiceError),
    #[error("failed to update user {id}: {source}")]
    Update {
        id: UserId,
        #[source]
        source: ServiceError,
    },
    #[error("failed to delete user {id}: {source}")]
    Delete {
        id: UserId,
        #[source]
        source: ServiceError,
    },
    #[error("controller has been torn down")]
    TornDown,
}

impl ControllerError {
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            Self::Fetch(source) | Self::Create(source) => Some(source),
            Self::Update { source, .. } | Self::Delete { source, .. } => Some(source),
            Self::TornDown => None,
        }
    }
}
