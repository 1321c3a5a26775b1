use std::time::Duration;

use thiserror::Error;

use crate::domain::UserId;

/// Failure reported by a user service backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
