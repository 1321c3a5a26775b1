use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{UserDraft, UserId, UserRecord},
    error::ServiceError,
};

pub mod config;
pub mod controller;
pub mod error;
mod mock_service;
pub mod view;

pub use config::{load_settings, load_settings_from, BackendMode, ClientSettings};
pub use controller::{
    ConfirmPrompt, ControllerPhase, ControllerSnapshot, DeleteOutcome, SubmitOutcome,
    TeardownHandle, UserController,
};
pub use error::ControllerError;
pub use mock_service::{seed_users, IdGenerator, MockUserService};
pub use view::ViewModel;

/// Backend contract driven by [`UserController`].
#[async_trait]
pub trait UserService: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError>;
    async fn create(&self, draft: UserDraft) -> Result<UserRecord, ServiceError>;
    /// Returns the accepted payload without an id; callers re-attach `id`.
    async fn update(&self, id: UserId, draft: UserDraft) -> Result<UserDraft, ServiceError>;
    async fn delete(&self, id: UserId) -> Result<bool, ServiceError>;
}

/// Wires a mock backend and a controller from the resolved settings.
pub fn build_controller(settings: &ClientSettings, teardown: TeardownHandle) -> UserController {
    let service: Arc<dyn UserService> = Arc::new(MockUserService::from_settings(settings));
    UserController::new(service)
        .with_request_timeout(settings.request_timeout())
        .with_delete_propagation(settings.propagate_deletes)
        .with_teardown(teardown)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
