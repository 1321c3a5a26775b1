//! Form/list state machine driving a [`UserService`].

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::{FormField, UserDraft, UserId, UserRecord},
    error::ServiceError,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{error::ControllerError, view::delete_prompt, UserService};

/// Interactive yes/no step run before a delete is applied.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Loading,
    Creating,
    Editing(UserId),
}

/// Read-only copy of the controller state handed to rendering layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub records: Vec<UserRecord>,
    pub loading: bool,
    pub form: UserDraft,
    pub edit_target: Option<UserId>,
    /// Bumped whenever the controller rewrites the form itself (edit start, clear, cancel).
    pub form_revision: u64,
}

impl ControllerSnapshot {
    pub fn phase(&self) -> ControllerPhase {
        if self.loading {
            ControllerPhase::Loading
        } else if let Some(id) = self.edit_target {
            ControllerPhase::Editing(id)
        } else if !self.form.is_blank() {
            ControllerPhase::Creating
        } else {
            ControllerPhase::Idle
        }
    }

    pub fn record(&self, id: UserId) -> Option<&UserRecord> {
        self.records.iter().find(|record| record.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Name or email was empty; nothing was sent.
    Skipped,
    Created(UserRecord),
    Updated(UserRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(UserRecord),
    Declined,
    NotFound,
}

/// Shared flag marking the owning view as gone.
///
/// Responses that arrive after the flag is set are dropped without touching state.
#[derive(Debug, Clone, Default)]
pub struct TeardownHandle(Arc<AtomicBool>);

impl TeardownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tear_down(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_torn_down(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct UserController {
    service: Arc<dyn UserService>,
    state: ControllerSnapshot,
    request_timeout: Option<Duration>,
    propagate_deletes: bool,
    teardown: TeardownHandle,
    snapshots: watch::Sender<ControllerSnapshot>,
}

impl UserController {
    pub fn new(service: Arc<dyn UserService>) -> Self {
        let (snapshots, _) = watch::channel(ControllerSnapshot::default());
        Self {
            service,
            state: ControllerSnapshot::default(),
            request_timeout: None,
            propagate_deletes: false,
            teardown: TeardownHandle::new(),
            snapshots,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_delete_propagation(mut self, propagate: bool) -> Self {
        self.propagate_deletes = propagate;
        self
    }

    pub fn with_teardown(mut self, teardown: TeardownHandle) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        self.teardown.clone()
    }

    pub fn tear_down(&self) {
        info!("users: controller torn down");
        self.teardown.tear_down();
    }

    pub fn state(&self) -> &ControllerSnapshot {
        &self.state
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.state.clone()
    }

    pub fn phase(&self) -> ControllerPhase {
        self.state.phase()
    }

    /// Receives a fresh snapshot after every state change, including the
    /// loading edge before a request is awaited.
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn load(&mut self) -> Result<(), ControllerError> {
        self.ensure_live()?;
        self.begin_request();

        let service = Arc::clone(&self.service);
        let result = bounded(self.request_timeout, service.fetch_all()).await;
        self.ensure_live_after_response()?;

        let outcome = match result {
            Ok(records) => {
                info!(count = records.len(), "users: list loaded");
                self.state.records = records;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "users: failed to fetch list");
                Err(ControllerError::Fetch(err))
            }
        };
        self.finish_request();
        outcome
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        if self.teardown.is_torn_down() {
            return;
        }
        self.state.form.set(field, value);
        self.publish();
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.set_field(FormField::Name, value);
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.set_field(FormField::Email, value);
    }

    /// Switches to edit mode for `id`, copying its current values into the form.
    pub fn begin_edit(&mut self, id: UserId) -> bool {
        if self.teardown.is_torn_down() {
            return false;
        }
        let Some(record) = self.state.record(id) else {
            warn!(user_id = id.0, "users: edit requested for unknown record");
            return false;
        };

        self.state.form = UserDraft::from_record(record);
        self.state.edit_target = Some(id);
        self.state.form_revision += 1;
        debug!(user_id = id.0, "users: editing");
        self.publish();
        true
    }

    pub fn cancel_edit(&mut self) {
        if self.teardown.is_torn_down() {
            return;
        }
        self.reset_form();
        self.publish();
    }

    /// Creates or updates depending on the edit target. A form with an empty
    /// field is skipped without a request.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ControllerError> {
        self.ensure_live()?;
        if !self.state.form.is_complete() {
            debug!("users: submit skipped, form incomplete");
            return Ok(SubmitOutcome::Skipped);
        }

        match self.state.edit_target {
            Some(id) => self.submit_update(id).await,
            None => self.submit_create().await,
        }
    }

    async fn submit_create(&mut self) -> Result<SubmitOutcome, ControllerError> {
        let draft = self.state.form.clone();
        self.begin_request();

        let service = Arc::clone(&self.service);
        let result = bounded(self.request_timeout, service.create(draft)).await;
        self.ensure_live_after_response()?;

        let outcome = match result {
            Ok(record) => {
                info!(user_id = record.id.0, "users: created");
                match self.state.records.iter_mut().find(|r| r.id == record.id) {
                    Some(existing) => {
                        warn!(user_id = record.id.0, "users: create returned an existing id");
                        *existing = record.clone();
                    }
                    None => self.state.records.push(record.clone()),
                }
                self.reset_form();
                Ok(SubmitOutcome::Created(record))
            }
            Err(err) => {
                error!(error = %err, "users: failed to create");
                Err(ControllerError::Create(err))
            }
        };
        self.finish_request();
        outcome
    }

    async fn submit_update(&mut self, id: UserId) -> Result<SubmitOutcome, ControllerError> {
        let draft = self.state.form.clone();
        self.begin_request();

        let service = Arc::clone(&self.service);
        let result = bounded(self.request_timeout, service.update(id, draft)).await;
        self.ensure_live_after_response()?;

        let outcome = match result {
            Ok(accepted) => {
                let record = accepted.into_record(id);
                match self.state.records.iter_mut().find(|r| r.id == id) {
                    Some(existing) => *existing = record.clone(),
                    None => warn!(user_id = id.0, "users: updated record no longer listed"),
                }
                info!(user_id = id.0, "users: updated");
                self.reset_form();
                Ok(SubmitOutcome::Updated(record))
            }
            Err(err) => {
                error!(user_id = id.0, error = %err, "users: failed to update");
                Err(ControllerError::Update { id, source: err })
            }
        };
        self.finish_request();
        outcome
    }

    /// Removes `id` from the list once `prompt` confirms. When propagation is
    /// enabled the service is told afterwards; the local removal stands either way.
    pub async fn delete(
        &mut self,
        id: UserId,
        prompt: &(dyn ConfirmPrompt + Sync),
    ) -> Result<DeleteOutcome, ControllerError> {
        self.ensure_live()?;
        let Some(record) = self.state.record(id).cloned() else {
            warn!(user_id = id.0, "users: delete requested for unknown record");
            return Ok(DeleteOutcome::NotFound);
        };

        if !prompt.confirm(&delete_prompt(&record)) {
            debug!(user_id = id.0, "users: delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let before = self.state.records.len();
        self.state.records.retain(|r| r.id != id);
        debug!(
            user_id = id.0,
            before,
            after = self.state.records.len(),
            "users: removed from list"
        );
        if self.state.edit_target == Some(id) {
            self.reset_form();
        }
        self.publish();

        if !self.propagate_deletes {
            return Ok(DeleteOutcome::Removed(record));
        }

        self.begin_request();
        let service = Arc::clone(&self.service);
        let result = bounded(self.request_timeout, service.delete(id)).await;
        self.ensure_live_after_response()?;

        let outcome = match result {
            Ok(acknowledged) => {
                debug!(user_id = id.0, acknowledged, "users: delete propagated");
                Ok(DeleteOutcome::Removed(record))
            }
            Err(err) => {
                error!(user_id = id.0, error = %err, "users: failed to propagate delete");
                Err(ControllerError::Delete { id, source: err })
            }
        };
        self.finish_request();
        outcome
    }

    fn ensure_live(&self) -> Result<(), ControllerError> {
        if self.teardown.is_torn_down() {
            return Err(ControllerError::TornDown);
        }
        Ok(())
    }

    fn ensure_live_after_response(&self) -> Result<(), ControllerError> {
        if self.teardown.is_torn_down() {
            warn!("users: discarding response received after teardown");
            return Err(ControllerError::TornDown);
        }
        Ok(())
    }

    fn begin_request(&mut self) {
        self.state.loading = true;
        self.publish();
    }

    fn finish_request(&mut self) {
        self.state.loading = false;
        self.publish();
    }

    fn reset_form(&mut self) {
        self.state.form.clear();
        self.state.edit_target = None;
        self.state.form_revision += 1;
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

async fn bounded<T>(
    limit: Option<Duration>,
    request: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .unwrap_or(Err(ServiceError::Timeout(limit))),
        None => request.await,
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
