use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::*;
use crate::{config::BackendMode, mock_service::seed_users, MockUserService};

fn seed() -> Vec<UserRecord> {
    seed_users()
}

struct RecordingService {
    records: Vec<UserRecord>,
    next_id: Mutex<i64>,
    calls: Mutex<Vec<String>>,
}

impl RecordingService {
    fn new(records: Vec<UserRecord>) -> Self {
        Self {
            records,
            next_id: Mutex::new(100),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl UserService for RecordingService {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError> {
        self.record_call("fetch_all".to_string());
        Ok(self.records.clone())
    }

    async fn create(&self, draft: UserDraft) -> Result<UserRecord, ServiceError> {
        self.record_call(format!("create:{}", draft.name));
        let mut next_id = self.next_id.lock().expect("id lock");
        *next_id += 1;
        Ok(draft.into_record(UserId(*next_id)))
    }

    async fn update(&self, id: UserId, draft: UserDraft) -> Result<UserDraft, ServiceError> {
        self.record_call(format!("update:{id}"));
        Ok(draft)
    }

    async fn delete(&self, id: UserId) -> Result<bool, ServiceError> {
        self.record_call(format!("delete:{id}"));
        Ok(true)
    }
}

struct GatedService {
    gate: Arc<Notify>,
    records: Vec<UserRecord>,
}

#[async_trait]
impl UserService for GatedService {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError> {
        self.gate.notified().await;
        Ok(self.records.clone())
    }

    async fn create(&self, draft: UserDraft) -> Result<UserRecord, ServiceError> {
        self.gate.notified().await;
        Ok(draft.into_record(UserId(77)))
    }

    async fn update(&self, _id: UserId, draft: UserDraft) -> Result<UserDraft, ServiceError> {
        Ok(draft)
    }

    async fn delete(&self, _id: UserId) -> Result<bool, ServiceError> {
        self.gate.notified().await;
        Ok(true)
    }
}

struct FailingService;

#[async_trait]
impl UserService for FailingService {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError> {
        Err(ServiceError::unavailable("backend offline"))
    }

    async fn create(&self, _draft: UserDraft) -> Result<UserRecord, ServiceError> {
        Err(ServiceError::unavailable("backend offline"))
    }

    async fn update(&self, _id: UserId, _draft: UserDraft) -> Result<UserDraft, ServiceError> {
        Err(ServiceError::unavailable("backend offline"))
    }

    async fn delete(&self, _id: UserId) -> Result<bool, ServiceError> {
        Err(ServiceError::unavailable("backend offline"))
    }
}

struct HangingService;

#[async_trait]
impl UserService for HangingService {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError> {
        std::future::pending().await
    }

    async fn create(&self, _draft: UserDraft) -> Result<UserRecord, ServiceError> {
        std::future::pending().await
    }

    async fn update(&self, _id: UserId, _draft: UserDraft) -> Result<UserDraft, ServiceError> {
        std::future::pending().await
    }

    async fn delete(&self, _id: UserId) -> Result<bool, ServiceError> {
        std::future::pending().await
    }
}

async fn loaded_controller(service: Arc<RecordingService>) -> UserController {
    let mut controller = UserController::new(service);
    controller.load().await.expect("initial load");
    controller
}

fn shared_mock() -> Arc<MockUserService> {
    Arc::new(MockUserService::new(BackendMode::Shared, Duration::ZERO))
}

#[tokio::test]
async fn load_replaces_list_with_fetch_result_in_order() {
    let records = vec![
        UserRecord::new(UserId(9), "Zed", "zed@email.com"),
        UserRecord::new(UserId(3), "Ana", "ana@email.com"),
    ];
    let controller = loaded_controller(Arc::new(RecordingService::new(records.clone()))).await;

    assert_eq!(controller.state().records, records);
    assert!(!controller.state().loading);
    assert_eq!(controller.phase(), ControllerPhase::Idle);
}

#[tokio::test]
async fn loading_flag_is_set_only_while_request_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut controller = UserController::new(Arc::new(GatedService {
        gate: Arc::clone(&gate),
        records: seed(),
    }));
    let mut rx = controller.subscribe();
    assert!(!controller.state().loading);

    let (result, ()) = tokio::join!(controller.load(), async {
        rx.changed().await.expect("snapshot published");
        let in_flight = rx.borrow_and_update().clone();
        assert!(in_flight.loading);
        assert_eq!(in_flight.phase(), ControllerPhase::Loading);
        assert!(in_flight.records.is_empty());
        gate.notify_one();
    });

    result.expect("load");
    assert!(!controller.state().loading);
    assert_eq!(controller.state().records, seed());
    assert!(!rx.borrow().loading);
}

#[tokio::test]
async fn submit_with_empty_field_sends_nothing() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;

    controller.set_name("Ana");
    let before = controller.snapshot();
    let outcome = controller.submit().await.expect("submit");

    assert_eq!(outcome, SubmitOutcome::Skipped);
    assert_eq!(controller.snapshot(), before);
    assert_eq!(service.calls(), vec!["fetch_all".to_string()]);
}

#[tokio::test]
async fn update_with_cleared_field_sends_nothing() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;

    assert!(controller.begin_edit(UserId(1)));
    controller.set_email("");
    let before = controller.snapshot();

    assert_eq!(controller.submit().await, Ok(SubmitOutcome::Skipped));
    assert_eq!(controller.snapshot(), before);
    assert_eq!(controller.phase(), ControllerPhase::Editing(UserId(1)));
    assert_eq!(service.calls(), vec!["fetch_all".to_string()]);
}

#[tokio::test]
async fn create_appends_record_with_fresh_id_and_clears_form() {
    let mut controller = UserController::new(shared_mock());
    controller.load().await.expect("load");
    let prior_ids: Vec<_> = controller.state().records.iter().map(|r| r.id).collect();

    controller.set_name("Ana Lima");
    controller.set_email("ana@email.com");
    assert_eq!(controller.phase(), ControllerPhase::Creating);

    let SubmitOutcome::Created(created) = controller.submit().await.expect("create") else {
        panic!("expected create");
    };

    assert!(!prior_ids.contains(&created.id));
    assert_eq!(controller.state().records.last(), Some(&created));
    assert_eq!(controller.state().records.len(), prior_ids.len() + 1);
    assert!(controller.state().form.is_blank());
    assert_eq!(controller.phase(), ControllerPhase::Idle);
}

#[tokio::test]
async fn back_to_back_creates_get_distinct_ids() {
    let mut controller = UserController::new(shared_mock());
    let mut ids = Vec::new();
    for n in 0..3 {
        controller.set_name(format!("user {n}"));
        controller.set_email(format!("user{n}@email.com"));
        match controller.submit().await.expect("create") {
            SubmitOutcome::Created(record) => ids.push(record.id),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    let mut deduped = ids.clone();
    deduped.dedup();
    assert_eq!(deduped, ids);
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn edit_populates_form_and_routes_submit_to_update() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;
    let target = seed()[1].clone();

    assert!(controller.begin_edit(target.id));
    assert_eq!(controller.state().form, UserDraft::from_record(&target));
    assert_eq!(controller.phase(), ControllerPhase::Editing(target.id));

    controller.set_name("Maria S. Santos");
    let outcome = controller.submit().await.expect("update");

    let expected = UserRecord::new(target.id, "Maria S. Santos", target.email.clone());
    assert_eq!(outcome, SubmitOutcome::Updated(expected.clone()));
    assert_eq!(controller.state().records[1], expected);
    assert_eq!(controller.state().records[0], seed()[0]);
    assert_eq!(controller.state().edit_target, None);
    assert!(controller.state().form.is_blank());
    assert_eq!(
        service.calls(),
        vec!["fetch_all".to_string(), format!("update:{}", target.id)]
    );
}

#[tokio::test]
async fn edit_of_unknown_record_is_ignored() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(service).await;
    let before = controller.snapshot();

    assert!(!controller.begin_edit(UserId(404)));
    assert_eq!(controller.snapshot(), before);
}

#[tokio::test]
async fn cancel_during_edit_clears_form_without_touching_list() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;
    controller.begin_edit(UserId(1));
    controller.set_name("changed");
    let revision = controller.state().form_revision;

    controller.cancel_edit();

    assert_eq!(controller.state().records, seed());
    assert_eq!(controller.state().edit_target, None);
    assert!(controller.state().form.is_blank());
    assert!(controller.state().form_revision > revision);
    assert_eq!(service.calls(), vec!["fetch_all".to_string()]);
}

#[tokio::test]
async fn confirmed_delete_removes_only_the_target() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;
    let asked = Mutex::new(Vec::new());
    let prompt = |message: &str| {
        asked.lock().expect("prompt lock").push(message.to_string());
        true
    };

    let outcome = controller.delete(UserId(1), &prompt).await.expect("delete");

    assert_eq!(outcome, DeleteOutcome::Removed(seed()[0].clone()));
    assert_eq!(controller.state().records, vec![seed()[1].clone()]);
    assert_eq!(*asked.lock().expect("prompt lock"), vec!["Delete João Silva?"]);
    assert_eq!(service.calls(), vec!["fetch_all".to_string()]);
}

#[tokio::test]
async fn declined_delete_leaves_state_unchanged() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(Arc::clone(&service)).await;
    let before = controller.snapshot();

    let outcome = controller
        .delete(UserId(2), &|_: &str| false)
        .await
        .expect("delete");

    assert_eq!(outcome, DeleteOutcome::Declined);
    assert_eq!(controller.snapshot(), before);
}

#[tokio::test]
async fn delete_of_unknown_record_never_prompts() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(service).await;

    let outcome = controller
        .delete(UserId(404), &|_: &str| -> bool { panic!("prompted for missing record") })
        .await
        .expect("delete");

    assert_eq!(outcome, DeleteOutcome::NotFound);
    assert_eq!(controller.state().records, seed());
}

#[tokio::test]
async fn delete_is_propagated_when_enabled() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = UserController::new(service.clone()).with_delete_propagation(true);
    controller.load().await.expect("load");

    controller
        .delete(UserId(2), &|_: &str| true)
        .await
        .expect("delete");

    assert_eq!(
        service.calls(),
        vec!["fetch_all".to_string(), "delete:2".to_string()]
    );
}

#[tokio::test]
async fn propagated_delete_failure_keeps_local_removal() {
    let mut controller = UserController::new(Arc::new(FailingService)).with_delete_propagation(true);
    controller.state.records = seed();

    let err = controller
        .delete(UserId(1), &|_: &str| true)
        .await
        .expect_err("delete should report failure");

    assert!(matches!(err, ControllerError::Delete { id: UserId(1), .. }));
    assert_eq!(controller.state().records, vec![seed()[1].clone()]);
}

#[tokio::test]
async fn propagated_delete_marks_loading_until_acknowledged() {
    let gate = Arc::new(Notify::new());
    let mut controller = UserController::new(Arc::new(GatedService {
        gate: Arc::clone(&gate),
        records: seed(),
    }))
    .with_delete_propagation(true);
    controller.state.records = seed();
    let mut rx = controller.subscribe();
    let confirm = |_: &str| true;

    let (result, ()) = tokio::join!(controller.delete(UserId(1), &confirm), async {
        rx.changed().await.expect("removal published");
        let in_flight = rx.borrow_and_update().clone();
        assert!(in_flight.loading);
        assert_eq!(in_flight.records, vec![seed()[1].clone()]);
        gate.notify_one();
    });

    assert_eq!(result, Ok(DeleteOutcome::Removed(seed()[0].clone())));
    assert!(!controller.state().loading);
    assert!(!rx.borrow().loading);
}

#[tokio::test]
async fn local_only_delete_never_sets_loading() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(service).await;
    let mut rx = controller.subscribe();

    controller
        .delete(UserId(1), &|_: &str| true)
        .await
        .expect("delete");

    assert!(rx.has_changed().expect("sender alive"));
    assert!(!rx.borrow_and_update().loading);
    assert!(!controller.state().loading);
}

#[tokio::test]
async fn deleting_record_under_edit_leaves_edit_mode() {
    let service = Arc::new(RecordingService::new(seed()));
    let mut controller = loaded_controller(service).await;
    controller.begin_edit(UserId(2));

    controller
        .delete(UserId(2), &|_: &str| true)
        .await
        .expect("delete");

    assert_eq!(controller.phase(), ControllerPhase::Idle);
    assert!(controller.state().form.is_blank());
}

#[tokio::test]
async fn fetch_failure_is_reported_and_clears_loading() {
    let mut controller = UserController::new(Arc::new(FailingService));

    let err = controller.load().await.expect_err("fetch should fail");

    assert_eq!(
        err,
        ControllerError::Fetch(ServiceError::unavailable("backend offline"))
    );
    assert!(!controller.state().loading);
    assert!(controller.state().records.is_empty());
}

#[tokio::test]
async fn create_failure_keeps_form_for_manual_retry() {
    let mut controller = UserController::new(Arc::new(FailingService));
    controller.set_name("Ana");
    controller.set_email("ana@email.com");

    let err = controller.submit().await.expect_err("create should fail");

    assert!(matches!(err, ControllerError::Create(_)));
    assert!(!controller.state().loading);
    assert_eq!(controller.state().form, UserDraft::new("Ana", "ana@email.com"));
    assert!(controller.state().records.is_empty());
}

#[tokio::test]
async fn update_of_record_missing_from_backend_fails() {
    let service = shared_mock();
    let mut controller = UserController::new(service.clone());
    controller.load().await.expect("load");
    service.delete(UserId(1)).await.expect("backend delete");

    controller.begin_edit(UserId(1));
    let err = controller.submit().await.expect_err("update should fail");

    assert_eq!(
        err,
        ControllerError::Update {
            id: UserId(1),
            source: ServiceError::NotFound(UserId(1)),
        }
    );
    assert_eq!(controller.phase(), ControllerPhase::Editing(UserId(1)));
    assert_eq!(controller.state().records, seed());
}

#[tokio::test]
async fn hung_request_times_out_and_clears_loading() {
    let limit = Duration::from_millis(20);
    let mut controller =
        UserController::new(Arc::new(HangingService)).with_request_timeout(Some(limit));

    let err = controller.load().await.expect_err("should time out");

    assert_eq!(err, ControllerError::Fetch(ServiceError::Timeout(limit)));
    assert!(err.service_error().is_some_and(ServiceError::is_timeout));
    assert!(!controller.state().loading);
}

#[tokio::test]
async fn hung_create_times_out_and_keeps_form() {
    let limit = Duration::from_millis(20);
    let mut controller =
        UserController::new(Arc::new(HangingService)).with_request_timeout(Some(limit));
    controller.state.records = seed();
    controller.set_name("Ana");
    controller.set_email("ana@email.com");

    let err = controller.submit().await.expect_err("should time out");

    assert_eq!(err, ControllerError::Create(ServiceError::Timeout(limit)));
    assert!(!controller.state().loading);
    assert_eq!(controller.state().form, UserDraft::new("Ana", "ana@email.com"));
    assert_eq!(controller.state().records, seed());
    assert_eq!(controller.phase(), ControllerPhase::Creating);
}

#[tokio::test]
async fn hung_update_times_out_and_stays_in_edit_mode() {
    let limit = Duration::from_millis(20);
    let mut controller =
        UserController::new(Arc::new(HangingService)).with_request_timeout(Some(limit));
    controller.state.records = seed();
    assert!(controller.begin_edit(UserId(2)));
    controller.set_name("Maria S.");

    let err = controller.submit().await.expect_err("should time out");

    assert_eq!(
        err,
        ControllerError::Update {
            id: UserId(2),
            source: ServiceError::Timeout(limit),
        }
    );
    assert!(!controller.state().loading);
    assert_eq!(controller.state().records, seed());
    assert_eq!(controller.phase(), ControllerPhase::Editing(UserId(2)));
}

#[tokio::test]
async fn create_response_after_teardown_is_discarded() {
    let gate = Arc::new(Notify::new());
    let mut controller = UserController::new(Arc::new(GatedService {
        gate: Arc::clone(&gate),
        records: seed(),
    }));
    controller.state.records = seed();
    controller.set_name("Ana");
    controller.set_email("ana@email.com");
    let handle = controller.teardown_handle();
    let mut rx = controller.subscribe();

    let (result, ()) = tokio::join!(controller.submit(), async {
        rx.changed().await.expect("loading published");
        assert!(rx.borrow_and_update().loading);
        handle.tear_down();
        gate.notify_one();
    });

    assert_eq!(result, Err(ControllerError::TornDown));
    assert_eq!(controller.state().records, seed());
    assert_eq!(controller.state().form, UserDraft::new("Ana", "ana@email.com"));
    assert!(!rx.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn response_after_teardown_is_discarded() {
    let gate = Arc::new(Notify::new());
    let mut controller = UserController::new(Arc::new(GatedService {
        gate: Arc::clone(&gate),
        records: seed(),
    }));
    let handle = controller.teardown_handle();
    let mut rx = controller.subscribe();

    let (result, ()) = tokio::join!(controller.load(), async {
        rx.changed().await.expect("loading published");
        handle.tear_down();
        gate.notify_one();
    });

    assert_eq!(result, Err(ControllerError::TornDown));
    assert!(controller.state().records.is_empty());
    assert!(!rx.has_changed().expect("sender alive"));

    controller.set_name("ignored");
    assert!(controller.state().form.is_blank());
    assert_eq!(controller.submit().await, Err(ControllerError::TornDown));
}

#[tokio::test]
async fn static_seed_backend_ignores_prior_writes() {
    let mut controller =
        UserController::new(Arc::new(MockUserService::new(BackendMode::StaticSeed, Duration::ZERO)));
    controller.load().await.expect("load");

    controller.set_name("Ana");
    controller.set_email("ana@email.com");
    controller.submit().await.expect("create");
    assert_eq!(controller.state().records.len(), 3);

    controller.load().await.expect("reload");
    assert_eq!(controller.state().records, seed());
}
