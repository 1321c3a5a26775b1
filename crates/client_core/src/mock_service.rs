use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{UserDraft, UserId, UserRecord},
    error::ServiceError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    config::{BackendMode, ClientSettings},
    UserService,
};

pub fn seed_users() -> Vec<UserRecord> {
    vec![
        UserRecord::new(UserId(1), "João Silva", "joao@email.com"),
        UserRecord::new(UserId(2), "Maria Santos", "maria@email.com"),
    ]
}

/// Wall-clock millisecond ids that never repeat or go backwards within a process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> UserId {
        self.next_after(Utc::now().timestamp_millis())
    }

    fn next_after(&self, now_millis: i64) -> UserId {
        let bump = |prev: i64| now_millis.max(prev + 1);
        let prev = match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| Some(bump(prev)))
        {
            Ok(prev) | Err(prev) => prev,
        };
        UserId(bump(prev))
    }
}

/// In-memory stand-in for a user backend with a fixed artificial latency.
pub struct MockUserService {
    mode: BackendMode,
    latency: Duration,
    users: RwLock<Vec<UserRecord>>,
    ids: IdGenerator,
}

impl MockUserService {
    pub fn new(mode: BackendMode, latency: Duration) -> Self {
        Self {
            mode,
            latency,
            users: RwLock::new(seed_users()),
            ids: IdGenerator::new(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        info!(
            mode = %settings.backend_mode,
            latency_ms = settings.latency_ms,
            "mock: user service ready"
        );
        Self::new(settings.backend_mode, settings.latency())
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl UserService for MockUserService {
    async fn fetch_all(&self) -> Result<Vec<UserRecord>, ServiceError> {
        self.simulate_latency().await;
        match self.mode {
            BackendMode::StaticSeed => Ok(seed_users()),
            BackendMode::Shared => Ok(self.users.read().await.clone()),
        }
    }

    async fn create(&self, draft: UserDraft) -> Result<UserRecord, ServiceError> {
        self.simulate_latency().await;
        let record = draft.into_record(self.ids.next_id());
        if self.mode == BackendMode::Shared {
            self.users.write().await.push(record.clone());
        }
        debug!(user_id = record.id.0, "mock: user created");
        Ok(record)
    }

    async fn update(&self, id: UserId, draft: UserDraft) -> Result<UserDraft, ServiceError> {
        self.simulate_latency().await;
        if self.mode == BackendMode::Shared {
            let mut users = self.users.write().await;
            let stored = users
                .iter_mut()
                .find(|user| user.id == id)
                .ok_or(ServiceError::NotFound(id))?;
            stored.name = draft.name.clone();
            stored.email = draft.email.clone();
        }
        debug!(user_id = id.0, "mock: user updated");
        Ok(draft)
    }

    async fn delete(&self, id: UserId) -> Result<bool, ServiceError> {
        self.simulate_latency().await;
        let removed = match self.mode {
            BackendMode::StaticSeed => true,
            BackendMode::Shared => {
                let mut users = self.users.write().await;
                let before = users.len();
                users.retain(|user| user.id != id);
                users.len() != before
            }
        };
        debug!(user_id = id.0, removed, "mock: user delete acknowledged");
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "tests/mock_service_tests.rs"]
mod tests;
