//! Command routing: decodes requests and dispatches them to the store, the
//! backup manager and the scheduler.
//!
//! Every command yields a [`Reply`]; errors are converted to failure replies
//! here and never cross the boundary in another shape.

use std::sync::Arc;
use std::time::Instant;

use policykeeper_core::{Command, Reply, Request};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::scheduler::{ExpiryScheduler, SchedulerState};
use crate::error::StoreError;
use crate::storage::{BackupManager, RecordStore};

/// Failure of a single command.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scheduler(#[from] anyhow::Error),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of a scheduler lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    /// Whether the command changed anything.
    pub changed: bool,
    pub state: SchedulerState,
}

/// Entry point for collaborator commands.
pub struct CommandRouter {
    store: Arc<RecordStore>,
    backups: BackupManager,
    scheduler: Arc<ExpiryScheduler>,
}

impl CommandRouter {
    #[must_use]
    pub fn new(store: Arc<RecordStore>, scheduler: Arc<ExpiryScheduler>) -> Self {
        let backups = BackupManager::new(Arc::clone(&store));
        Self {
            store,
            backups,
            scheduler,
        }
    }

    /// Decodes one JSON request and dispatches it.
    ///
    /// Undecodable input becomes a failure reply; its `requestId` is echoed
    /// when it can be recovered.
    pub async fn dispatch_json(&self, line: &str) -> Reply {
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return Reply::failure(format!("invalid request: {e}")),
        };
        let request_id = value.get("requestId").and_then(serde_json::Value::as_u64);
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!(error = %e, "rejected undecodable request");
                Reply::failure(format!("invalid request: {e}")).with_request_id(request_id)
            }
        }
    }

    /// Executes one request inside a `command` span that records its
    /// duration and outcome.
    pub async fn dispatch(&self, request: Request) -> Reply {
        let Request {
            request_id,
            command,
        } = request;
        let op = command.op_name();
        let span = info_span!(
            "command",
            op,
            request_id = ?request_id,
            mutation = command.is_mutation(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = self.execute(command).await;

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = start.elapsed().as_millis() as u64;
            let outcome = if result.is_ok() { "ok" } else { "error" };
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            let reply = match result {
                Ok(reply) => {
                    info!(op, duration_ms, outcome, "command complete");
                    reply
                }
                Err(e) => {
                    warn!(op, duration_ms, outcome, error = %e, "command failed");
                    Reply::failure(e.to_string())
                }
            };
            reply.with_request_id(request_id)
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, command: Command) -> Result<Reply, DispatchError> {
        let reply = match command {
            Command::CreateRecord { record } => {
                Reply::ok(&self.on_store(move |store, _| store.create(record)).await?)
            }
            Command::GetAllRecords => Reply::ok(&self.on_store(|store, _| Ok(store.get_all())).await?),
            Command::GetRecord { id } => {
                Reply::ok(&self.on_store(move |store, _| store.get_by_id(&id)).await?)
            }
            Command::UpdateRecord { id, updates } => {
                Reply::ok(&self.on_store(move |store, _| store.update(&id, updates)).await?)
            }
            Command::DeleteRecord { id } => {
                self.on_store(move |store, _| store.delete(&id)).await?;
                Reply::ok_empty()
            }
            Command::Search { query } => {
                Reply::ok(&self.on_store(move |store, _| Ok(store.search(&query))).await?)
            }
            Command::FilterByEndDate { days } => {
                Reply::ok(&self.on_store(move |store, _| Ok(store.filter_by_end_date(days))).await?)
            }
            Command::GetSettings => Reply::ok(&self.on_store(|store, _| Ok(store.settings())).await?),
            Command::UpdateSettings { settings } => {
                Reply::ok(&self.on_store(move |store, _| store.update_settings(settings)).await?)
            }
            Command::Backup => Reply::ok(&self.on_store(|_, backups| backups.backup()).await?),
            Command::Restore { path } => {
                Reply::ok(&self.on_store(move |_, backups| backups.restore(path)).await?)
            }
            Command::ListBackups => {
                Reply::ok(&self.on_store(|_, backups| backups.list_backups()).await?)
            }
            Command::StartScheduler => {
                let changed = self.scheduler.start().await;
                Reply::ok(&self.scheduler_status(changed))
            }
            Command::StopScheduler => {
                let changed = self.scheduler.stop().await;
                Reply::ok(&self.scheduler_status(changed))
            }
            Command::TriggerScanNow => Reply::ok(&self.scheduler.trigger_scan_now().await?),
        };
        Ok(reply)
    }

    /// Runs a store or backup call on the blocking pool; saves fsync while
    /// holding the store lock.
    async fn on_store<T, F>(&self, f: F) -> Result<T, DispatchError>
    where
        T: Send + 'static,
        F: FnOnce(&RecordStore, &BackupManager) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let backups = self.backups.clone();
        let result = tokio::task::spawn_blocking(move || f(&store, &backups)).await?;
        Ok(result?)
    }

    fn scheduler_status(&self, changed: bool) -> SchedulerStatus {
        SchedulerStatus {
            changed,
            state: self.scheduler.state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use policykeeper_core::FixedClock;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use time::macros::date;

    use super::*;
    use crate::service::scheduler::DEFAULT_SCAN_INTERVAL;
    use crate::service::sink::LogSink;

    fn router(dir: &TempDir) -> CommandRouter {
        let store = Arc::new(RecordStore::load(
            dir.path().join("insurances.json"),
            Arc::new(FixedClock::on_date(date!(2026 - 03 - 15))),
        ));
        let scheduler = Arc::new(ExpiryScheduler::new(
            Arc::clone(&store),
            Arc::new(LogSink),
            DEFAULT_SCAN_INTERVAL,
        ));
        CommandRouter::new(store, scheduler)
    }

    async fn call(router: &CommandRouter, request: Value) -> Value {
        let reply = router.dispatch_json(&request.to_string()).await;
        serde_json::to_value(reply).unwrap()
    }

    fn create(end_date: &str) -> Value {
        json!({
            "op": "insurance:create",
            "record": {
                "name": "Fatma",
                "surname": "Çelik",
                "phone": "0505 123 45 67",
                "policyType": "Sağlık",
                "startDate": "2026-01-01",
                "endDate": end_date
            }
        })
    }

    #[tokio::test]
    async fn create_then_get_all() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let created = call(&router, create("2026-03-20")).await;
        assert_eq!(created["success"], true);
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let all = call(&router, json!({ "op": "insurance:getAll" })).await;
        assert_eq!(all["data"][0]["id"], id.as_str());
        assert_eq!(all["data"][0]["endDate"], "2026-03-20");

        let one = call(&router, json!({ "op": "insurance:getById", "id": id })).await;
        assert_eq!(one["data"]["policyType"], "Sağlık");
    }

    #[tokio::test]
    async fn missing_record_is_failure_reply_with_request_id() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let reply = call(
            &router,
            json!({ "requestId": 9, "op": "insurance:delete", "id": "ghost" }),
        )
        .await;

        assert_eq!(
            reply,
            json!({ "requestId": 9, "success": false, "error": "record not found: ghost" })
        );
    }

    #[tokio::test]
    async fn undecodable_input_is_failure_reply() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let garbage = router.dispatch_json("not json").await;
        assert!(!garbage.success);
        assert!(garbage.error.unwrap().starts_with("invalid request"));

        let unknown = call(&router, json!({ "requestId": 3, "op": "report:pdf" })).await;
        assert_eq!(unknown["success"], false);
        assert_eq!(unknown["requestId"], 3);
    }

    #[tokio::test]
    async fn filter_and_search_commands() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        call(&router, create("2026-04-30")).await;
        call(&router, create("2026-03-18")).await;

        let soon = call(&router, json!({ "op": "insurance:filterByEndDate", "days": 7 })).await;
        assert_eq!(soon["data"].as_array().unwrap().len(), 1);

        let none = call(&router, json!({ "op": "insurance:filterByEndDate", "days": -1 })).await;
        assert_eq!(none["data"], json!([]));

        let hits = call(&router, json!({ "op": "insurance:search", "query": "ÇELIK" })).await;
        assert_eq!(hits["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);

        let updated = call(
            &router,
            json!({ "op": "settings:update", "settings": { "notificationDays": [14, 3] } }),
        )
        .await;
        assert_eq!(updated["data"]["notificationDays"], json!([3, 14]));

        let current = call(&router, json!({ "op": "settings:get" })).await;
        assert_eq!(current["data"], updated["data"]);
    }

    #[tokio::test]
    async fn backup_list_and_restore_commands() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        call(&router, create("2026-05-01")).await;

        let backup = call(&router, json!({ "op": "data:backup" })).await;
        let path = backup["data"].as_str().unwrap().to_string();

        let listed = call(&router, json!({ "op": "data:listBackups" })).await;
        assert_eq!(listed["data"], json!([path.clone()]));

        call(&router, create("2026-06-01")).await;
        let restored = call(&router, json!({ "op": "data:restore", "path": path })).await;
        assert_eq!(restored["data"], 1);

        let all = call(&router, json!({ "op": "insurance:getAll" })).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_creates_are_all_persisted() {
        let dir = TempDir::new().unwrap();
        let router = Arc::new(router(&dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let router = Arc::clone(&router);
                tokio::spawn(async move { call(&router, create("2026-03-20")).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap()["success"], true);
        }

        let all = call(&router, json!({ "op": "insurance:getAll" })).await;
        assert_eq!(all["data"].as_array().unwrap().len(), 8);
        let reloaded = RecordStore::load(
            dir.path().join("insurances.json"),
            Arc::new(FixedClock::on_date(date!(2026 - 03 - 15))),
        );
        assert_eq!(reloaded.get_all().len(), 8);
    }

    #[tokio::test]
    async fn scheduler_commands() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        call(&router, create("2026-03-16")).await;

        let scan = call(&router, json!({ "op": "scheduler:triggerScanNow" })).await;
        assert_eq!(scan["data"]["events"].as_array().unwrap().len(), 2);
        assert_eq!(scan["data"]["events"][0]["horizonDays"], 7);

        let started = call(&router, json!({ "op": "scheduler:start" })).await;
        assert_eq!(started["data"]["changed"], true);
        let again = call(&router, json!({ "op": "scheduler:start" })).await;
        assert_eq!(again["data"]["changed"], false);

        let stopped = call(&router, json!({ "op": "scheduler:stop" })).await;
        assert_eq!(stopped["data"], json!({ "changed": true, "state": "stopped" }));
    }
}
