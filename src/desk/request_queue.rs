//! Pending-request queue: approve/reject for records awaiting processing

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::client::CirculationGateway;
use crate::error::{AppError, AppResult};
use crate::models::{BorrowRecord, BorrowStatus, RecordUpdate};
use crate::workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueAction {
    Approve,
    Reject,
}

impl QueueAction {
    fn target(self) -> BorrowStatus {
        match self {
            QueueAction::Approve => BorrowStatus::Approved,
            QueueAction::Reject => BorrowStatus::Cancelled,
        }
    }

    fn note(self) -> &'static str {
        match self {
            QueueAction::Approve => workflow::APPROVE_NOTE,
            QueueAction::Reject => workflow::REJECT_NOTE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QueueAction::Approve => "approve",
            QueueAction::Reject => "reject",
        }
    }
}

/// What a finished queue action reports back to the event loop.
#[derive(Debug)]
pub struct QueueOutcome {
    pub record_id: i64,
    pub action: QueueAction,
    pub result: AppResult<()>,
}

/// Lists records still in Processing and runs approve/reject actions as
/// spawned tasks. A per-row in-flight set refuses a second action on a row
/// whose own request is outstanding while leaving other rows actionable.
/// Tasks live in a `JoinSet` owned by the queue, so anything still running
/// is aborted when the queue refreshes or drops.
pub struct RequestQueue {
    gateway: Arc<dyn CirculationGateway>,
    rows: Vec<BorrowRecord>,
    in_flight: HashSet<i64>,
    tasks: JoinSet<QueueOutcome>,
}

impl RequestQueue {
    pub fn new(gateway: Arc<dyn CirculationGateway>) -> Self {
        Self {
            gateway,
            rows: Vec::new(),
            in_flight: HashSet::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Reload the queue from the backend listing. Outstanding actions are
    /// aborted along with the stale rows they referred to.
    pub async fn refresh(&mut self) -> AppResult<()> {
        if !self.tasks.is_empty() {
            tracing::debug!(count = self.tasks.len(), "aborting outstanding queue actions");
            self.tasks.abort_all();
        }
        self.in_flight.clear();
        let records = self.gateway.list_records().await?;
        self.rows = records
            .into_iter()
            .filter(|r| r.status == BorrowStatus::Processing)
            .collect();
        Ok(())
    }

    pub fn rows(&self) -> &[BorrowRecord] {
        &self.rows
    }

    pub fn is_in_flight(&self, record_id: i64) -> bool {
        self.in_flight.contains(&record_id)
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Dispatch approve or reject for one row as a background task.
    pub fn dispatch(&mut self, record_id: i64, action: QueueAction) -> AppResult<()> {
        let Some(row) = self.rows.iter().find(|r| r.id == record_id) else {
            return Err(AppError::Validation(format!(
                "No pending request {} in the queue",
                record_id
            )));
        };
        if self.in_flight.contains(&record_id) {
            return Err(AppError::Validation(format!(
                "Request {} is still being processed",
                record_id
            )));
        }
        workflow::ensure_transition(row.status, action.target(), &[])?;

        self.in_flight.insert(record_id);
        let gateway = Arc::clone(&self.gateway);
        let update = RecordUpdate {
            record_id,
            status: action.target(),
            notes: Some(action.note().to_string()),
            violation_code: None,
        };
        self.tasks.spawn(async move {
            let result = gateway.update_record(&update).await;
            QueueOutcome {
                record_id,
                action,
                result,
            }
        });
        Ok(())
    }

    /// Await the next finished action. Clears the row's in-flight flag and
    /// drops the row on success; aborted tasks are skipped silently.
    pub async fn next_completion(&mut self) -> Option<QueueOutcome> {
        loop {
            match self.tasks.join_next().await? {
                Ok(outcome) => {
                    self.in_flight.remove(&outcome.record_id);
                    if outcome.result.is_ok() {
                        self.rows.retain(|r| r.id != outcome.record_id);
                    }
                    return Some(outcome);
                }
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => {
                    tracing::error!(error = %join_err, "queue action task failed");
                    continue;
                }
            }
        }
    }
}
