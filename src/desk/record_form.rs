//! Record form: full read/update view for a single record

use std::sync::Arc;

use crate::client::CirculationGateway;
use crate::error::{AppError, AppResult};
use crate::models::{BorrowDetail, BorrowRecord, BorrowStatus, RecordUpdate, ViolationType};
use crate::workflow;

use super::{build_return, ReturnEntry};

/// Loaded record plus the changes staged against it. `pending_*` fields
/// start from the record's current values and are written back on save.
#[derive(Debug)]
pub struct FormState {
    pub record: BorrowRecord,
    pub details: Vec<BorrowDetail>,
    pub violation_types: Vec<ViolationType>,
    pub pending_status: BorrowStatus,
    pub pending_notes: Option<String>,
    pub pending_violation: Option<String>,
}

pub struct RecordForm {
    gateway: Arc<dyn CirculationGateway>,
    state: Option<FormState>,
}

impl RecordForm {
    pub fn new(gateway: Arc<dyn CirculationGateway>) -> Self {
        Self {
            gateway,
            state: None,
        }
    }

    pub fn state(&self) -> Option<&FormState> {
        self.state.as_ref()
    }

    pub async fn load(&mut self, record_id: i64) -> AppResult<()> {
        let record = self.gateway.record_by_id(record_id).await?;
        let details = self.gateway.record_details(record_id).await?;
        let violation_types = self.gateway.violation_types().await?;
        self.state = Some(FormState {
            pending_status: record.status,
            pending_notes: record.notes.clone(),
            pending_violation: None,
            record,
            details,
            violation_types,
        });
        Ok(())
    }

    /// Stage a status change, validated against the transition table now so
    /// the operator hears about an illegal jump before saving. Re-selecting
    /// the current status clears the staged change.
    pub fn select_status(&mut self, next: BorrowStatus) -> AppResult<()> {
        let state = self.loaded_mut()?;
        if next != state.record.status {
            workflow::ensure_transition(state.record.status, next, &state.details)?;
        }
        state.pending_status = next;
        if next != BorrowStatus::Returned {
            state.pending_violation = None;
        }
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> AppResult<()> {
        self.loaded_mut()?.pending_notes = notes;
        Ok(())
    }

    /// Stage the violation attached on closing. Only meaningful once the
    /// Returned status is selected and the all-returned guard holds.
    pub fn select_violation(&mut self, code: Option<String>) -> AppResult<()> {
        let state = self.loaded_mut()?;
        if state.pending_status != BorrowStatus::Returned {
            return Err(AppError::Validation(
                "A violation only applies when closing as Returned".to_string(),
            ));
        }
        if let Some(code) = code.as_deref() {
            if !state.violation_types.iter().any(|v| v.code == code) {
                return Err(AppError::Validation(format!(
                    "Unknown violation code {:?}",
                    code
                )));
            }
        }
        state.pending_violation = code;
        Ok(())
    }

    /// Persist the staged changes. The transition is re-checked right before
    /// the call; a notes-only save skips the table.
    pub async fn save(&mut self) -> AppResult<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| AppError::Validation("No record loaded".to_string()))?;
        if state.pending_status != state.record.status {
            workflow::ensure_transition(state.record.status, state.pending_status, &state.details)?;
        }
        let update = RecordUpdate {
            record_id: state.record.id,
            status: state.pending_status,
            notes: state.pending_notes.clone(),
            violation_code: state.pending_violation.clone(),
        };
        self.gateway.update_record(&update).await?;
        self.reload().await
    }

    /// Per-detail return sub-operation, mirroring the return desk's control.
    pub async fn return_detail(&mut self, detail_id: i64, entry: ReturnEntry) -> AppResult<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| AppError::Validation("No record loaded".to_string()))?;
        let payload = build_return(&state.details, &state.violation_types, detail_id, entry)?;
        self.gateway.return_book(&payload).await?;
        self.reload().await
    }

    fn loaded_mut(&mut self) -> AppResult<&mut FormState> {
        self.state
            .as_mut()
            .ok_or_else(|| AppError::Validation("No record loaded".to_string()))
    }

    /// Refetch after a mutation, restarting the staged changes from the
    /// record's fresh values.
    async fn reload(&mut self) -> AppResult<()> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        self.load(state.record.id).await
    }
}
