//! Record search screen: point lookup plus hand-out and return actions

use std::sync::Arc;

use crate::client::CirculationGateway;
use crate::error::{AppError, AppResult};
use crate::models::{BorrowDetail, BorrowRecord, BorrowStatus, RecordUpdate, ViolationType};
use crate::workflow;

use super::{build_return, ensure_lookup_input, ReturnEntry};

/// Which desk the screen serves. Return mode adds the barcode fallback on
/// lookup and the per-detail return controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Borrow,
    Return,
}

/// Screen state. Every new search replaces the whole value, so no detail
/// rows from a previous record survive.
#[derive(Debug, Default)]
pub enum SearchState {
    #[default]
    Idle,
    NotFound { query: String },
    Loaded(Box<LoadedRecord>),
}

#[derive(Debug)]
pub struct LoadedRecord {
    pub record: BorrowRecord,
    pub details: Vec<BorrowDetail>,
    pub violation_types: Vec<ViolationType>,
}

pub struct RecordSearch {
    gateway: Arc<dyn CirculationGateway>,
    mode: SearchMode,
    state: SearchState,
}

impl RecordSearch {
    pub fn new(gateway: Arc<dyn CirculationGateway>, mode: SearchMode) -> Self {
        Self {
            gateway,
            mode,
            state: SearchState::Idle,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Look up a record by its code; in Return mode an input that misses as
    /// a code is retried as a copy barcode. A miss on every path ends in the
    /// NotFound state, not an error.
    pub async fn search(&mut self, input: &str) -> AppResult<()> {
        let query = ensure_lookup_input(input)?.to_string();
        // Discard the previous record before anything can fail.
        self.state = SearchState::Idle;

        let record = match self.gateway.record_by_code(&query).await {
            Ok(record) => Some(record),
            Err(AppError::NotFound(_)) if self.mode == SearchMode::Return => {
                match self.gateway.record_by_barcode(&query).await {
                    Ok(record) => Some(record),
                    Err(AppError::NotFound(_)) => None,
                    Err(err) => return Err(err),
                }
            }
            Err(AppError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };

        let Some(record) = record else {
            self.state = SearchState::NotFound { query };
            return Ok(());
        };

        let details = self.gateway.record_details(record.id).await?;
        let violation_types = if self.mode == SearchMode::Return {
            self.gateway.violation_types().await?
        } else {
            Vec::new()
        };
        self.state = SearchState::Loaded(Box::new(LoadedRecord {
            record,
            details,
            violation_types,
        }));
        Ok(())
    }

    /// Borrow-desk action: hand the copies out, moving the record from
    /// Approved to Borrowing.
    pub async fn hand_out(&mut self) -> AppResult<()> {
        if self.mode != SearchMode::Borrow {
            return Err(AppError::Validation(
                "Hand-out belongs to the borrow desk".to_string(),
            ));
        }
        let loaded = self.loaded()?;
        workflow::ensure_transition(loaded.record.status, BorrowStatus::Borrowing, &loaded.details)?;
        let update = RecordUpdate {
            record_id: loaded.record.id,
            status: BorrowStatus::Borrowing,
            notes: loaded.record.notes.clone(),
            violation_code: None,
        };
        self.gateway.update_record(&update).await?;
        self.reload().await
    }

    /// Return-desk action: mark one detail line returned (or out again).
    pub async fn return_detail(&mut self, detail_id: i64, entry: ReturnEntry) -> AppResult<()> {
        if self.mode != SearchMode::Return {
            return Err(AppError::Validation(
                "Returns belong to the return desk".to_string(),
            ));
        }
        let loaded = self.loaded()?;
        let payload = build_return(&loaded.details, &loaded.violation_types, detail_id, entry)?;
        self.gateway.return_book(&payload).await?;
        self.reload().await
    }

    /// Whether the complete-return shortcut is currently offered.
    pub fn can_complete_return(&self) -> bool {
        matches!(
            &self.state,
            SearchState::Loaded(loaded)
                if loaded.record.status == BorrowStatus::Borrowing
                    && workflow::record_stats(&loaded.details).all_returned
        )
    }

    /// Guarded shortcut: close the whole record once every line is back.
    pub async fn complete_return(&mut self, violation_code: Option<String>) -> AppResult<()> {
        if self.mode != SearchMode::Return {
            return Err(AppError::Validation(
                "Returns belong to the return desk".to_string(),
            ));
        }
        let loaded = self.loaded()?;
        workflow::ensure_transition(loaded.record.status, BorrowStatus::Returned, &loaded.details)?;
        if let Some(code) = violation_code.as_deref() {
            if !loaded.violation_types.iter().any(|v| v.code == code) {
                return Err(AppError::Validation(format!(
                    "Unknown violation code {:?}",
                    code
                )));
            }
        }
        let update = RecordUpdate {
            record_id: loaded.record.id,
            status: BorrowStatus::Returned,
            notes: loaded.record.notes.clone(),
            violation_code,
        };
        self.gateway.update_record(&update).await?;
        self.reload().await
    }

    fn loaded(&self) -> AppResult<&LoadedRecord> {
        match &self.state {
            SearchState::Loaded(loaded) => Ok(loaded),
            _ => Err(AppError::Validation(
                "No record loaded; search first".to_string(),
            )),
        }
    }

    /// Refetch the loaded record and its details after a mutation.
    async fn reload(&mut self) -> AppResult<()> {
        let SearchState::Loaded(loaded) = &self.state else {
            return Ok(());
        };
        let id = loaded.record.id;
        let record = self.gateway.record_by_id(id).await?;
        let details = self.gateway.record_details(id).await?;
        if let SearchState::Loaded(loaded) = &mut self.state {
            loaded.record = record;
            loaded.details = details;
        }
        Ok(())
    }
}
