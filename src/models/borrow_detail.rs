//! Borrow record line item: one physical copy at a given quantity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::book_item::BookItem;
use super::violation_type::ViolationType;

/// One line item within a borrow record. Created atomically with its parent,
/// mutated only by the return operation, never deleted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowDetail {
    pub id: i64,
    /// Normally 1 per physical copy; >1 allowed for aggregate tracking.
    /// A detail is returned as a unit, never by partial quantity.
    pub quantity: u32,
    pub is_returned: bool,
    /// Set exactly when `is_returned` becomes true.
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Attached only at return time.
    pub violation: Option<ViolationType>,
    pub book_item: BookItem,
}
