//! Borrow-record workflow rules
//!
//! Every transition check, return precondition, and aggregation the desk
//! screens need lives here, so the guard logic exists exactly once. Nothing
//! in this module performs I/O.

use chrono::{Local, NaiveDate};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};
use crate::models::{BorrowDetail, BorrowRecord, BorrowStatus};

/// Fixed note attached when a pending request is approved from the queue.
pub const APPROVE_NOTE: &str = "Yêu cầu mượn sách đã được duyệt";
/// Fixed note attached when a pending request is rejected from the queue.
pub const REJECT_NOTE: &str = "Yêu cầu mượn sách đã bị từ chối";

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Per-record return progress, aggregated over its detail lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStats {
    pub total_books: u32,
    pub returned_books: u32,
    pub remaining_books: u32,
    pub all_returned: bool,
}

/// Pure aggregation over detail lines. Quantities count, not line count:
/// a detail with quantity 3 contributes 3 to the totals.
pub fn record_stats(details: &[BorrowDetail]) -> RecordStats {
    let total_books: u32 = details.iter().map(|d| d.quantity).sum();
    let returned_books: u32 = details
        .iter()
        .filter(|d| d.is_returned)
        .map(|d| d.quantity)
        .sum();
    let remaining_books = total_books - returned_books;
    RecordStats {
        total_books,
        returned_books,
        remaining_books,
        all_returned: remaining_books == 0,
    }
}

/// Records per status, in lifecycle order, for the summary screen. Statuses
/// with no records still appear with a zero count.
pub fn status_breakdown(records: &[BorrowRecord]) -> IndexMap<BorrowStatus, usize> {
    let mut breakdown: IndexMap<BorrowStatus, usize> =
        BorrowStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for record in records {
        *breakdown.entry(record.status).or_insert(0) += 1;
    }
    breakdown
}

/// Total of backend-accumulated fines across the listed records.
pub fn outstanding_fines(records: &[BorrowRecord]) -> Decimal {
    records.iter().filter_map(|r| r.fine_amount).sum()
}

pub fn overdue_count(records: &[BorrowRecord], today: NaiveDate) -> usize {
    records.iter().filter(|r| r.is_overdue(today)).count()
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// The precondition on the terminal Returned transition: every detail line
/// has been returned. Fails with `Validation`, which by contract means no
/// request is sent.
pub fn ensure_returnable(details: &[BorrowDetail]) -> AppResult<()> {
    let stats = record_stats(details);
    if stats.all_returned {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} of {} books still out; every copy must be returned first",
            stats.remaining_books, stats.total_books
        )))
    }
}

/// Check a full status change before it reaches the network: the transition
/// must be in the lifecycle table, and the Returned transition additionally
/// requires the all-returned precondition.
pub fn ensure_transition(
    current: BorrowStatus,
    next: BorrowStatus,
    details: &[BorrowDetail],
) -> AppResult<()> {
    if current == next {
        return Err(AppError::Validation(format!(
            "Record is already {}",
            current
        )));
    }
    if !current.can_transition_to(next) {
        return Err(AppError::Validation(format!(
            "Cannot move a {} record to {}",
            current, next
        )));
    }
    if next == BorrowStatus::Returned {
        ensure_returnable(details)?;
    }
    Ok(())
}

/// Create-screen rule: the due date must fall strictly after the borrow date.
pub fn ensure_date_order(borrow_date: NaiveDate, due_date: NaiveDate) -> AppResult<()> {
    if due_date > borrow_date {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Due date must be after the borrow date".to_string(),
        ))
    }
}

/// Return date entry defaults to today when the operator leaves it blank.
pub fn normalize_return_date(entered: Option<NaiveDate>) -> NaiveDate {
    entered.unwrap_or_else(|| Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookItem, BorrowRecord};

    fn detail(id: i64, quantity: u32, is_returned: bool) -> BorrowDetail {
        BorrowDetail {
            id,
            quantity,
            is_returned,
            return_date: None,
            notes: None,
            violation: None,
            book_item: BookItem::unknown(),
        }
    }

    fn record(id: i64, status: BorrowStatus, fine: Option<&str>) -> BorrowRecord {
        BorrowRecord {
            id,
            record_code: format!("BR-20250601-{:04}", id),
            status,
            borrow_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            return_date: None,
            notes: None,
            fine_amount: fine.map(|f| f.parse().unwrap()),
            card_number: "LC-001".to_string(),
            holder_name: "Phạm Văn C".to_string(),
        }
    }

    #[test]
    fn stats_aggregate_quantities() {
        let details = vec![detail(1, 2, true), detail(2, 1, false), detail(3, 3, true)];
        let stats = record_stats(&details);
        assert_eq!(stats.total_books, 6);
        assert_eq!(stats.returned_books, 5);
        assert_eq!(stats.remaining_books, 1);
        assert!(!stats.all_returned);
    }

    #[test]
    fn stats_on_empty_details() {
        let stats = record_stats(&[]);
        assert_eq!(stats.total_books, 0);
        assert!(stats.all_returned);
    }

    #[test]
    fn returned_guard_blocks_outstanding_items() {
        let details = vec![detail(1, 1, true), detail(2, 1, false)];
        assert!(matches!(
            ensure_returnable(&details),
            Err(AppError::Validation(_))
        ));

        let details = vec![detail(1, 1, true), detail(2, 1, true)];
        assert!(ensure_returnable(&details).is_ok());
    }

    #[test]
    fn transition_respects_table_and_guard() {
        let outstanding = vec![detail(1, 1, false)];
        let done = vec![detail(1, 1, true)];

        assert!(ensure_transition(BorrowStatus::Processing, BorrowStatus::Approved, &[]).is_ok());
        assert!(ensure_transition(BorrowStatus::Borrowing, BorrowStatus::Returned, &done).is_ok());
        assert!(matches!(
            ensure_transition(BorrowStatus::Borrowing, BorrowStatus::Returned, &outstanding),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ensure_transition(BorrowStatus::Processing, BorrowStatus::Returned, &done),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ensure_transition(BorrowStatus::Returned, BorrowStatus::Borrowing, &done),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ensure_transition(BorrowStatus::Approved, BorrowStatus::Approved, &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn date_order_is_strict() {
        let borrow = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(ensure_date_order(borrow, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()).is_ok());
        assert!(ensure_date_order(borrow, borrow).is_err());
        assert!(ensure_date_order(borrow, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()).is_err());
    }

    #[test]
    fn return_date_defaults_to_today() {
        let picked = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(normalize_return_date(Some(picked)), picked);
        assert_eq!(normalize_return_date(None), Local::now().date_naive());
    }

    #[test]
    fn breakdown_keeps_lifecycle_order() {
        let records = vec![
            record(1, BorrowStatus::Borrowing, None),
            record(2, BorrowStatus::Processing, None),
            record(3, BorrowStatus::Borrowing, None),
        ];
        let breakdown = status_breakdown(&records);
        let counts: Vec<(BorrowStatus, usize)> = breakdown.into_iter().collect();
        assert_eq!(
            counts,
            vec![
                (BorrowStatus::Processing, 1),
                (BorrowStatus::Approved, 0),
                (BorrowStatus::Borrowing, 2),
                (BorrowStatus::Returned, 0),
                (BorrowStatus::Cancelled, 0),
            ]
        );
    }

    #[test]
    fn fines_sum_over_present_amounts() {
        let records = vec![
            record(1, BorrowStatus::Returned, Some("15000")),
            record(2, BorrowStatus::Borrowing, None),
            record(3, BorrowStatus::Returned, Some("7500.50")),
        ];
        assert_eq!(
            outstanding_fines(&records),
            "22500.50".parse::<Decimal>().unwrap()
        );
    }
}
