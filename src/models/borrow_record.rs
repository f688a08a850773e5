//! Borrow record model and the status enumeration behind the workflow

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

// ---------------------------------------------------------------------------
// BorrowStatus
// ---------------------------------------------------------------------------

/// Lifecycle states of a borrow record.
///
/// The backend stores Vietnamese display strings as status values; this enum
/// keeps state identity separate from that wire text. `from_wire` is the only
/// place the literals are interpreted, `as_wire` the only place they are
/// produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowStatus {
    Processing,
    Approved,
    Borrowing,
    Returned,
    Cancelled,
}

impl BorrowStatus {
    pub const ALL: [BorrowStatus; 5] = [
        BorrowStatus::Processing,
        BorrowStatus::Approved,
        BorrowStatus::Borrowing,
        BorrowStatus::Returned,
        BorrowStatus::Cancelled,
    ];

    /// Backend wire value for this status.
    pub fn as_wire(&self) -> &'static str {
        match self {
            BorrowStatus::Processing => "Đang xử lý",
            BorrowStatus::Approved => "Đã duyệt",
            BorrowStatus::Borrowing => "Đang mượn",
            BorrowStatus::Returned => "Đã trả",
            BorrowStatus::Cancelled => "Đã hủy",
        }
    }

    /// Parse a backend wire value. Unknown strings yield `None` so callers
    /// decide how to degrade.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Đang xử lý" => Some(BorrowStatus::Processing),
            "Đã duyệt" => Some(BorrowStatus::Approved),
            "Đang mượn" => Some(BorrowStatus::Borrowing),
            "Đã trả" => Some(BorrowStatus::Returned),
            "Đã hủy" => Some(BorrowStatus::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BorrowStatus::Processing => "Processing",
            BorrowStatus::Approved => "Approved",
            BorrowStatus::Borrowing => "Borrowing",
            BorrowStatus::Returned => "Returned",
            BorrowStatus::Cancelled => "Cancelled",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            BorrowStatus::Processing => Tone::Warning,
            BorrowStatus::Approved => Tone::Info,
            BorrowStatus::Borrowing => Tone::Accent,
            BorrowStatus::Returned => Tone::Success,
            BorrowStatus::Cancelled => Tone::Danger,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BorrowStatus::Returned | BorrowStatus::Cancelled)
    }

    /// Legal-transition relation of the lifecycle.
    ///
    /// Processing → Approved | Cancelled; Approved → Borrowing | Cancelled;
    /// Borrowing → Returned; terminal states admit nothing. The all-returned
    /// precondition on Borrowing → Returned is checked separately by
    /// `workflow::ensure_returnable`.
    pub fn can_transition_to(&self, next: BorrowStatus) -> bool {
        matches!(
            (self, next),
            (BorrowStatus::Processing, BorrowStatus::Approved)
                | (BorrowStatus::Processing, BorrowStatus::Cancelled)
                | (BorrowStatus::Approved, BorrowStatus::Borrowing)
                | (BorrowStatus::Approved, BorrowStatus::Cancelled)
                | (BorrowStatus::Borrowing, BorrowStatus::Returned)
        )
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "processing" => Ok(BorrowStatus::Processing),
            "approved" => Ok(BorrowStatus::Approved),
            "borrowing" => Ok(BorrowStatus::Borrowing),
            "returned" => Ok(BorrowStatus::Returned),
            "cancelled" | "canceled" => Ok(BorrowStatus::Cancelled),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

/// Display tone attached to a status; the terminal maps these to colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Warning,
    Info,
    Accent,
    Success,
    Danger,
}

// ---------------------------------------------------------------------------
// BorrowRecord
// ---------------------------------------------------------------------------

/// One loan transaction for one library card, normalized from the backend's
/// hypermedia payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: i64,
    /// Human-facing code, e.g. "BR-20250613-0001". Distinct from `id`.
    pub record_code: String,
    pub status: BorrowStatus,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    /// Present only once every item is returned and the record is closed.
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Accumulated by the backend from per-item violations; read-only here.
    pub fine_amount: Option<Decimal>,
    pub card_number: String,
    pub holder_name: String,
}

impl BorrowRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == BorrowStatus::Borrowing && self.due_date < today
    }
}

// ---------------------------------------------------------------------------
// Mutation payloads
// ---------------------------------------------------------------------------

/// Status/notes change applied to a parent record.
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub record_id: i64,
    pub status: BorrowStatus,
    pub notes: Option<String>,
    /// Violation code; only meaningful, and only sent, on the Returned
    /// transition.
    pub violation_code: Option<String>,
}

/// Return applied to a single detail line.
#[derive(Debug, Clone)]
pub struct BookReturn {
    pub detail_id: i64,
    pub returned: bool,
    pub return_date: NaiveDate,
    pub notes: Option<String>,
    /// Defaults to the no-violation sentinel when absent.
    pub violation_code: Option<String>,
}

/// New borrow record submitted from the create screen.
#[derive(Debug, Clone, Validate)]
pub struct NewBorrowRequest {
    pub card_id: i64,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one barcode is required"))]
    pub barcodes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        for status in BorrowStatus::ALL {
            assert_eq!(BorrowStatus::from_wire(status.as_wire()), Some(status));
        }
        assert_eq!(BorrowStatus::from_wire("whatever"), None);
    }

    #[test]
    fn every_status_has_a_distinct_tone() {
        let tones: std::collections::HashSet<Tone> =
            BorrowStatus::ALL.iter().map(|s| s.tone()).collect();
        assert_eq!(tones.len(), BorrowStatus::ALL.len());
    }

    #[test]
    fn transition_table() {
        use BorrowStatus::*;

        assert!(Processing.can_transition_to(Approved));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Processing.can_transition_to(Borrowing));
        assert!(!Processing.can_transition_to(Returned));

        assert!(Approved.can_transition_to(Borrowing));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Returned));

        assert!(Borrowing.can_transition_to(Returned));
        assert!(!Borrowing.can_transition_to(Cancelled));

        for next in BorrowStatus::ALL {
            assert!(!Returned.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn status_parses_from_operator_input() {
        assert_eq!(
            "borrowing".parse::<BorrowStatus>(),
            Ok(BorrowStatus::Borrowing)
        );
        assert_eq!(
            " Returned ".parse::<BorrowStatus>(),
            Ok(BorrowStatus::Returned)
        );
        assert!("partial".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn overdue_only_while_borrowing() {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let mut record = BorrowRecord {
            id: 1,
            record_code: "BR-20250601-0001".to_string(),
            status: BorrowStatus::Borrowing,
            borrow_date: date("2025-06-01"),
            due_date: date("2025-06-15"),
            return_date: None,
            notes: None,
            fine_amount: None,
            card_number: "LC-001".to_string(),
            holder_name: "Ngô Văn A".to_string(),
        };

        assert!(record.is_overdue(date("2025-06-16")));
        assert!(!record.is_overdue(date("2025-06-15")));

        record.status = BorrowStatus::Returned;
        assert!(!record.is_overdue(date("2025-06-16")));
    }
}
