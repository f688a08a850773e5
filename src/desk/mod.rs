//! Desk screens: the interactive surface over the workflow
//!
//! Each screen controller holds the state the terminal renders and dispatches
//! operations through the `CirculationGateway` trait. Guard failures surface
//! as `Validation` errors before any request is built; the event loop turns
//! results into notices.

pub mod record_create;
pub mod record_form;
pub mod record_search;
pub mod request_queue;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, AppResult};
use crate::models::{BookReturn, BorrowDetail, ViolationType};
use crate::workflow;

pub use record_create::RecordCreate;
pub use record_form::RecordForm;
pub use record_search::{RecordSearch, SearchMode, SearchState};
pub use request_queue::{QueueAction, QueueOutcome, RequestQueue};

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// Transient operator-facing message, the toast analog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Local guard failures and lookup misses read as warnings; everything
    /// else is an error.
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::Validation(_) | AppError::NotFound(_) => Self::warning(err.to_string()),
            _ => Self::error(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

static LOOKUP_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("lookup pattern"));

/// Record codes and barcodes share one shape: ASCII alphanumerics plus
/// `.`/`_`/`-`, no spaces. Checked before any lookup so raw operator input
/// never reaches a request URL.
pub fn ensure_lookup_input(raw: &str) -> AppResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Enter a record code or barcode".to_string(),
        ));
    }
    if !LOOKUP_INPUT.is_match(trimmed) {
        return Err(AppError::Validation(format!(
            "{:?} does not look like a record code or barcode",
            trimmed
        )));
    }
    Ok(trimmed)
}

/// Fold text for diacritic-insensitive matching, so "nguyen" matches
/// "Nguyễn". NFD strips combining marks; đ/Đ needs its own mapping because
/// it does not decompose.
pub fn search_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Display format used across the desk.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Entry format for typed dates.
pub fn format_date_input(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse an operator-typed date, accepting the entry format first and the
/// display format as a fallback.
pub fn parse_date_input(raw: &str) -> AppResult<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| {
            AppError::Validation(format!(
                "Unreadable date {:?}, expected yyyy-mm-dd",
                trimmed
            ))
        })
}

// ---------------------------------------------------------------------------
// Shared return entry
// ---------------------------------------------------------------------------

/// Operator entry for returning one detail line, shared by the search and
/// form screens.
#[derive(Debug, Clone, Default)]
pub struct ReturnEntry {
    pub returned: bool,
    /// Blank defaults to today while toggling returned on.
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub violation_code: Option<String>,
}

/// Validate a return entry against the loaded record and build the gateway
/// payload. The line must exist and any violation code must come from the
/// catalog.
pub(crate) fn build_return(
    details: &[BorrowDetail],
    violation_types: &[ViolationType],
    detail_id: i64,
    entry: ReturnEntry,
) -> AppResult<BookReturn> {
    if !details.iter().any(|d| d.id == detail_id) {
        return Err(AppError::Validation(format!(
            "No line {} on this record",
            detail_id
        )));
    }
    if let Some(code) = entry.violation_code.as_deref() {
        if !violation_types.iter().any(|v| v.code == code) {
            return Err(AppError::Validation(format!(
                "Unknown violation code {:?}",
                code
            )));
        }
    }
    Ok(BookReturn {
        detail_id,
        returned: entry.returned,
        return_date: workflow::normalize_return_date(entry.return_date),
        notes: entry.notes,
        violation_code: entry.violation_code,
    })
}
