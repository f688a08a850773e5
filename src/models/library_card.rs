//! Library card, the membership credential gating borrowing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Free-text card status value meaning the holder asked for a renewal.
pub const RENEWAL_REQUESTED: &str = "Yêu cầu gia hạn";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryCard {
    pub id: i64,
    pub card_number: String,
    /// Only activated cards may originate borrow records.
    pub activated: bool,
    pub issued_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    /// Backend free text, including the renewal-requested sentinel.
    pub status: Option<String>,
    /// Resolved from the card's user hyperlink; "Unknown" when that fails.
    pub holder_name: String,
}

impl LibraryCard {
    pub fn renewal_requested(&self) -> bool {
        self.status.as_deref() == Some(RENEWAL_REQUESTED)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < today)
    }
}
