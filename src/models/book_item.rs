//! Physical, barcoded copy of a catalog book

use serde::{Deserialize, Serialize};

use super::book::Book;

// ---------------------------------------------------------------------------
// BookItemStatus
// ---------------------------------------------------------------------------

/// Inventory status of a physical copy. Wire values are the uppercase
/// English tokens the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookItemStatus {
    Available,
    Borrowed,
    Reserved,
    Maintenance,
    Lost,
    Damaged,
}

impl BookItemStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            BookItemStatus::Available => "AVAILABLE",
            BookItemStatus::Borrowed => "BORROWED",
            BookItemStatus::Reserved => "RESERVED",
            BookItemStatus::Maintenance => "MAINTENANCE",
            BookItemStatus::Lost => "LOST",
            BookItemStatus::Damaged => "DAMAGED",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "AVAILABLE" => Some(BookItemStatus::Available),
            "BORROWED" => Some(BookItemStatus::Borrowed),
            "RESERVED" => Some(BookItemStatus::Reserved),
            "MAINTENANCE" => Some(BookItemStatus::Maintenance),
            "LOST" => Some(BookItemStatus::Lost),
            "DAMAGED" => Some(BookItemStatus::Damaged),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

// ---------------------------------------------------------------------------
// BookItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookItem {
    pub id: i64,
    pub barcode: String,
    pub status: BookItemStatus,
    pub location: Option<String>,
    /// Physical condition, ordinal 1 (worst) to 5 (best).
    pub condition: Option<u8>,
    pub book: Book,
}

impl BookItem {
    /// Condition label as the backend's admin screens render it.
    pub fn condition_label(&self) -> &'static str {
        match self.condition {
            Some(1) => "Rất tệ",
            Some(2) => "Tệ",
            Some(3) => "Bình thường",
            Some(4) => "Tốt",
            Some(5) => "Rất tốt",
            _ => "Không rõ",
        }
    }

    /// Placeholder used when a detail's item hyperlink cannot be resolved.
    pub fn unknown() -> Self {
        Self {
            id: 0,
            barcode: super::UNKNOWN.to_string(),
            status: BookItemStatus::Maintenance,
            location: None,
            condition: None,
            book: Book::unknown(),
        }
    }
}
