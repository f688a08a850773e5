//! Violation type reference data (fine rules)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Code of the catalog entry meaning "no violation"; the default attached to
/// a return when the operator selects nothing.
pub const NO_VIOLATION: &str = "Không vi phạm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationType {
    pub id: i64,
    /// Unique code, e.g. "Không vi phạm".
    pub code: String,
    pub description: Option<String>,
    pub fine: Decimal,
}

impl ViolationType {
    pub fn is_no_violation(&self) -> bool {
        self.code == NO_VIOLATION
    }
}
