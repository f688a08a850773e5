//! Catalog book, the title a physical copy instantiates

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

impl Book {
    /// Placeholder used when the book behind an item cannot be resolved.
    pub fn unknown() -> Self {
        Self {
            id: 0,
            title: super::UNKNOWN.to_string(),
            author: super::UNKNOWN.to_string(),
            isbn: None,
        }
    }
}
