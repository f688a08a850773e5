pub mod book;
pub mod book_item;
pub mod borrow_detail;
pub mod borrow_record;
pub mod library_card;
pub mod violation_type;

/// Sentinel shown wherever a related resource could not be resolved.
pub const UNKNOWN: &str = "Unknown";

pub use book::Book;
pub use book_item::{BookItem, BookItemStatus};
pub use borrow_detail::BorrowDetail;
pub use borrow_record::{
    BookReturn, BorrowRecord, BorrowStatus, NewBorrowRequest, RecordUpdate, Tone,
};
pub use library_card::{LibraryCard, RENEWAL_REQUESTED};
pub use violation_type::{ViolationType, NO_VIOLATION};
