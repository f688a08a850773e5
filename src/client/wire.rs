//! Wire types for the backend's hypermedia payloads
//!
//! The backend exposes Spring-Data-REST style resources: embedded collections
//! under a named key, a `page` metadata block, and `_links` entries the client
//! follows instead of constructing URLs. Every raw shape is normalized here,
//! one mapping per resource, so the rest of the crate only ever sees the flat
//! entities in `models`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::violation_type::NO_VIOLATION;
use crate::models::{
    Book, BookItem, BookItemStatus, BookReturn, BorrowDetail, BorrowRecord, BorrowStatus,
    LibraryCard, NewBorrowRequest, RecordUpdate, ViolationType,
};

// ---------------------------------------------------------------------------
// Hypermedia plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Href {
    pub href: String,
}

impl Href {
    /// Link target with any URI-template suffix (`{?projection}`) stripped.
    pub fn url(&self) -> &str {
        match self.href.find('{') {
            Some(idx) => &self.href[..idx],
            None => &self.href,
        }
    }
}

/// Relation links attached to a resource. Only the relations this client
/// follows are modelled; everything else in `_links` is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub self_link: Option<Href>,
    #[serde(rename = "libraryCard")]
    pub library_card: Option<Href>,
    pub user: Option<Href>,
    #[serde(rename = "bookItem")]
    pub book_item: Option<Href>,
    pub book: Option<Href>,
    #[serde(rename = "libraryViolationType")]
    pub violation_type: Option<Href>,
    #[serde(rename = "borrowRecordDetails")]
    pub borrow_record_details: Option<Href>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
}

// ---------------------------------------------------------------------------
// Listing envelopes
// ---------------------------------------------------------------------------

/// One page of the borrow-record listing. The backend omits `_embedded`
/// entirely when a page is empty.
#[derive(Debug, Deserialize)]
pub struct RecordPage {
    #[serde(rename = "_embedded")]
    pub embedded: Option<RecordsEmbedded>,
    pub page: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct RecordsEmbedded {
    #[serde(rename = "borrowRecords", default)]
    pub borrow_records: Vec<RawBorrowRecord>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsEnvelope {
    #[serde(rename = "_embedded")]
    pub embedded: Option<DetailsEmbedded>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsEmbedded {
    #[serde(rename = "borrowRecordDetails", default)]
    pub borrow_record_details: Vec<RawBorrowDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ViolationTypesEnvelope {
    #[serde(rename = "_embedded")]
    pub embedded: Option<ViolationTypesEmbedded>,
}

#[derive(Debug, Deserialize)]
pub struct ViolationTypesEmbedded {
    #[serde(rename = "libraryViolationTypes", default)]
    pub violation_types: Vec<RawViolationType>,
}

#[derive(Debug, Deserialize)]
pub struct CardPage {
    #[serde(rename = "_embedded")]
    pub embedded: Option<CardsEmbedded>,
    pub page: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct CardsEmbedded {
    #[serde(rename = "libraryCards", default)]
    pub library_cards: Vec<RawLibraryCard>,
}

// ---------------------------------------------------------------------------
// Raw resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawBorrowRecord {
    #[serde(rename = "idBorrowRecord")]
    pub id: i64,
    #[serde(rename = "recordId")]
    pub record_code: String,
    pub status: String,
    #[serde(rename = "borrowDate")]
    pub borrow_date: NaiveDate,
    #[serde(rename = "dueDate")]
    pub due_date: NaiveDate,
    #[serde(rename = "returnDate")]
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(rename = "fineAmount")]
    pub fine_amount: Option<Decimal>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl RawBorrowRecord {
    /// Flatten into the domain record, attaching the card identity the
    /// caller resolved by following `_links.libraryCard`.
    pub fn into_record(
        self,
        card_number: String,
        holder_name: String,
    ) -> AppResult<BorrowRecord> {
        let status = BorrowStatus::from_wire(&self.status).ok_or_else(|| {
            AppError::Payload(format!(
                "borrow record {} carries unknown status {:?}",
                self.id, self.status
            ))
        })?;
        Ok(BorrowRecord {
            id: self.id,
            record_code: self.record_code,
            status,
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            return_date: self.return_date,
            notes: self.notes,
            fine_amount: self.fine_amount,
            card_number,
            holder_name,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBorrowDetail {
    #[serde(rename = "idBorrowRecordDetail")]
    pub id: i64,
    pub quantity: u32,
    #[serde(rename = "isReturned")]
    pub is_returned: bool,
    #[serde(rename = "returnDate")]
    pub return_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl RawBorrowDetail {
    pub fn into_detail(
        self,
        book_item: BookItem,
        violation: Option<ViolationType>,
    ) -> BorrowDetail {
        BorrowDetail {
            id: self.id,
            quantity: self.quantity,
            is_returned: self.is_returned,
            return_date: self.return_date,
            notes: self.notes,
            violation,
            book_item,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBookItem {
    #[serde(rename = "idBookItem")]
    pub id: i64,
    pub barcode: String,
    pub status: String,
    pub location: Option<String>,
    pub condition: Option<u8>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl RawBookItem {
    pub fn into_item(self, book: Book) -> AppResult<BookItem> {
        let status = BookItemStatus::from_wire(&self.status).ok_or_else(|| {
            AppError::Payload(format!(
                "book item {} carries unknown status {:?}",
                self.id, self.status
            ))
        })?;
        Ok(BookItem {
            id: self.id,
            barcode: self.barcode,
            status,
            location: self.location,
            condition: self.condition,
            book,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBook {
    #[serde(rename = "idBook")]
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl RawBook {
    pub fn into_book(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author.unwrap_or_else(|| crate::models::UNKNOWN.to_string()),
            isbn: self.isbn,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawViolationType {
    #[serde(rename = "idViolationType")]
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub fine: Decimal,
}

impl RawViolationType {
    pub fn into_violation(self) -> ViolationType {
        ViolationType {
            id: self.id,
            code: self.code,
            description: self.description,
            fine: self.fine,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLibraryCard {
    #[serde(rename = "idLibraryCard")]
    pub id: i64,
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    pub activated: bool,
    #[serde(rename = "issuedDate")]
    pub issued_date: Option<NaiveDate>,
    #[serde(rename = "expiryDate")]
    pub expiry_date: Option<NaiveDate>,
    pub status: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl RawLibraryCard {
    pub fn into_card(self, holder_name: String) -> LibraryCard {
        LibraryCard {
            id: self.id,
            card_number: self.card_number,
            activated: self.activated,
            issued_date: self.issued_date,
            expiry_date: self.expiry_date,
            status: self.status,
            holder_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    #[serde(rename = "idUser")]
    pub id: i64,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
}

impl RawUser {
    /// Vietnamese display order: family name first.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.last_name.as_deref().unwrap_or(""),
            self.first_name.as_deref().unwrap_or("")
        );
        let name = name.trim().to_string();
        if name.is_empty() {
            crate::models::UNKNOWN.to_string()
        } else {
            name
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UpdateRecordBody {
    #[serde(rename = "idBorrowRecord")]
    pub id: i64,
    pub status: String,
    pub notes: Option<String>,
    /// Violation code; serialized only on the Returned transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&RecordUpdate> for UpdateRecordBody {
    fn from(update: &RecordUpdate) -> Self {
        let code = if update.status == BorrowStatus::Returned {
            update.violation_code.clone()
        } else {
            None
        };
        Self {
            id: update.record_id,
            status: update.status.as_wire().to_string(),
            notes: update.notes.clone(),
            code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReturnBookBody {
    pub id: i64,
    #[serde(rename = "isReturned")]
    pub is_returned: bool,
    #[serde(rename = "returnDate")]
    pub return_date: NaiveDate,
    pub notes: Option<String>,
    pub code: String,
}

impl From<&BookReturn> for ReturnBookBody {
    fn from(entry: &BookReturn) -> Self {
        Self {
            id: entry.detail_id,
            is_returned: entry.returned,
            return_date: entry.return_date,
            notes: entry.notes.clone(),
            // Absent violation code defaults to the no-violation sentinel.
            code: entry
                .violation_code
                .clone()
                .unwrap_or_else(|| NO_VIOLATION.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRecordBody {
    #[serde(rename = "idLibraryCard")]
    pub card_id: i64,
    #[serde(rename = "borrowDate")]
    pub borrow_date: NaiveDate,
    #[serde(rename = "dueDate")]
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub barcodes: Vec<String>,
}

impl From<&NewBorrowRequest> for CreateRecordBody {
    fn from(request: &NewBorrowRequest) -> Self {
        Self {
            card_id: request.card_id,
            borrow_date: request.borrow_date,
            due_date: request.due_date,
            notes: request.notes.clone(),
            barcodes: request.barcodes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn href_strips_uri_templates() {
        let href = Href {
            href: "http://localhost:8080/api/borrow-records/5{?projection}".to_string(),
        };
        assert_eq!(href.url(), "http://localhost:8080/api/borrow-records/5");

        let plain = Href {
            href: "http://localhost:8080/api/borrow-records/5/libraryCard".to_string(),
        };
        assert_eq!(plain.url(), plain.href);
    }

    #[test]
    fn record_page_parses_hal_shape() {
        let body = serde_json::json!({
            "_embedded": {
                "borrowRecords": [{
                    "idBorrowRecord": 12,
                    "recordId": "BR-20250613-0001",
                    "status": "Đang mượn",
                    "borrowDate": "2025-06-13",
                    "dueDate": "2025-06-27",
                    "returnDate": null,
                    "notes": null,
                    "fineAmount": 15000,
                    "_links": {
                        "self": {"href": "http://h/api/borrow-records/12"},
                        "libraryCard": {"href": "http://h/api/borrow-records/12/libraryCard"}
                    }
                }]
            },
            "page": {"size": 20, "totalElements": 1, "totalPages": 1, "number": 0}
        });
        let page: RecordPage = serde_json::from_value(body).unwrap();
        let records = page.embedded.unwrap().borrow_records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 12);
        assert!(records[0].links.library_card.is_some());
        assert_eq!(page.page.total_pages, 1);
    }

    #[test]
    fn empty_page_omits_embedded() {
        let body = serde_json::json!({
            "page": {"size": 20, "totalElements": 0, "totalPages": 0, "number": 0}
        });
        let page: RecordPage = serde_json::from_value(body).unwrap();
        assert!(page.embedded.is_none());
    }

    #[test]
    fn unknown_status_is_a_payload_error() {
        let raw = RawBorrowRecord {
            id: 3,
            record_code: "BR-20250601-0003".to_string(),
            status: "Thất lạc".to_string(),
            borrow_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            return_date: None,
            notes: None,
            fine_amount: None,
            links: Links::default(),
        };
        assert!(matches!(
            raw.into_record("LC-001".to_string(), "Unknown".to_string()),
            Err(AppError::Payload(_))
        ));
    }

    #[test]
    fn update_body_sends_code_only_when_returned() {
        let update = RecordUpdate {
            record_id: 8,
            status: BorrowStatus::Approved,
            notes: Some("ok".to_string()),
            violation_code: Some("Trễ hạn".to_string()),
        };
        let body = serde_json::to_value(UpdateRecordBody::from(&update)).unwrap();
        assert_eq!(body["status"], "Đã duyệt");
        assert!(body.get("code").is_none());

        let update = RecordUpdate {
            status: BorrowStatus::Returned,
            ..update
        };
        let body = serde_json::to_value(UpdateRecordBody::from(&update)).unwrap();
        assert_eq!(body["status"], "Đã trả");
        assert_eq!(body["code"], "Trễ hạn");
    }

    #[test]
    fn return_body_defaults_the_violation_code() {
        let entry = BookReturn {
            detail_id: 41,
            returned: true,
            return_date: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            notes: None,
            violation_code: None,
        };
        let body = serde_json::to_value(ReturnBookBody::from(&entry)).unwrap();
        assert_eq!(body["code"], NO_VIOLATION);
        assert_eq!(body["isReturned"], true);
        assert_eq!(body["returnDate"], "2025-06-20");
    }

    #[test]
    fn holder_name_uses_family_name_first() {
        let user = RawUser {
            id: 1,
            first_name: Some("An".to_string()),
            last_name: Some("Nguyễn Văn".to_string()),
        };
        assert_eq!(user.display_name(), "Nguyễn Văn An");

        let nameless = RawUser {
            id: 2,
            first_name: None,
            last_name: None,
        };
        assert_eq!(nameless.display_name(), "Unknown");
    }
}
