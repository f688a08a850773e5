//! Borrow records client: listing crawl, point lookups, mutations

use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    Book, BookItem, BookReturn, BorrowDetail, BorrowRecord, NewBorrowRequest, RecordUpdate,
    ViolationType, UNKNOWN,
};

use super::{resolve_holder, wire, Backend};

#[derive(Clone)]
pub struct BorrowRecordsClient {
    backend: Backend,
}

impl BorrowRecordsClient {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Crawl every page of the listing, newest records first. Records whose
    /// payload cannot be normalized are skipped with a warning; card and
    /// holder resolution failures degrade to sentinels per record instead of
    /// aborting the crawl.
    pub async fn list_all(&self) -> AppResult<Vec<BorrowRecord>> {
        let mut records = Vec::new();
        let mut page = 0u32;
        loop {
            let url = self.backend.endpoint(&format!(
                "/borrow-records?size={}&page={}&sort=idBorrowRecord,desc",
                self.backend.page_size(),
                page
            ));
            let listing: wire::RecordPage = self.backend.get_json(&url).await?;
            let batch = listing
                .embedded
                .map(|e| e.borrow_records)
                .unwrap_or_default();
            for raw in batch {
                let id = raw.id;
                match self.normalize(raw).await {
                    Ok(record) => records.push(record),
                    Err(err @ AppError::Authentication(_)) => return Err(err),
                    Err(err) => {
                        tracing::warn!(record = id, error = %err, "skipping record with unusable payload");
                    }
                }
            }
            page += 1;
            if page >= listing.page.total_pages {
                break;
            }
        }
        tracing::debug!(count = records.len(), "borrow record listing complete");
        Ok(records)
    }

    pub async fn by_id(&self, id: i64) -> AppResult<BorrowRecord> {
        let url = self.backend.endpoint(&format!("/borrow-records/{}", id));
        let raw = self
            .backend
            .get_json_opt::<wire::RawBorrowRecord>(&url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No borrow record with id {}", id)))?;
        self.normalize(raw).await
    }

    pub async fn by_code(&self, code: &str) -> AppResult<BorrowRecord> {
        let url = self.backend.endpoint(&format!(
            "/borrow-records/search/findByRecordId?recordId={}",
            code
        ));
        let raw = self
            .backend
            .get_json_opt::<wire::RawBorrowRecord>(&url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No borrow record with code {}", code)))?;
        self.normalize(raw).await
    }

    /// Lookup through one of the record's copies, for when a staff member
    /// scans a book instead of typing the record code.
    pub async fn by_barcode(&self, barcode: &str) -> AppResult<BorrowRecord> {
        let url = self.backend.endpoint(&format!(
            "/borrow-records/search/findByBarcode?barcode={}",
            barcode
        ));
        let raw = self
            .backend
            .get_json_opt::<wire::RawBorrowRecord>(&url)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No borrow record holds barcode {}", barcode))
            })?;
        self.normalize(raw).await
    }

    /// Line items of a record, each with its book item, book, and violation
    /// resolved. Each failed resolution degrades that one detail to
    /// placeholders rather than failing the batch.
    pub async fn details(&self, record_id: i64) -> AppResult<Vec<BorrowDetail>> {
        let url = self
            .backend
            .endpoint(&format!("/borrow-records/{}/borrowRecordDetails", record_id));
        let listing: wire::DetailsEnvelope = self.backend.get_json(&url).await?;
        let batch = listing
            .embedded
            .map(|e| e.borrow_record_details)
            .unwrap_or_default();
        let mut details = Vec::with_capacity(batch.len());
        for raw in batch {
            details.push(self.normalize_detail(raw).await?);
        }
        Ok(details)
    }

    pub async fn violation_types(&self) -> AppResult<Vec<ViolationType>> {
        let url = self.backend.endpoint("/library-violation-types");
        let listing: wire::ViolationTypesEnvelope = self.backend.get_json(&url).await?;
        Ok(listing
            .embedded
            .map(|e| e.violation_types)
            .unwrap_or_default()
            .into_iter()
            .map(wire::RawViolationType::into_violation)
            .collect())
    }

    pub async fn update(&self, update: &RecordUpdate) -> AppResult<()> {
        let url = self.backend.endpoint("/borrow-record/update-borrow-record");
        self.backend
            .put_json(&url, &wire::UpdateRecordBody::from(update))
            .await
    }

    pub async fn return_book(&self, entry: &BookReturn) -> AppResult<()> {
        let url = self.backend.endpoint("/borrow-record/return-1-book");
        self.backend
            .put_json(&url, &wire::ReturnBookBody::from(entry))
            .await
    }

    pub async fn create(&self, request: &NewBorrowRequest) -> AppResult<BorrowRecord> {
        request.validate()?;
        let url = self.backend.endpoint("/borrow-record/create-borrow-record");
        let raw: wire::RawBorrowRecord = self
            .backend
            .post_json(&url, &wire::CreateRecordBody::from(request))
            .await?;
        self.normalize(raw).await
    }

    async fn normalize(&self, raw: wire::RawBorrowRecord) -> AppResult<BorrowRecord> {
        let (card_number, holder_name) = self.resolve_card_identity(&raw.links).await?;
        raw.into_record(card_number, holder_name)
    }

    /// Card number and holder name for a record, following the record's
    /// libraryCard link and then the card's user link. Non-auth failures
    /// degrade to the Unknown sentinel so one bad relation never sinks a
    /// whole listing.
    async fn resolve_card_identity(&self, links: &wire::Links) -> AppResult<(String, String)> {
        let Some(link) = links.library_card.as_ref() else {
            return Ok((UNKNOWN.to_string(), UNKNOWN.to_string()));
        };
        let card = match self
            .backend
            .get_json_opt::<wire::RawLibraryCard>(link.url())
            .await
        {
            Ok(Some(card)) => card,
            Ok(None) => return Ok((UNKNOWN.to_string(), UNKNOWN.to_string())),
            Err(err @ AppError::Authentication(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "library card lookup failed, using sentinels");
                return Ok((UNKNOWN.to_string(), UNKNOWN.to_string()));
            }
        };
        let holder = resolve_holder(&self.backend, &card.links).await?;
        Ok((card.card_number, holder))
    }

    async fn normalize_detail(&self, raw: wire::RawBorrowDetail) -> AppResult<BorrowDetail> {
        let book_item = match self.resolve_book_item(&raw.links).await {
            Ok(item) => item,
            Err(err @ AppError::Authentication(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(detail = raw.id, error = %err, "book item lookup failed, using placeholder");
                BookItem::unknown()
            }
        };
        let violation = self.resolve_violation(raw.id, &raw.links).await?;
        Ok(raw.into_detail(book_item, violation))
    }

    async fn resolve_book_item(&self, links: &wire::Links) -> AppResult<BookItem> {
        let link = links
            .book_item
            .as_ref()
            .ok_or_else(|| AppError::Payload("detail has no bookItem link".to_string()))?;
        let raw = self.backend.get_json::<wire::RawBookItem>(link.url()).await?;
        let book = match self.resolve_book(&raw.links).await {
            Ok(book) => book,
            Err(err @ AppError::Authentication(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(error = %err, "book lookup failed, using placeholder");
                Book::unknown()
            }
        };
        raw.into_item(book)
    }

    async fn resolve_book(&self, links: &wire::Links) -> AppResult<Book> {
        let link = links
            .book
            .as_ref()
            .ok_or_else(|| AppError::Payload("book item has no book link".to_string()))?;
        let raw = self.backend.get_json::<wire::RawBook>(link.url()).await?;
        Ok(raw.into_book())
    }

    /// A 404 on the violation relation means none is attached yet, the
    /// normal shape for an unreturned detail.
    async fn resolve_violation(
        &self,
        detail_id: i64,
        links: &wire::Links,
    ) -> AppResult<Option<ViolationType>> {
        let Some(link) = links.violation_type.as_ref() else {
            return Ok(None);
        };
        match self
            .backend
            .get_json_opt::<wire::RawViolationType>(link.url())
            .await
        {
            Ok(Some(raw)) => Ok(Some(raw.into_violation())),
            Ok(None) => Ok(None),
            Err(err @ AppError::Authentication(_)) => Err(err),
            Err(err) => {
                tracing::warn!(detail = detail_id, error = %err, "violation lookup failed, omitting it");
                Ok(None)
            }
        }
    }
}
