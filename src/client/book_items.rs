//! Book items client, backing barcode scans on the create screen

use crate::error::{AppError, AppResult};
use crate::models::{Book, BookItem};

use super::{wire, Backend};

#[derive(Clone)]
pub struct BookItemsClient {
    backend: Backend,
}

impl BookItemsClient {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub async fn by_barcode(&self, barcode: &str) -> AppResult<BookItem> {
        let url = self.backend.endpoint(&format!(
            "/book-items/search/findByBarcode?barcode={}",
            barcode
        ));
        let raw = self
            .backend
            .get_json_opt::<wire::RawBookItem>(&url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No book item with barcode {}", barcode)))?;
        let book = match self.resolve_book(&raw.links).await {
            Ok(book) => book,
            Err(err @ AppError::Authentication(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(barcode, error = %err, "book lookup failed, using placeholder");
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
}
