//! Library cards client, backing the create screen's card picker

use crate::error::AppResult;
use crate::models::LibraryCard;

use super::{resolve_holder, wire, Backend};

#[derive(Clone)]
pub struct LibraryCardsClient {
    backend: Backend,
}

impl LibraryCardsClient {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Crawl every page of the card listing, resolving each card's holder
    /// name with the same degradation policy the record listing uses.
    pub async fn list_all(&self) -> AppResult<Vec<LibraryCard>> {
        let mut cards = Vec::new();
        let mut page = 0u32;
        loop {
            let url = self.backend.endpoint(&format!(
                "/library-cards?size={}&page={}",
                self.backend.page_size(),
                page
            ));
            let listing: wire::CardPage = self.backend.get_json(&url).await?;
            let batch = listing.embedded.map(|e| e.library_cards).unwrap_or_default();
            for raw in batch {
                let holder = resolve_holder(&self.backend, &raw.links).await?;
                cards.push(raw.into_card(holder));
            }
            page += 1;
            if page >= listing.page.total_pages {
                break;
            }
        }
        Ok(cards)
    }
}
