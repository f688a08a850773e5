//! Record creation screen: card picker plus barcode cart

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use indexmap::IndexMap;

use crate::client::CirculationGateway;
use crate::error::{AppError, AppResult};
use crate::models::{BookItem, BookItemStatus, BorrowRecord, LibraryCard, NewBorrowRequest};
use crate::workflow;

use super::{ensure_lookup_input, search_key};

/// Default loan period offered when the screen opens.
const DEFAULT_LOAN_DAYS: i64 = 14;

/// Originates a new borrow record: pick an activated card, scan copies into
/// the cart, set the dates, submit. Cards are loaded once and filtered in
/// memory for the search-as-you-type picker.
pub struct RecordCreate {
    gateway: Arc<dyn CirculationGateway>,
    cards: Vec<LibraryCard>,
    selected: Option<LibraryCard>,
    cart: IndexMap<String, BookItem>,
    borrow_date: NaiveDate,
    due_date: NaiveDate,
    notes: Option<String>,
}

impl RecordCreate {
    pub fn new(gateway: Arc<dyn CirculationGateway>) -> Self {
        let today = Local::now().date_naive();
        Self {
            gateway,
            cards: Vec::new(),
            selected: None,
            cart: IndexMap::new(),
            borrow_date: today,
            due_date: today + Duration::days(DEFAULT_LOAN_DAYS),
            notes: None,
        }
    }

    pub async fn load_cards(&mut self) -> AppResult<()> {
        self.cards = self.gateway.list_cards().await?;
        Ok(())
    }

    /// Search-as-you-type over card number and holder name, diacritic
    /// insensitive. Only activated cards are offered.
    pub fn search_cards(&self, query: &str) -> Vec<&LibraryCard> {
        let key = search_key(query.trim());
        self.cards
            .iter()
            .filter(|c| c.activated)
            .filter(|c| {
                key.is_empty()
                    || search_key(&c.card_number).contains(&key)
                    || search_key(&c.holder_name).contains(&key)
            })
            .collect()
    }

    pub fn select_card(&mut self, card_id: i64) -> AppResult<()> {
        let card = self
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .ok_or_else(|| AppError::Validation(format!("No card with id {}", card_id)))?;
        if !card.activated {
            return Err(AppError::Validation(format!(
                "Card {} is not activated",
                card.card_number
            )));
        }
        self.selected = Some(card.clone());
        Ok(())
    }

    pub fn selected_card(&self) -> Option<&LibraryCard> {
        self.selected.as_ref()
    }

    pub fn cart(&self) -> &IndexMap<String, BookItem> {
        &self.cart
    }

    pub fn borrow_date(&self) -> NaiveDate {
        self.borrow_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// Scan or type one barcode into the cart. Duplicates and copies that
    /// are not AVAILABLE are refused before anything is added.
    pub async fn add_barcode(&mut self, raw: &str) -> AppResult<&BookItem> {
        let barcode = ensure_lookup_input(raw)?;
        if self.cart.contains_key(barcode) {
            return Err(AppError::Validation(format!(
                "Barcode {} is already in the cart",
                barcode
            )));
        }
        let item = self.gateway.item_by_barcode(barcode).await?;
        if item.status != BookItemStatus::Available {
            return Err(AppError::Validation(format!(
                "Copy {} is {}; only AVAILABLE copies can be borrowed",
                item.barcode, item.status
            )));
        }
        Ok(self.cart.entry(item.barcode.clone()).or_insert(item))
    }

    pub fn remove_barcode(&mut self, barcode: &str) -> AppResult<()> {
        let barcode = barcode.trim();
        if self.cart.shift_remove(barcode).is_none() {
            return Err(AppError::Validation(format!(
                "Barcode {} is not in the cart",
                barcode
            )));
        }
        Ok(())
    }

    pub fn set_borrow_date(&mut self, date: NaiveDate) -> AppResult<()> {
        workflow::ensure_date_order(date, self.due_date)?;
        self.borrow_date = date;
        Ok(())
    }

    pub fn set_due_date(&mut self, date: NaiveDate) -> AppResult<()> {
        workflow::ensure_date_order(self.borrow_date, date)?;
        self.due_date = date;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Submit the staged request. Every local rule is re-checked here;
    /// nothing is sent while any of them fails.
    pub async fn submit(&mut self) -> AppResult<BorrowRecord> {
        let card = self
            .selected
            .as_ref()
            .ok_or_else(|| AppError::Validation("Select a library card first".to_string()))?;
        if self.cart.is_empty() {
            return Err(AppError::Validation(
                "The cart is empty; scan at least one copy".to_string(),
            ));
        }
        workflow::ensure_date_order(self.borrow_date, self.due_date)?;

        let request = NewBorrowRequest {
            card_id: card.id,
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            notes: self.notes.clone(),
            barcodes: self.cart.keys().cloned().collect(),
        };
        let record = self.gateway.create_record(&request).await?;

        // Fresh cart for the next request; the card listing stays cached.
        self.selected = None;
        self.cart.clear();
        self.notes = None;
        let today = Local::now().date_naive();
        self.borrow_date = today;
        self.due_date = today + Duration::days(DEFAULT_LOAN_DAYS);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCirculationGateway;
    use crate::models::{Book, BorrowStatus};

    fn card(id: i64, number: &str, holder: &str, activated: bool) -> LibraryCard {
        LibraryCard {
            id,
            card_number: number.to_string(),
            activated,
            issued_date: None,
            expiry_date: None,
            status: None,
            holder_name: holder.to_string(),
        }
    }

    fn item(barcode: &str, status: BookItemStatus) -> BookItem {
        BookItem {
            id: 1,
            barcode: barcode.to_string(),
            status,
            location: None,
            condition: Some(4),
            book: Book::unknown(),
        }
    }

    fn created_record() -> BorrowRecord {
        BorrowRecord {
            id: 99,
            record_code: "BR-20250825-0099".to_string(),
            status: BorrowStatus::Processing,
            borrow_date: Local::now().date_naive(),
            due_date: Local::now().date_naive() + Duration::days(14),
            return_date: None,
            notes: None,
            fine_amount: None,
            card_number: "LC-010".to_string(),
            holder_name: "Nguyễn Thị G".to_string(),
        }
    }

    #[tokio::test]
    async fn card_search_is_diacritic_insensitive_and_activated_only() {
        let mut gateway = MockCirculationGateway::new();
        gateway.expect_list_cards().returning(|| {
            Ok(vec![
                card(1, "LC-001", "Nguyễn Văn An", true),
                card(2, "LC-002", "Nguyễn Thị Bình", false),
                card(3, "LC-003", "Trần Đức Cường", true),
            ])
        });

        let mut screen = RecordCreate::new(Arc::new(gateway));
        screen.load_cards().await.unwrap();

        let hits = screen.search_cards("nguyen");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        let hits = screen.search_cards("duc cuong");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);

        assert_eq!(screen.search_cards("").len(), 2);
    }

    #[tokio::test]
    async fn deactivated_card_cannot_be_selected() {
        let mut gateway = MockCirculationGateway::new();
        gateway
            .expect_list_cards()
            .returning(|| Ok(vec![card(2, "LC-002", "Nguyễn Thị Bình", false)]));

        let mut screen = RecordCreate::new(Arc::new(gateway));
        screen.load_cards().await.unwrap();
        assert!(matches!(
            screen.select_card(2),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_barcode_leaves_the_cart_unchanged() {
        let mut gateway = MockCirculationGateway::new();
        gateway
            .expect_item_by_barcode()
            .times(1)
            .returning(|code| Ok(item(code, BookItemStatus::Available)));

        let mut screen = RecordCreate::new(Arc::new(gateway));
        screen.add_barcode("BI-000123").await.unwrap();
        assert_eq!(screen.cart().len(), 1);

        // The duplicate is refused before any lookup happens.
        assert!(matches!(
            screen.add_barcode("BI-000123").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(screen.cart().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_copy_is_refused() {
        let mut gateway = MockCirculationGateway::new();
        gateway
            .expect_item_by_barcode()
            .returning(|code| Ok(item(code, BookItemStatus::Borrowed)));

        let mut screen = RecordCreate::new(Arc::new(gateway));
        assert!(matches!(
            screen.add_barcode("BI-000200").await,
            Err(AppError::Validation(_))
        ));
        assert!(screen.cart().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_card_cart_and_date_order() {
        let mut gateway = MockCirculationGateway::new();
        gateway
            .expect_list_cards()
            .returning(|| Ok(vec![card(1, "LC-001", "Nguyễn Văn An", true)]));
        gateway
            .expect_item_by_barcode()
            .returning(|code| Ok(item(code, BookItemStatus::Available)));
        gateway.expect_create_record().times(0);

        let mut screen = RecordCreate::new(Arc::new(gateway));
        screen.load_cards().await.unwrap();

        // No card selected.
        assert!(matches!(
            screen.submit().await,
            Err(AppError::Validation(_))
        ));

        // Card but empty cart.
        screen.select_card(1).unwrap();
        assert!(matches!(
            screen.submit().await,
            Err(AppError::Validation(_))
        ));

        // Due date not after borrow date.
        screen.add_barcode("BI-000123").await.unwrap();
        assert!(screen.set_due_date(screen.borrow_date()).is_err());
    }

    #[tokio::test]
    async fn submit_sends_the_cart_in_scan_order() {
        let mut gateway = MockCirculationGateway::new();
        gateway
            .expect_list_cards()
            .returning(|| Ok(vec![card(1, "LC-001", "Nguyễn Văn An", true)]));
        gateway
            .expect_item_by_barcode()
            .returning(|code| Ok(item(code, BookItemStatus::Available)));
        gateway
            .expect_create_record()
            .withf(|request: &NewBorrowRequest| {
                request.card_id == 1
                    && request.barcodes == vec!["BI-000300", "BI-000100", "BI-000200"]
            })
            .times(1)
            .returning(|_| Ok(created_record()));

        let mut screen = RecordCreate::new(Arc::new(gateway));
        screen.load_cards().await.unwrap();
        screen.select_card(1).unwrap();
        screen.add_barcode("BI-000300").await.unwrap();
        screen.add_barcode("BI-000100").await.unwrap();
        screen.add_barcode("BI-000200").await.unwrap();

        let record = screen.submit().await.unwrap();
        assert_eq!(record.id, 99);

        // Ready for the next request.
        assert!(screen.cart().is_empty());
        assert!(screen.selected_card().is_none());
    }
}
