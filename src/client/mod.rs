//! HTTP gateway to the borrow-management backend
//!
//! `Backend` owns the connection, base URL, and session; per-resource clients
//! sit on top of it and normalize the hypermedia payloads into `models`
//! entities. The desk layer consumes everything through the
//! `CirculationGateway` trait so screens stay testable without a server.

pub mod book_items;
pub mod borrow_records;
pub mod library_cards;
pub mod wire;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    BookItem, BookReturn, BorrowDetail, BorrowRecord, LibraryCard, NewBorrowRequest, RecordUpdate,
    ViolationType, UNKNOWN,
};
use crate::session::Session;

pub use book_items::BookItemsClient;
pub use borrow_records::BorrowRecordsClient;
pub use library_cards::LibraryCardsClient;

// ---------------------------------------------------------------------------
// CirculationGateway
// ---------------------------------------------------------------------------

/// Backend operations the desk screens dispatch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CirculationGateway: Send + Sync {
    async fn list_records(&self) -> AppResult<Vec<BorrowRecord>>;
    async fn record_by_id(&self, id: i64) -> AppResult<BorrowRecord>;
    async fn record_by_code(&self, code: &str) -> AppResult<BorrowRecord>;
    async fn record_by_barcode(&self, barcode: &str) -> AppResult<BorrowRecord>;
    async fn record_details(&self, record_id: i64) -> AppResult<Vec<BorrowDetail>>;
    async fn violation_types(&self) -> AppResult<Vec<ViolationType>>;
    async fn update_record(&self, update: &RecordUpdate) -> AppResult<()>;
    async fn return_book(&self, entry: &BookReturn) -> AppResult<()>;
    async fn create_record(&self, request: &NewBorrowRequest) -> AppResult<BorrowRecord>;
    async fn list_cards(&self) -> AppResult<Vec<LibraryCard>>;
    async fn item_by_barcode(&self, barcode: &str) -> AppResult<BookItem>;
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Shared HTTP plumbing: authorization, error mapping, JSON decoding.
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    session: Arc<Session>,
}

impl Backend {
    pub fn new(config: &BackendConfig, session: Arc<Session>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            session,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Absolute URL for a backend path such as `/borrow-records?page=0`.
    /// Link-relation targets are followed as-is, never rebuilt from ids.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> AppResult<RequestBuilder> {
        Ok(request.header(header::AUTHORIZATION, self.session.bearer().await?))
    }

    /// GET that yields `Ok(None)` on a backend 404, the HTTP analog of a
    /// `fetch_optional`. Callers attach their own not-found message.
    pub async fn get_json_opt<T: DeserializeOwned>(&self, url: &str) -> AppResult<Option<T>> {
        let request = self.authorized(self.http.get(url)).await?;
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = self.check(response).await?;
        Ok(Some(Self::decode(response).await?))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AppResult<T> {
        self.get_json_opt(url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Backend has no resource at {}", url)))
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> AppResult<()> {
        let request = self
            .authorized(self.http.put(url))
            .await?
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(body);
        let response = request.send().await?;
        self.check(response).await?;
        Ok(())
    }

    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorized(self.http.post(url))
            .await?
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(body);
        let response = request.send().await?;
        let response = self.check(response).await?;
        Self::decode(response).await
    }

    /// Map non-success statuses onto the error taxonomy. A 401/403
    /// invalidates the session so the desk prompts for a fresh token.
    async fn check(&self, response: Response) -> AppResult<Response> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.session.invalidate().await;
            return Err(AppError::Authentication(
                "backend rejected the session token".to_string(),
            ));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound("resource not found".to_string()));
        }
        if !status.is_success() {
            let message = Self::failure_message(response).await;
            return Err(AppError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AppResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| AppError::Payload(format!("unexpected response shape: {}", err)))
    }

    /// Best-effort extraction of the backend's own error message.
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) if !body.trim().is_empty() => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
                    for key in ["message", "error"] {
                        if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                            return message.to_string();
                        }
                    }
                }
                body.chars().take(200).collect()
            }
            _ => format!("backend returned {}", status),
        }
    }
}

/// Follow a card's user link for the holder display name. Failures degrade
/// to the Unknown sentinel; only authentication failures propagate, since
/// nothing after them can succeed either.
pub(crate) async fn resolve_holder(backend: &Backend, links: &wire::Links) -> AppResult<String> {
    let Some(link) = links.user.as_ref() else {
        return Ok(UNKNOWN.to_string());
    };
    match backend.get_json_opt::<wire::RawUser>(link.url()).await {
        Ok(Some(user)) => Ok(user.display_name()),
        Ok(None) => Ok(UNKNOWN.to_string()),
        Err(err @ AppError::Authentication(_)) => Err(err),
        Err(err) => {
            tracing::warn!(error = %err, "holder lookup failed, using sentinel");
            Ok(UNKNOWN.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Concrete gateway bundling the per-resource clients over one `Backend`.
#[derive(Clone)]
pub struct Gateway {
    pub borrow_records: BorrowRecordsClient,
    pub library_cards: LibraryCardsClient,
    pub book_items: BookItemsClient,
}

impl Gateway {
    pub fn new(config: &BackendConfig, session: Arc<Session>) -> AppResult<Self> {
        let backend = Backend::new(config, session)?;
        Ok(Self {
            borrow_records: BorrowRecordsClient::new(backend.clone()),
            library_cards: LibraryCardsClient::new(backend.clone()),
            book_items: BookItemsClient::new(backend),
        })
    }
}

#[async_trait]
impl CirculationGateway for Gateway {
    async fn list_records(&self) -> AppResult<Vec<BorrowRecord>> {
        self.borrow_records.list_all().await
    }

    async fn record_by_id(&self, id: i64) -> AppResult<BorrowRecord> {
        self.borrow_records.by_id(id).await
    }

    async fn record_by_code(&self, code: &str) -> AppResult<BorrowRecord> {
        self.borrow_records.by_code(code).await
    }

    async fn record_by_barcode(&self, barcode: &str) -> AppResult<BorrowRecord> {
        self.borrow_records.by_barcode(barcode).await
    }

    async fn record_details(&self, record_id: i64) -> AppResult<Vec<BorrowDetail>> {
        self.borrow_records.details(record_id).await
    }

    async fn violation_types(&self) -> AppResult<Vec<ViolationType>> {
        self.borrow_records.violation_types().await
    }

    async fn update_record(&self, update: &RecordUpdate) -> AppResult<()> {
        self.borrow_records.update(update).await
    }

    async fn return_book(&self, entry: &BookReturn) -> AppResult<()> {
        self.borrow_records.return_book(entry).await
    }

    async fn create_record(&self, request: &NewBorrowRequest) -> AppResult<BorrowRecord> {
        self.borrow_records.create(request).await
    }

    async fn list_cards(&self) -> AppResult<Vec<LibraryCard>> {
        self.library_cards.list_all().await
    }

    async fn item_by_barcode(&self, barcode: &str) -> AppResult<BookItem> {
        self.book_items.by_barcode(barcode).await
    }
}
