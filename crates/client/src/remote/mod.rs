//! Remote document store access.
//!
//! # Architecture
//!
//! - The catalog and the cart documents live in the same remote document store
//! - The store is the durable mirror; the client-side cart is authoritative
//!   during a session
//! - Product pages are cached in-memory via `moka`; cart documents never are
//!
//! # Seams
//!
//! - [`ProductCatalog`] - paged, ordered reads of the product collection
//! - [`CartDocuments`] - read/overwrite of the per-user cart document
//!
//! [`DocumentStoreClient`] implements both over REST/JSON. The in-memory
//! backends in [`memory`] implement them in-process for tests and demos.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopnow_client::remote::{DocumentStoreClient, ProductCatalog};
//! use shopnow_core::PageRequest;
//!
//! let client = DocumentStoreClient::new(&config.backend)?;
//! let page = client.fetch_page(PageRequest::first(10)).await?;
//! ```

mod cache;
mod conversions;
mod http;
pub mod memory;

pub use http::DocumentStoreClient;
pub use memory::{InMemoryCartDocuments, InMemoryCatalog};

use async_trait::async_trait;
use shopnow_core::{CartDocument, PageRequest, ProductPage, UserId};
use thiserror::Error;

/// Errors that can occur when talking to the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// First part of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A stored document could not be mapped to a domain type.
    #[error("Invalid document {id}: {reason}")]
    InvalidDocument {
        /// Document ID as stored.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The store is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Paged, ordered reads of the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetch up to `request.limit` products in the store's default order,
    /// starting strictly after `request.after` when set.
    async fn fetch_page(&self, request: PageRequest) -> Result<ProductPage, RemoteError>;
}

/// Per-user cart documents, keyed by user ID.
#[async_trait]
pub trait CartDocuments: Send + Sync {
    /// Read the user's cart document. `Ok(None)` means no document exists.
    async fn read_cart(&self, user: &UserId) -> Result<Option<CartDocument>, RemoteError>;

    /// Overwrite the user's cart document with `document`.
    async fn write_cart(&self, user: &UserId, document: &CartDocument) -> Result<(), RemoteError>;
}
