//! Cursor pagination types.
//!
//! Pages are requested forward only: `limit` items starting strictly after an
//! optional cursor. The cursor of a page always references its last item.

use serde::{Deserialize, Serialize};

use super::product::Product;

/// Opaque cursor referencing a position in the remote collection.
///
/// The value is implementation-specific and must be treated as an opaque
/// token by everything except the catalog adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Cursor positioned at the given product.
    #[must_use]
    pub fn at(product: &Product) -> Self {
        Self(product.id.as_str().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A request for one page of products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of products to return.
    pub limit: usize,
    /// Start strictly after this cursor; `None` starts from the beginning.
    pub after: Option<Cursor>,
    /// Skip any response cache (pull-to-refresh).
    pub fresh: bool,
}

impl PageRequest {
    /// First page of the collection.
    #[must_use]
    pub const fn first(limit: usize) -> Self {
        Self {
            limit,
            after: None,
            fresh: false,
        }
    }

    /// Page following `cursor`.
    #[must_use]
    pub const fn after(limit: usize, cursor: Cursor) -> Self {
        Self {
            limit,
            after: Some(cursor),
            fresh: false,
        }
    }

    /// Mark this request as bypassing caches.
    #[must_use]
    pub const fn fresh(mut self) -> Self {
        self.fresh = true;
        self
    }
}

/// One page of products in remote order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products in this page.
    pub products: Vec<Product>,
    /// Cursor for the last product, `None` when the page is empty.
    pub end_cursor: Option<Cursor>,
}

impl ProductPage {
    /// Build a page, deriving the end cursor from the last product.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let end_cursor = products.last().map(Cursor::at);
        Self {
            products,
            end_cursor,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Where pagination stands.
///
/// Distinguishes "never fetched" from "no further pages", which a bare
/// nullable cursor cannot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CursorState {
    /// No page has been fetched yet.
    #[default]
    NotStarted,
    /// More pages may follow the given cursor.
    HasMore(Cursor),
    /// The last fetch returned fewer items than requested.
    Exhausted,
}

impl CursorState {
    /// State after receiving `page` for a request of `limit` items.
    #[must_use]
    pub fn after_page(page: &ProductPage, limit: usize) -> Self {
        match &page.end_cursor {
            Some(cursor) if page.len() >= limit => Self::HasMore(cursor.clone()),
            _ => Self::Exhausted,
        }
    }

    /// The cursor to continue from, if any.
    #[must_use]
    pub const fn next(&self) -> Option<&Cursor> {
        match self {
            Self::HasMore(cursor) => Some(cursor),
            Self::NotStarted | Self::Exhausted => None,
        }
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::ProductId;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::parse(id).unwrap(),
            name: format!("Product {id}"),
            price: Decimal::ONE,
            image: String::new(),
        }
    }

    #[test]
    fn test_page_end_cursor_is_last_item() {
        let page = ProductPage::new(vec![product("a"), product("b")]);
        assert_eq!(page.end_cursor, Some(Cursor::new("b")));
    }

    #[test]
    fn test_empty_page_has_no_cursor() {
        let page = ProductPage::new(Vec::new());
        assert!(page.end_cursor.is_none());
        assert!(page.is_empty());
    }

    #[test]
    fn test_full_page_has_more() {
        let page = ProductPage::new(vec![product("a"), product("b")]);
        assert_eq!(
            CursorState::after_page(&page, 2),
            CursorState::HasMore(Cursor::new("b"))
        );
    }

    #[test]
    fn test_short_page_is_exhausted() {
        let page = ProductPage::new(vec![product("a")]);
        assert!(CursorState::after_page(&page, 2).is_exhausted());
    }

    #[test]
    fn test_empty_page_is_exhausted() {
        assert!(CursorState::after_page(&ProductPage::default(), 10).is_exhausted());
    }

    #[test]
    fn test_not_started_has_no_next() {
        assert!(CursorState::NotStarted.next().is_none());
        assert!(!CursorState::NotStarted.is_exhausted());
    }

    #[test]
    fn test_request_builders() {
        let req = PageRequest::after(10, Cursor::new("x")).fresh();
        assert_eq!(req.limit, 10);
        assert_eq!(req.after, Some(Cursor::new("x")));
        assert!(req.fresh);
        assert!(!PageRequest::first(5).fresh);
    }
}
