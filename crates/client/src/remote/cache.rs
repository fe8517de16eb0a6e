//! Cache types for product page responses.

use shopnow_core::PageRequest;

/// Cache key for a product page.
///
/// Pages are keyed by where they start and how many items were asked for,
/// so a page size change never serves a page of the wrong length.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PageKey {
    collection: String,
    after: Option<String>,
    limit: usize,
}

impl PageKey {
    pub fn new(collection: &str, request: &PageRequest) -> Self {
        Self {
            collection: collection.to_string(),
            after: request.after.as_ref().map(|c| c.as_str().to_string()),
            limit: request.limit,
        }
    }
}
