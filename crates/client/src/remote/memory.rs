//! In-process backends for the catalog and cart documents.
//!
//! Both backends keep their data behind a mutex, record every call, and can be
//! told to fail or to answer slowly. Tests use them to exercise the paginator
//! and cart sync without a network; the CLI uses them for `--demo`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shopnow_core::{CartDocument, PageRequest, Product, ProductId, ProductPage, UserId};

use super::{CartDocuments, ProductCatalog, RemoteError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement a failure budget, returning whether this call should fail.
fn take_failure(budget: &Mutex<usize>) -> bool {
    let mut remaining = lock(budget);
    if *remaining > 0 {
        *remaining -= 1;
        true
    } else {
        false
    }
}

// =============================================================================
// InMemoryCatalog
// =============================================================================

/// Product catalog held in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: Mutex<Vec<Product>>,
    requests: Mutex<Vec<PageRequest>>,
    failures: Mutex<usize>,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// Catalog of `count` generated products with IDs `p001`, `p002`, ...
    #[must_use]
    pub fn numbered(count: usize) -> Self {
        Self::new((1..=count).filter_map(numbered_product).collect())
    }

    /// Fail the next `count` fetches.
    pub fn fail_next(&self, count: usize) {
        *lock(&self.failures) = count;
    }

    /// Delay every fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Append a product to the end of the collection.
    pub fn push(&self, product: Product) {
        lock(&self.products).push(product);
    }

    /// Every page request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<PageRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn fetch_page(&self, request: PageRequest) -> Result<ProductPage, RemoteError> {
        lock(&self.requests).push(request.clone());

        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if take_failure(&self.failures) {
            return Err(RemoteError::Unavailable("injected catalog failure".to_string()));
        }

        let products = lock(&self.products);
        let start = match &request.after {
            None => 0,
            // A cursor whose item no longer exists has nothing after it
            Some(cursor) => products
                .iter()
                .position(|p| p.id.as_str() == cursor.as_str())
                .map_or(products.len(), |index| index + 1),
        };

        let page = products
            .iter()
            .skip(start)
            .take(request.limit)
            .cloned()
            .collect();

        Ok(ProductPage::new(page))
    }
}

// =============================================================================
// InMemoryCartDocuments
// =============================================================================

/// Cart documents keyed by user ID.
#[derive(Debug, Default)]
pub struct InMemoryCartDocuments {
    documents: Mutex<HashMap<UserId, CartDocument>>,
    writes: Mutex<Vec<(UserId, CartDocument)>>,
    reads: Mutex<usize>,
    read_failures: Mutex<usize>,
    write_failures: Mutex<usize>,
    read_latency: Mutex<Option<Duration>>,
}

impl InMemoryCartDocuments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `document` for `user` without recording a write.
    #[must_use]
    pub fn with_document(self, user: UserId, document: CartDocument) -> Self {
        lock(&self.documents).insert(user, document);
        self
    }

    /// Fail the next `count` reads.
    pub fn fail_reads(&self, count: usize) {
        *lock(&self.read_failures) = count;
    }

    /// Fail the next `count` writes.
    pub fn fail_writes(&self, count: usize) {
        *lock(&self.write_failures) = count;
    }

    /// Delay every read by `latency`.
    pub fn set_read_latency(&self, latency: Duration) {
        *lock(&self.read_latency) = Some(latency);
    }

    /// The stored document for `user`, if any.
    #[must_use]
    pub fn document(&self, user: &UserId) -> Option<CartDocument> {
        lock(&self.documents).get(user).cloned()
    }

    /// Every successful write, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(UserId, CartDocument)> {
        lock(&self.writes).clone()
    }

    /// Number of reads attempted.
    #[must_use]
    pub fn read_count(&self) -> usize {
        *lock(&self.reads)
    }
}

#[async_trait]
impl CartDocuments for InMemoryCartDocuments {
    async fn read_cart(&self, user: &UserId) -> Result<Option<CartDocument>, RemoteError> {
        *lock(&self.reads) += 1;

        let latency = *lock(&self.read_latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if take_failure(&self.read_failures) {
            return Err(RemoteError::Unavailable("injected read failure".to_string()));
        }

        Ok(lock(&self.documents).get(user).cloned())
    }

    async fn write_cart(&self, user: &UserId, document: &CartDocument) -> Result<(), RemoteError> {
        if take_failure(&self.write_failures) {
            return Err(RemoteError::Unavailable("injected write failure".to_string()));
        }

        lock(&self.documents).insert(user.clone(), document.clone());
        lock(&self.writes).push((user.clone(), document.clone()));
        Ok(())
    }
}

// =============================================================================
// Demo data
// =============================================================================

fn numbered_product(n: usize) -> Option<Product> {
    Some(Product {
        id: ProductId::parse(format!("p{n:03}")).ok()?,
        name: format!("Product {n}"),
        price: Decimal::from(n * 10),
        image: format!("https://cdn.shopnow.test/products/p{n:03}.png"),
    })
}

const DEMO_PRODUCTS: &[(&str, &str, i64)] = &[
    ("rose-serum", "Rose Hydrating Face Serum", 350),
    ("lip-balm", "Shea Lip Balm", 45),
    ("hand-cream", "Argan Hand Cream", 120),
    ("night-mask", "Overnight Repair Sleeping Mask", 410),
    ("toner", "Green Tea Toner", 180),
    ("sunscreen", "Mineral Sunscreen SPF 50", 290),
    ("cleanser", "Gentle Foaming Cleanser", 160),
    ("eye-cream", "Caffeine Eye Cream", 240),
    ("body-oil", "Jasmine Body Oil", 210),
    ("scrub", "Coffee Body Scrub", 95),
    ("shampoo", "Rosemary Strengthening Shampoo", 175),
    ("conditioner", "Coconut Conditioner", 165),
    ("hair-mask", "Keratin Hair Mask", 230),
    ("perfume", "Oud Eau de Parfum", 890),
    ("mist", "Orange Blossom Face Mist", 140),
    ("clay-mask", "Dead Sea Clay Mask", 200),
    ("soap", "Olive Oil Soap", 30),
    ("deodorant", "Natural Deodorant", 85),
    ("nail-oil", "Cuticle Nail Oil", 60),
    ("foot-cream", "Peppermint Foot Cream", 110),
    ("vitamin-c", "Vitamin C Brightening Serum", 380),
    ("retinol", "Retinol Night Cream", 420),
    ("bb-cream", "Tinted BB Cream", 260),
    ("mascara", "Volume Mascara", 150),
    ("kohl", "Black Kohl Liner", 70),
];

/// Catalog seeded with a small cosmetics range for `--demo` runs.
#[must_use]
pub fn demo_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(
        DEMO_PRODUCTS
            .iter()
            .filter_map(|(id, name, price)| {
                Some(Product {
                    id: ProductId::parse(*id).ok()?,
                    name: (*name).to_string(),
                    price: Decimal::from(*price),
                    image: format!("https://cdn.shopnow.test/products/{id}.png"),
                })
            })
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopnow_core::Cursor;

    use super::*;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_catalog_pages_in_order() {
        let catalog = InMemoryCatalog::numbered(25);

        let first = catalog.fetch_page(PageRequest::first(10)).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.end_cursor, Some(Cursor::new("p010")));

        let second = catalog
            .fetch_page(PageRequest::after(10, Cursor::new("p010")))
            .await
            .unwrap();
        assert_eq!(second.products[0].id.as_str(), "p011");

        let last = catalog
            .fetch_page(PageRequest::after(10, Cursor::new("p020")))
            .await
            .unwrap();
        assert_eq!(last.len(), 5);
    }

    #[tokio::test]
    async fn test_catalog_unknown_cursor_is_empty() {
        let catalog = InMemoryCatalog::numbered(3);
        let page = catalog
            .fetch_page(PageRequest::after(10, Cursor::new("gone")))
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_injection() {
        let catalog = InMemoryCatalog::numbered(3);
        catalog.fail_next(1);
        assert!(catalog.fetch_page(PageRequest::first(10)).await.is_err());
        assert!(catalog.fetch_page(PageRequest::first(10)).await.is_ok());
        assert_eq!(catalog.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_cart_documents_roundtrip() {
        let carts = InMemoryCartDocuments::new();
        let uid = user("u1");
        assert_eq!(carts.read_cart(&uid).await.unwrap(), None);

        let doc = CartDocument::default();
        carts.write_cart(&uid, &doc).await.unwrap();
        assert_eq!(carts.read_cart(&uid).await.unwrap(), Some(doc));
        assert_eq!(carts.writes().len(), 1);
        assert_eq!(carts.read_count(), 2);
    }

    #[tokio::test]
    async fn test_cart_write_failure_is_not_recorded() {
        let carts = InMemoryCartDocuments::new();
        carts.fail_writes(1);
        let uid = user("u1");
        assert!(
            carts
                .write_cart(&uid, &CartDocument::default())
                .await
                .is_err()
        );
        assert!(carts.writes().is_empty());
        assert!(carts.document(&uid).is_none());
    }

    #[test]
    fn test_demo_catalog_is_seeded() {
        assert_eq!(lock(&demo_catalog().products).len(), DEMO_PRODUCTS.len());
    }
}
