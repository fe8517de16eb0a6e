//! Integration tests for the Shop Now product list client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopnow-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `pagination` - Paging through the catalog from the controller
//! - `cart_sync` - Hydration and debounced persistence across sessions
//! - `product_list` - Grid view model, add-to-cart and navigation
//!
//! Every scenario runs against the in-memory backends; no network is needed.

use std::sync::Arc;

use rust_decimal::Decimal;
use shopnow_client::config::ListSettings;
use shopnow_client::navigation::ChannelNavigator;
use shopnow_client::notifier::BroadcastNotifier;
use shopnow_client::remote::{CartDocuments, InMemoryCartDocuments, InMemoryCatalog, ProductCatalog};
use shopnow_client::session::Session;
use shopnow_client::{ShopContext, ShopListController};
use shopnow_core::{CartDocument, CartItem, Product, ProductId, UserId};
use tokio::sync::mpsc;

/// A controller wired to in-memory backends, with handles to inspect them.
pub struct TestContext {
    pub controller: ShopListController,
    pub catalog: Arc<InMemoryCatalog>,
    pub documents: Arc<InMemoryCartDocuments>,
    pub session: Session,
    pub notifier: BroadcastNotifier,
    pub navigation: mpsc::UnboundedReceiver<ProductId>,
}

impl TestContext {
    /// Context over a catalog of `products` numbered products and no carts.
    #[must_use]
    pub fn new(products: usize) -> Self {
        Self::with_backends(
            InMemoryCatalog::numbered(products),
            InMemoryCartDocuments::new(),
        )
    }

    #[must_use]
    pub fn with_backends(catalog: InMemoryCatalog, documents: InMemoryCartDocuments) -> Self {
        let catalog = Arc::new(catalog);
        let documents = Arc::new(documents);
        let session = Session::new();
        let notifier = BroadcastNotifier::default();
        let (navigator, navigation) = ChannelNavigator::new();

        let context = ShopContext::builder(
            ListSettings::default(),
            Arc::clone(&catalog) as Arc<dyn ProductCatalog>,
            Arc::clone(&documents) as Arc<dyn CartDocuments>,
        )
        .session(session.clone())
        .notifier(Arc::new(notifier.clone()))
        .navigator(Arc::new(navigator))
        .build();

        Self {
            controller: ShopListController::new(context),
            catalog,
            documents,
            session,
            notifier,
            navigation,
        }
    }
}

/// Parse a product ID known to be valid.
///
/// # Panics
///
/// Panics if `id` is not a valid product ID.
#[must_use]
#[allow(clippy::expect_used)]
pub fn product_id(id: &str) -> ProductId {
    ProductId::parse(id).expect("valid product id")
}

/// Parse a user ID known to be valid.
///
/// # Panics
///
/// Panics if `id` is not a valid user ID.
#[must_use]
#[allow(clippy::expect_used)]
pub fn user_id(id: &str) -> UserId {
    UserId::parse(id).expect("valid user id")
}

/// A product with the given ID and name, priced at 100.
#[must_use]
pub fn product(id: &str, name: &str) -> Product {
    Product {
        id: product_id(id),
        name: name.to_string(),
        price: Decimal::ONE_HUNDRED,
        image: format!("https://cdn.shopnow.test/products/{id}.png"),
    }
}

/// A stored cart document holding the given products.
#[must_use]
pub fn cart_document(products: &[Product]) -> CartDocument {
    CartDocument::new(products.iter().map(CartItem::from).collect())
}
