//! Shared dependencies of the product list screen.

use std::sync::Arc;

use crate::cart::CartStore;
use crate::config::{ClientConfig, ListSettings};
use crate::navigation::{Navigator, TracingNavigator};
use crate::notifier::{Notifier, TracingNotifier};
use crate::remote::{
    CartDocuments, DocumentStoreClient, InMemoryCartDocuments, ProductCatalog, RemoteError,
    memory::demo_catalog,
};
use crate::session::Session;

/// Everything the controller depends on.
///
/// This struct is cheaply cloneable via `Arc`. The cart store and session are
/// process-wide; every clone shares them.
#[derive(Clone)]
pub struct ShopContext {
    inner: Arc<ShopContextInner>,
}

struct ShopContextInner {
    settings: ListSettings,
    catalog: Arc<dyn ProductCatalog>,
    documents: Arc<dyn CartDocuments>,
    cart: CartStore,
    session: Session,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl ShopContext {
    /// Start building a context over the given backends.
    #[must_use]
    pub fn builder(
        settings: ListSettings,
        catalog: Arc<dyn ProductCatalog>,
        documents: Arc<dyn CartDocuments>,
    ) -> ShopContextBuilder {
        ShopContextBuilder {
            settings,
            catalog,
            documents,
            cart: None,
            session: None,
            notifier: None,
            navigator: None,
        }
    }

    /// Context backed by the remote document store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn remote(config: &ClientConfig) -> Result<Self, RemoteError> {
        let client = DocumentStoreClient::new(&config.backend)?;
        Ok(Self::builder(
            config.list.clone(),
            Arc::new(client.clone()),
            Arc::new(client),
        )
        .build())
    }

    /// Context backed by in-memory sample data.
    #[must_use]
    pub fn demo(settings: ListSettings) -> Self {
        Self::builder(
            settings,
            Arc::new(demo_catalog()),
            Arc::new(InMemoryCartDocuments::new()),
        )
        .build()
    }

    #[must_use]
    pub fn settings(&self) -> &ListSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn ProductCatalog> {
        Arc::clone(&self.inner.catalog)
    }

    #[must_use]
    pub fn documents(&self) -> Arc<dyn CartDocuments> {
        Arc::clone(&self.inner.documents)
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.inner.notifier)
    }

    #[must_use]
    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.inner.navigator)
    }
}

/// Builder for [`ShopContext`]. Unset parts get fresh or logging defaults.
pub struct ShopContextBuilder {
    settings: ListSettings,
    catalog: Arc<dyn ProductCatalog>,
    documents: Arc<dyn CartDocuments>,
    cart: Option<CartStore>,
    session: Option<Session>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ShopContextBuilder {
    #[must_use]
    pub fn cart(mut self, cart: CartStore) -> Self {
        self.cart = Some(cart);
        self
    }

    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn build(self) -> ShopContext {
        ShopContext {
            inner: Arc::new(ShopContextInner {
                settings: self.settings,
                catalog: self.catalog,
                documents: self.documents,
                cart: self.cart.unwrap_or_default(),
                session: self.session.unwrap_or_default(),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(TracingNavigator)),
            }),
        }
    }
}
