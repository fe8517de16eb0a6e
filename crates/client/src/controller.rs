//! The product list screen.
//!
//! [`ShopListController`] wires the paginator, the cart bridge, the presenter
//! and the navigation boundary together, and owns the background tasks that
//! live while the screen is mounted:
//!
//! - the user watcher, which runs one cart sync session per signed-in user
//! - the view publisher, which rebuilds the [`ListView`] on every change

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shopnow_core::{ProductId, UserId};
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cart::{AddOutcome, CartState, CartStore, CartSync, SyncEvent, SyncSession};
use crate::catalog::{CatalogState, FetchMode, FetchOutcome, Paginator, Phase, SkipReason};
use crate::error::{Result, ShopError, add_breadcrumb};
use crate::presenter::{ListPresenter, ListView, ScrollMetrics};
use crate::state::ShopContext;

/// Background tasks alive while the screen is mounted.
struct Mounted {
    user_shutdown: oneshot::Sender<()>,
    user_watch: JoinHandle<()>,
    view_task: JoinHandle<()>,
}

/// Controller for the paginated product grid.
pub struct ShopListController {
    context: ShopContext,
    paginator: Paginator,
    cart_sync: CartSync,
    presenter: ListPresenter,
    view: Arc<watch::Sender<ListView>>,
    mounted: Mutex<Option<Mounted>>,
}

impl ShopListController {
    #[must_use]
    pub fn new(context: ShopContext) -> Self {
        let settings = context.settings();
        let paginator = Paginator::new(context.catalog(), settings.page_size);
        let cart_sync = CartSync::new(
            context.cart().clone(),
            context.documents(),
            context.notifier(),
            settings.cart_sync_debounce,
        );
        let presenter = ListPresenter::new(settings);
        let initial = presenter.present(&paginator.snapshot(), &context.cart().snapshot());
        let (view, _) = watch::channel(initial);

        Self {
            context,
            paginator,
            cart_sync,
            presenter,
            view: Arc::new(view),
            mounted: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn context(&self) -> &ShopContext {
        &self.context
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        self.context.cart()
    }

    #[must_use]
    pub fn catalog_state(&self) -> CatalogState {
        self.paginator.snapshot()
    }

    /// Subscribe to cart sync events of every session this screen runs.
    #[must_use]
    pub fn sync_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.cart_sync.events()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.lock_mounted().is_some()
    }

    /// Start the background tasks and load the first page.
    ///
    /// Mounting an already mounted screen only retries the first page; a
    /// screen that was unmounted stays down.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Fetch`] when the first page fails to load.
    #[instrument(skip(self))]
    pub async fn mount(&self) -> Result<FetchOutcome> {
        if self.paginator.snapshot().phase == Phase::Detached {
            return Ok(FetchOutcome::Skipped(SkipReason::Detached));
        }
        {
            let mut mounted = self.lock_mounted();
            if mounted.is_none() {
                *mounted = Some(self.spawn_tasks());
                info!("product list mounted");
            }
        }
        self.fetch(FetchMode::Reset).await
    }

    /// Load the next page if the scroll position crossed the threshold.
    ///
    /// Returns `None` when the threshold was not crossed.
    ///
    /// # Errors
    ///
    /// See [`ShopListController::on_end_reached`].
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> Result<Option<FetchOutcome>> {
        if !self.presenter.should_load_more(&metrics) {
            return Ok(None);
        }
        self.on_end_reached().await.map(Some)
    }

    /// Load the next page.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::NotMounted`] before mount or after unmount, and
    /// [`ShopError::Fetch`] when the page fails to load.
    pub async fn on_end_reached(&self) -> Result<FetchOutcome> {
        self.ensure_mounted()?;
        self.fetch(FetchMode::Append).await
    }

    /// Reload from the first page (pull-to-refresh).
    ///
    /// # Errors
    ///
    /// Same as [`ShopListController::on_end_reached`].
    #[instrument(skip(self))]
    pub async fn on_refresh(&self) -> Result<FetchOutcome> {
        self.ensure_mounted()?;
        add_breadcrumb("catalog", "Pulled to refresh", None);
        self.paginator
            .refresh()
            .await
            .map_err(|e| reported(ShopError::Fetch(e)))
    }

    /// Add a loaded product to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::UnknownProduct`] if `id` is not in the loaded list.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn add_to_cart(&self, id: &ProductId) -> Result<AddOutcome> {
        let state = self.paginator.snapshot();
        let product = state
            .product(id)
            .ok_or_else(|| reported(ShopError::UnknownProduct(id.clone())))?;

        let outcome = self.cart_sync.add_item(product);
        if outcome == AddOutcome::Added {
            add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
        }
        Ok(outcome)
    }

    /// Open the detail screen for a loaded product.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::UnknownProduct`] if `id` is not in the loaded list.
    pub fn select_product(&self, id: &ProductId) -> Result<()> {
        if self.paginator.snapshot().product(id).is_none() {
            return Err(reported(ShopError::UnknownProduct(id.clone())));
        }
        add_breadcrumb("navigation", "Opened product", Some(&[("product_id", id.as_str())]));
        self.context.navigator().open_product(id);
        Ok(())
    }

    /// Current view, built from the latest catalog and cart state.
    #[must_use]
    pub fn view(&self) -> ListView {
        self.presenter
            .present(&self.paginator.snapshot(), &self.context.cart().snapshot())
    }

    /// Subscribe to view changes. Views are published while mounted.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.view.subscribe()
    }

    /// Tear the screen down.
    ///
    /// Stops the cart sync session (a pending write is dropped, a write in
    /// flight completes) and detaches the paginator so fetches still in
    /// flight are ignored. The controller cannot be mounted again.
    #[instrument(skip(self))]
    pub async fn unmount(&self) {
        self.paginator.detach();

        let Some(mounted) = self.lock_mounted().take() else {
            return;
        };

        mounted.view_task.abort();
        // Err means the watcher already exited
        let _ = mounted.user_shutdown.send(());
        if let Err(e) = mounted.user_watch.await {
            warn!(error = %e, "user watcher ended abnormally");
        }
        info!("product list unmounted");
    }

    async fn fetch(&self, mode: FetchMode) -> Result<FetchOutcome> {
        self.paginator
            .fetch_page(mode)
            .await
            .map_err(|e| reported(ShopError::Fetch(e)))
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(ShopError::NotMounted)
        }
    }

    fn lock_mounted(&self) -> MutexGuard<'_, Option<Mounted>> {
        self.mounted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_tasks(&self) -> Mounted {
        let (user_shutdown, shutdown_rx) = oneshot::channel();
        let user_watch = tokio::spawn(watch_user(
            self.cart_sync.clone(),
            self.context.session().subscribe(),
            shutdown_rx,
        ));
        let view_task = tokio::spawn(publish_views(
            self.presenter,
            self.paginator.subscribe(),
            self.context.cart().subscribe(),
            Arc::clone(&self.view),
        ));

        Mounted {
            user_shutdown,
            user_watch,
            view_task,
        }
    }
}

fn reported(error: ShopError) -> ShopError {
    error.report();
    error
}

/// Run one cart sync session per signed-in user until shut down.
async fn watch_user(
    sync: CartSync,
    mut users: watch::Receiver<Option<UserId>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut session: Option<SyncSession> = users
        .borrow_and_update()
        .clone()
        .map(|user| sync.spawn_session(user));

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = users.changed() => {
                if changed.is_err() {
                    break;
                }
                let user = users.borrow_and_update().clone();
                if session.as_ref().map(SyncSession::user) == user.as_ref() {
                    continue;
                }
                if let Some(previous) = session.take() {
                    debug!(user = %previous.user(), "stopping cart sync for previous user");
                    previous.stop().await;
                }
                session = user.map(|user| sync.spawn_session(user));
            }
        }
    }

    if let Some(session) = session {
        session.stop().await;
    }
}

/// Rebuild the view whenever the catalog or the cart changes.
async fn publish_views(
    presenter: ListPresenter,
    mut catalog: watch::Receiver<CatalogState>,
    mut cart: watch::Receiver<CartState>,
    view: Arc<watch::Sender<ListView>>,
) {
    loop {
        let open = tokio::select! {
            changed = catalog.changed() => changed.is_ok(),
            changed = cart.changed() => changed.is_ok(),
        };
        if !open {
            break;
        }
        let next = presenter.present(&catalog.borrow_and_update(), &cart.borrow_and_update());
        view.send_replace(next);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::ListSettings;
    use crate::navigation::ChannelNavigator;
    use crate::notifier::BroadcastNotifier;
    use crate::presenter::{ADD_LABEL, ADDED_LABEL};
    use crate::remote::{CartDocuments, InMemoryCartDocuments, InMemoryCatalog, ProductCatalog};
    use crate::session::Session;

    struct Harness {
        controller: ShopListController,
        catalog: Arc<InMemoryCatalog>,
        documents: Arc<InMemoryCartDocuments>,
        session: Session,
        notifier: BroadcastNotifier,
        navigation: tokio::sync::mpsc::UnboundedReceiver<ProductId>,
    }

    fn harness(products: usize) -> Harness {
        let catalog = Arc::new(InMemoryCatalog::numbered(products));
        let documents = Arc::new(InMemoryCartDocuments::new());
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

        Harness {
            controller: ShopListController::new(context),
            catalog,
            documents,
            session,
            notifier,
            navigation,
        }
    }

    fn pid(id: &str) -> ProductId {
        ProductId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_mount_loads_first_page() {
        let h = harness(25);
        let outcome = h.controller.mount().await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Loaded { count: 10, .. }));
        assert_eq!(h.controller.view().grid().unwrap().rows.len(), 5);
        h.controller.unmount().await;
    }

    #[tokio::test]
    async fn test_scroll_operations_require_mount() {
        let h = harness(25);
        assert!(matches!(
            h.controller.on_end_reached().await,
            Err(ShopError::NotMounted)
        ));
        assert!(matches!(
            h.controller.on_refresh().await,
            Err(ShopError::NotMounted)
        ));
    }

    #[tokio::test]
    async fn test_scroll_below_threshold_does_nothing() {
        let h = harness(25);
        h.controller.mount().await.unwrap();

        let far = ScrollMetrics {
            offset: 0.0,
            content_length: 5000.0,
            viewport_length: 800.0,
        };
        assert_eq!(h.controller.on_scroll(far).await.unwrap(), None);

        let near = ScrollMetrics {
            offset: 4000.0,
            ..far
        };
        let outcome = h.controller.on_scroll(near).await.unwrap();
        assert!(matches!(outcome, Some(FetchOutcome::Loaded { count: 10, .. })));
        assert_eq!(h.controller.catalog_state().products.len(), 20);
        h.controller.unmount().await;
    }

    #[tokio::test]
    async fn test_add_to_cart_disables_button() {
        let h = harness(5);
        let mut toasts = h.notifier.subscribe();
        h.controller.mount().await.unwrap();

        let id = pid("p002");
        assert_eq!(h.controller.view().card(&id).unwrap().button.label, ADD_LABEL);

        assert_eq!(h.controller.add_to_cart(&id).unwrap(), AddOutcome::Added);
        let card = h.controller.view().card(&id).cloned().unwrap();
        assert_eq!(card.button.label, ADDED_LABEL);
        assert!(!card.button.enabled);

        assert_eq!(h.controller.add_to_cart(&id).unwrap(), AddOutcome::AlreadyInCart);
        assert_eq!(h.controller.cart().snapshot().len(), 1);
        assert_eq!(toasts.recv().await.unwrap().text, "Product 2 added to cart");
        assert!(toasts.try_recv().is_err());
        h.controller.unmount().await;
    }

    #[tokio::test]
    async fn test_unknown_product_is_rejected() {
        let h = harness(5);
        h.controller.mount().await.unwrap();
        assert!(matches!(
            h.controller.add_to_cart(&pid("p999")),
            Err(ShopError::UnknownProduct(_))
        ));
        assert!(matches!(
            h.controller.select_product(&pid("p999")),
            Err(ShopError::UnknownProduct(_))
        ));
        h.controller.unmount().await;
    }

    #[tokio::test]
    async fn test_select_product_navigates() {
        let mut h = harness(5);
        h.controller.mount().await.unwrap();
        h.controller.select_product(&pid("p003")).unwrap();
        assert_eq!(h.navigation.recv().await.unwrap(), pid("p003"));
        h.controller.unmount().await;
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_in_view() {
        let h = harness(25);
        h.controller.mount().await.unwrap();
        h.catalog.fail_next(1);

        let err = h.controller.on_end_reached().await.unwrap_err();
        assert!(matches!(err, ShopError::Fetch(_)));

        let view = h.controller.view();
        let grid = view.grid().unwrap();
        assert_eq!(grid.card_count(), 10);
        assert!(grid.error.is_some());
        h.controller.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signed_in_user_gets_synced_cart() {
        let h = harness(5);
        let mut events = h.controller.sync_events();
        h.session.sign_in(UserId::parse("u1").unwrap());
        h.controller.mount().await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::HydrationMissing { .. }
        ));
        h.controller.add_to_cart(&pid("p001")).unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::Persisted { items: 1, .. }
        ));
        assert_eq!(h.documents.writes().len(), 1);
        h.controller.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_change_cancels_pending_write() {
        let h = harness(5);
        let mut events = h.controller.sync_events();
        h.session.sign_in(UserId::parse("u1").unwrap());
        h.controller.mount().await.unwrap();
        events.recv().await.unwrap();

        h.controller.add_to_cart(&pid("p001")).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        h.session.sign_in(UserId::parse("u2").unwrap());

        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::PersistCancelled {
                user: UserId::parse("u1").unwrap(),
                version: 1
            }
        );
        // The new user's session starts with hydration
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::HydrationMissing { user } if user.as_str() == "u2"
        ));
        h.controller.unmount().await;
        assert!(
            h.documents
                .writes()
                .iter()
                .all(|(user, _)| user.as_str() != "u1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_drops_pending_write_and_late_pages() {
        let h = harness(25);
        let mut events = h.controller.sync_events();
        h.session.sign_in(UserId::parse("u1").unwrap());
        h.controller.mount().await.unwrap();
        events.recv().await.unwrap();

        h.controller.add_to_cart(&pid("p001")).unwrap();
        h.controller.unmount().await;

        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::PersistCancelled { .. }
        ));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(h.documents.writes().is_empty());
        assert!(matches!(
            h.controller.on_end_reached().await,
            Err(ShopError::NotMounted)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_loaded_pages() {
        let h = harness(25);
        let mut views = h.controller.subscribe();
        h.controller.mount().await.unwrap();

        let view = views
            .wait_for(|view| view.grid().is_some_and(|grid| grid.card_count() == 10))
            .await
            .unwrap()
            .clone();
        assert_eq!(view.cards().count(), 10);
        h.controller.unmount().await;
    }
}
