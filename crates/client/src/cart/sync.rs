//! Add-to-cart intents and the remote cart mirror.
//!
//! Each signed-in user gets one background session that first hydrates the
//! cart from the remote document, then writes the cart back after every
//! quiet period of `debounce`.

use std::sync::Arc;
use std::time::Duration;

use shopnow_core::{CartDocument, CartItem, Product, UserId};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, warn};

use super::store::{CartAction, CartState, CartStore};
use crate::error::capture;
use crate::notifier::{Notifier, Toast};
use crate::remote::{CartDocuments, RemoteError};

/// Capacity of the sync event channel.
const EVENT_CAPACITY: usize = 64;

/// A cart document read or write that failed.
#[derive(Debug, Error)]
pub enum CartSyncError {
    #[error("failed to load cart for {user}: {source}")]
    Hydrate {
        user: UserId,
        #[source]
        source: RemoteError,
    },

    #[error("failed to save cart for {user}: {source}")]
    Persist {
        user: UserId,
        #[source]
        source: RemoteError,
    },
}

/// Result of [`CartSync::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyInCart,
}

/// Result of a successful [`CartSync::hydrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// The remote document replaced the cart.
    Replaced {
        /// Items loaded from the document.
        items: usize,
        /// Cart version right after the replace.
        version: u64,
    },
    /// No document is stored for the user; the cart was left alone.
    Missing,
}

/// What a sync session did, published for observers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Hydrated { user: UserId, items: usize },
    HydrationMissing { user: UserId },
    HydrationFailed { user: UserId, error: String },
    Persisted { user: UserId, version: u64, items: usize },
    PersistFailed { user: UserId, version: u64, error: String },
    /// A scheduled write was dropped by teardown or a user change.
    PersistCancelled { user: UserId, version: u64 },
}

/// Bridges the product list to the shared cart and its remote document.
#[derive(Clone)]
pub struct CartSync {
    store: CartStore,
    documents: Arc<dyn CartDocuments>,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    events: broadcast::Sender<SyncEvent>,
}

impl CartSync {
    #[must_use]
    pub fn new(
        store: CartStore,
        documents: Arc<dyn CartDocuments>,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            documents,
            notifier,
            debounce,
            events,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Subscribe to session events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Put `product` in the cart unless an item with its ID is already there.
    ///
    /// Shows a confirmation toast only when the cart changed.
    pub fn add_item(&self, product: &Product) -> AddOutcome {
        if self
            .store
            .dispatch(CartAction::Add(CartItem::from(product)))
            .is_none()
        {
            debug!(product_id = %product.id, "already in cart");
            return AddOutcome::AlreadyInCart;
        }

        self.notifier
            .notify(Toast::success(format!("{} added to cart", product.name)));
        AddOutcome::Added
    }

    /// Load the remote cart for `user` into the store.
    ///
    /// # Errors
    ///
    /// Returns [`CartSyncError::Hydrate`] when the read fails. The cart is
    /// left unchanged.
    #[instrument(skip(self, user), fields(user = %user))]
    pub async fn hydrate(&self, user: &UserId) -> Result<Hydration, CartSyncError> {
        let document = self
            .documents
            .read_cart(user)
            .await
            .map_err(|source| CartSyncError::Hydrate {
                user: user.clone(),
                source,
            })?;

        let Some(document) = document else {
            debug!("no remote cart");
            return Ok(Hydration::Missing);
        };

        let items = document.items.len();
        // The version must come from the replace itself, not a later read
        let version = self
            .store
            .dispatch(CartAction::ReplaceAll(document.items))
            .unwrap_or_else(|| self.store.version());
        info!(items, version, "cart hydrated");
        Ok(Hydration::Replaced { items, version })
    }

    /// Overwrite the remote cart for `user` with `state`.
    ///
    /// # Errors
    ///
    /// Returns [`CartSyncError::Persist`] when the write fails. Nothing is
    /// rolled back.
    #[instrument(skip(self, user, state), fields(user = %user, version = state.version, items = state.len()))]
    pub async fn persist(&self, user: &UserId, state: &CartState) -> Result<(), CartSyncError> {
        let document = CartDocument::new(state.items.clone());
        self.documents
            .write_cart(user, &document)
            .await
            .map_err(|source| CartSyncError::Persist {
                user: user.clone(),
                source,
            })
    }

    /// Start the background session for `user`.
    ///
    /// Dropping the returned handle stops the session as well.
    #[must_use]
    pub fn spawn_session(&self, user: UserId) -> SyncSession {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(self.clone().run_session(user.clone(), shutdown_rx));
        SyncSession {
            user,
            shutdown: Some(shutdown),
            handle,
        }
    }

    fn publish(&self, event: SyncEvent) {
        // Err only means there are no receivers
        let _ = self.events.send(event);
    }

    async fn run_session(self, user: UserId, mut shutdown: oneshot::Receiver<()>) {
        let mut changes = self.store.subscribe();

        // Hydration finishes before anything is written back
        let hydration = tokio::select! {
            _ = &mut shutdown => {
                debug!(user = %user, "session stopped during hydration");
                return;
            }
            result = self.hydrate(&user) => result,
        };

        let current = changes.borrow_and_update().clone();
        let mut synced = match hydration {
            Ok(Hydration::Replaced { items, version }) => {
                self.publish(SyncEvent::Hydrated {
                    user: user.clone(),
                    items,
                });
                Some(version)
            }
            Ok(Hydration::Missing) => {
                self.publish(SyncEvent::HydrationMissing { user: user.clone() });
                None
            }
            Err(e) => {
                capture(&e, "Cart hydration failed");
                self.publish(SyncEvent::HydrationFailed {
                    user: user.clone(),
                    error: e.to_string(),
                });
                Some(current.version)
            }
        };

        let needs_write = synced.map_or(!current.is_empty(), |v| current.version > v);
        let mut deadline = needs_write.then(|| Instant::now() + self.debounce);

        loop {
            let timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            // Changes are seen before shutdown so a pending write is reported
            tokio::select! {
                biased;
                changed = changes.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let version = changes.borrow_and_update().version;
                    if synced.is_none_or(|v| version > v) {
                        deadline = Some(Instant::now() + self.debounce);
                    }
                }
                _ = &mut shutdown => {
                    if deadline.is_some() {
                        let version = changes.borrow().version;
                        debug!(user = %user, version, "pending cart write cancelled");
                        self.publish(SyncEvent::PersistCancelled { user, version });
                    }
                    return;
                }
                () = timer => {
                    deadline = None;
                    let state = changes.borrow_and_update().clone();
                    match self.persist(&user, &state).await {
                        Ok(()) => {
                            synced = Some(state.version);
                            self.publish(SyncEvent::Persisted {
                                user: user.clone(),
                                version: state.version,
                                items: state.len(),
                            });
                        }
                        Err(e) => {
                            capture(&e, "Cart persist failed");
                            self.publish(SyncEvent::PersistFailed {
                                user: user.clone(),
                                version: state.version,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

/// Handle to a running sync session.
#[derive(Debug)]
pub struct SyncSession {
    user: UserId,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SyncSession {
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    /// Signal the session to stop without waiting for it.
    ///
    /// A pending write is cancelled; a write already in flight completes.
    pub fn cancel(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Stop the session and wait for it to finish.
    pub async fn stop(mut self) {
        self.cancel();
        if let Err(e) = (&mut self.handle).await {
            warn!(user = %self.user, error = %e, "cart sync session ended abnormally");
        }
    }
}
