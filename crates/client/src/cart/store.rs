use std::sync::Arc;

use shopnow_core::{CartItem, ProductId};
use tokio::sync::watch;

/// Items in the cart plus a counter bumped on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub version: u64,
}

impl CartState {
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The only ways the cart changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Append an item unless one with the same ID is present.
    Add(CartItem),
    /// Replace every item, used when hydrating from the remote document.
    ReplaceAll(Vec<CartItem>),
}

/// Process-wide cart state container.
///
/// Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct CartStore {
    state: Arc<watch::Sender<CartState>>,
}

impl CartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Store seeded with `items`, at version 0.
    #[must_use]
    pub fn with_items(items: Vec<CartItem>) -> Self {
        let (state, _) = watch::channel(CartState { items, version: 0 });
        Self {
            state: Arc::new(state),
        }
    }

    /// Apply `action`, returning the version it produced, or `None` when
    /// the cart did not change.
    ///
    /// Subscribers are only notified of actual changes.
    pub fn dispatch(&self, action: CartAction) -> Option<u64> {
        let mut applied = None;
        self.state.send_if_modified(|state| {
            match action {
                CartAction::Add(item) => {
                    if state.contains(&item.id) {
                        return false;
                    }
                    state.items.push(item);
                }
                CartAction::ReplaceAll(items) => state.items = items,
            }
            state.version += 1;
            applied = Some(state.version);
            true
        });
        applied
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.state.borrow().contains(id)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.borrow().version
    }

    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}
