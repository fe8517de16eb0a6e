//! Shared cart state and its remote mirror.
//!
//! [`CartStore`] is the process-wide source of truth for what is in the cart.
//! [`CartSync`] forwards add-to-cart intents to it and keeps one remote
//! document per signed-in user in step with it.

mod store;
mod sync;

pub use store::{CartAction, CartState, CartStore};
pub use sync::{AddOutcome, CartSync, CartSyncError, Hydration, SyncEvent, SyncSession};
