//! Shop Now product list client.
//!
//! This crate provides the product list screen as a library: a paginated
//! product catalog, the shared cart with its debounced remote mirror, and the
//! view model for a two-column product grid.
//!
//! [`ShopListController`] is the entry point. Build it from a [`ShopContext`]
//! backed either by the remote document store or by the in-memory backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod navigation;
pub mod notifier;
pub mod presenter;
pub mod remote;
pub mod session;
pub mod state;
pub mod telemetry;

pub use controller::ShopListController;
pub use error::{Result, ShopError};
pub use state::ShopContext;
