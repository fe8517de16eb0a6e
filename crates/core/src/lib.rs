//! Shop Now Core - Shared types library.
//!
//! This crate provides the domain types used across all Shop Now components:
//! - `client` - Product list controller, cart store and remote sync
//! - `cli` - Command-line harness driving the controller
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no async runtime, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, cart items and pagination cursors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
