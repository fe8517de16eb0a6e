//! Core types for Shop Now.
//!
//! This module provides type-safe wrappers for the catalog and cart domain.

pub mod id;
pub mod page;
pub mod price;
pub mod product;

pub use id::*;
pub use page::{Cursor, CursorState, PageRequest, ProductPage};
pub use price::{CurrencyCode, Price};
pub use product::{CartDocument, CartItem, Product};
