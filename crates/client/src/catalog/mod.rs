//! Paginated product catalog state.
//!
//! The [`Paginator`] owns the cumulative product list and the pagination
//! cursor. Observers (the presenter, the controller) read it through a
//! `tokio::sync::watch` subscription.
//!
//! # State machine
//!
//! ```text
//! Idle -> InitialLoad -> Ready -> AppendLoad -> Ready -> ...
//!                        Ready -> RefreshLoad -> Ready
//! any -> Detached (teardown; late results are discarded)
//! ```

mod paginator;

pub use paginator::Paginator;

use std::fmt;

use shopnow_core::{CursorState, Product};
use thiserror::Error;

use crate::remote::RemoteError;

/// How a fetch merges into the cumulative list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fetch from the beginning and replace the list.
    Reset,
    /// Fetch after the cursor and append to the list.
    Append,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Append => write!(f, "append"),
        }
    }
}

/// Lifecycle phase of the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    InitialLoad,
    Ready,
    AppendLoad,
    RefreshLoad,
    Detached,
}

/// Why a fetch request was dropped without contacting the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch is in flight.
    Busy,
    /// `Append` before any page was fetched.
    NotStarted,
    /// The last page was the final one.
    Exhausted,
    /// The owning screen was torn down.
    Detached,
}

/// Result of a fetch request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was merged into the list.
    Loaded {
        /// Products in the page.
        count: usize,
        /// Whether this was the final page.
        exhausted: bool,
    },
    /// The request was dropped by a guard.
    Skipped(SkipReason),
    /// The page arrived after teardown and was ignored.
    Discarded,
}

/// A page fetch that reached the catalog and failed.
#[derive(Debug, Error)]
#[error("{mode} fetch failed: {source}")]
pub struct FetchError {
    pub mode: FetchMode,
    #[source]
    pub source: RemoteError,
}

/// Observable catalog state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    /// Cumulative product list in fetch order.
    pub products: Vec<Product>,
    /// Where pagination stands.
    pub cursor: CursorState,
    pub phase: Phase,
    /// Initial or reset fetch in flight.
    pub loading: bool,
    /// Append fetch in flight.
    pub loading_more: bool,
    /// A user-initiated refresh is in flight.
    pub refreshing: bool,
    /// Message of the most recent failed fetch, cleared when a fetch starts.
    pub last_error: Option<String>,
}

impl CatalogState {
    /// Whether any fetch is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.loading || self.loading_more
    }

    /// Look up a product in the cumulative list.
    #[must_use]
    pub fn product(&self, id: &shopnow_core::ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError {
            mode: FetchMode::Append,
            source: RemoteError::RateLimited(5),
        };
        assert_eq!(
            err.to_string(),
            "append fetch failed: Rate limited, retry after 5 seconds"
        );
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = CatalogState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.cursor, CursorState::NotStarted);
        assert!(!state.is_busy());
    }
}
