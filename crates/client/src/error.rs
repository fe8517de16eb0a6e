//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ShopError` type for everything the product list
//! screen can surface. Errors are logged and captured to Sentry through
//! [`ShopError::report`] before the screen falls back to its previous state.

use shopnow_core::ProductId;
use thiserror::Error;

use crate::cart::CartSyncError;
use crate::catalog::FetchError;
use crate::config::ConfigError;
use crate::remote::RemoteError;

/// Application-level error type for the shop client.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote store operation failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Catalog page fetch failed.
    #[error("Catalog error: {0}")]
    Fetch(#[from] FetchError),

    /// Cart hydration or persistence failed.
    #[error("Cart sync error: {0}")]
    CartSync(#[from] CartSyncError),

    /// Product is not in the loaded list.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The screen is not mounted.
    #[error("Product list is not mounted")]
    NotMounted,
}

impl ShopError {
    /// Whether this error indicates a problem worth reporting to Sentry.
    ///
    /// Caller mistakes (unknown product, unmounted screen) are only logged.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::Fetch(_) | Self::CartSync(_) | Self::Config(_)
        )
    }

    /// Log this error and capture it to Sentry when reportable.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Shop error"
            );
        } else {
            tracing::warn!(error = %self, "Shop error");
        }
    }
}

/// Result type alias for `ShopError`.
pub type Result<T> = std::result::Result<T, ShopError>;

/// Log and capture any error that is not a `ShopError`.
pub fn capture<E>(error: &E, context: &str)
where
    E: std::error::Error + Send + Sync + 'static,
{
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "{context}"
    );
}

/// Set the Sentry user context from a user ID.
///
/// Call this when a user signs in to associate errors with them.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p001")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
