//! Signed-in user provider.

use std::sync::Arc;

use shopnow_core::UserId;
use tokio::sync::watch;
use tracing::info;

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};

/// Holds the current user, if any, and notifies subscribers on change.
///
/// Cloning shares the same session.
#[derive(Debug, Clone)]
pub struct Session {
    user: Arc<watch::Sender<Option<UserId>>>,
}

impl Session {
    /// A signed-out session.
    #[must_use]
    pub fn new() -> Self {
        let (user, _) = watch::channel(None);
        Self {
            user: Arc::new(user),
        }
    }

    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    #[must_use]
    pub fn current(&self) -> Option<UserId> {
        self.user.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.user.subscribe()
    }

    /// Switch to `user`. Signing in as the current user is a no-op.
    pub fn sign_in(&self, user: UserId) {
        let changed = self.user.send_if_modified(|current| {
            if current.as_ref() == Some(&user) {
                return false;
            }
            *current = Some(user.clone());
            true
        });
        if changed {
            info!(user = %user, "signed in");
            set_sentry_user(&user);
            add_breadcrumb("auth", "Signed in", Some(&[("user_id", user.as_str())]));
        }
    }

    pub fn sign_out(&self) {
        let changed = self.user.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("signed out");
            clear_sentry_user();
            add_breadcrumb("auth", "Signed out", None);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
