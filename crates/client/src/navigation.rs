//! Navigation boundary to the product detail screen.

use shopnow_core::ProductId;
use tokio::sync::mpsc;
use tracing::info;

/// Opens other screens on behalf of the product list.
pub trait Navigator: Send + Sync {
    fn open_product(&self, id: &ProductId);
}

/// Logs navigation requests. Used where no detail screen exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn open_product(&self, id: &ProductId) {
        info!(product_id = %id, "open product");
    }
}

/// Forwards navigation requests to a channel owned by the UI layer.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    sender: mpsc::UnboundedSender<ProductId>,
}

impl ChannelNavigator {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProductId>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Navigator for ChannelNavigator {
    fn open_product(&self, id: &ProductId) {
        if self.sender.send(id.clone()).is_err() {
            tracing::warn!(product_id = %id, "navigation receiver dropped");
        }
    }
}
