//! Cart inspection and add-to-cart through the product list screen.

use std::time::Duration;

use shopnow_client::ShopContext;
use shopnow_client::ShopListController;
use shopnow_client::cart::{AddOutcome, SyncEvent};
use shopnow_client::catalog::FetchOutcome;
use shopnow_client::remote::CartDocuments;
use shopnow_core::{ProductId, UserId};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, warn};

/// Extra time allowed on top of the debounce for the write to land.
const WRITE_GRACE: Duration = Duration::from_secs(30);

/// Log the stored cart document for `user`.
///
/// # Errors
///
/// Returns an error if the document cannot be read.
pub async fn show(context: &ShopContext, user: &UserId) -> Result<(), Box<dyn std::error::Error>> {
    let Some(document) = context.documents().read_cart(user).await? else {
        info!(user = %user, "No cart stored");
        return Ok(());
    };

    for item in &document.items {
        info!(
            id = %item.id,
            name = %item.name,
            price = %item.price,
            "Cart item"
        );
    }
    info!(user = %user, items = document.items.len(), "Cart loaded");
    Ok(())
}

/// Sign in as `user`, find `product` within `pages` pages, add it and wait
/// for the debounced write.
///
/// # Errors
///
/// Returns an error if the product cannot be found, a page fails to load or
/// the cart cannot be saved.
pub async fn add(
    context: ShopContext,
    user: UserId,
    product: &ProductId,
    pages: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let wait = context.settings().cart_sync_debounce + WRITE_GRACE;
    context.session().sign_in(user);

    let controller = ShopListController::new(context);
    let mut events = controller.sync_events();

    let result = add_and_wait(&controller, &mut events, product, pages, wait).await;
    controller.unmount().await;
    result
}

async fn add_and_wait(
    controller: &ShopListController,
    events: &mut broadcast::Receiver<SyncEvent>,
    product: &ProductId,
    pages: usize,
    wait: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    find_product(controller, product, pages).await?;

    // Hydration may replace the cart, so add only after it settles
    let hydrated = timeout(wait, next_matching(events, |event| {
        matches!(
            event,
            SyncEvent::Hydrated { .. }
                | SyncEvent::HydrationMissing { .. }
                | SyncEvent::HydrationFailed { .. }
        )
    }))
    .await??;
    if let SyncEvent::HydrationFailed { error, .. } = &hydrated {
        warn!(error = %error, "Could not load existing cart");
    }

    if controller.add_to_cart(product)? == AddOutcome::AlreadyInCart {
        info!(product = %product, "Already in cart");
        return Ok(());
    }

    let saved = timeout(wait, next_matching(events, |event| {
        matches!(
            event,
            SyncEvent::Persisted { .. } | SyncEvent::PersistFailed { .. }
        )
    }))
    .await??;

    match saved {
        SyncEvent::PersistFailed { error, .. } => Err(format!("Cart not saved: {error}").into()),
        _ => {
            info!(
                product = %product,
                items = controller.cart().snapshot().len(),
                "Cart saved"
            );
            Ok(())
        }
    }
}

/// Append pages until `product` is loaded.
async fn find_product(
    controller: &ShopListController,
    product: &ProductId,
    pages: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut outcome = controller.mount().await?;
    let mut loaded = 1;

    loop {
        if controller.catalog_state().product(product).is_some() {
            return Ok(());
        }
        let exhausted = match outcome {
            FetchOutcome::Loaded { exhausted, .. } => exhausted,
            FetchOutcome::Skipped(_) | FetchOutcome::Discarded => true,
        };
        if exhausted || loaded >= pages {
            return Err(format!("Product {product} not found in {loaded} page(s)").into());
        }
        outcome = controller.on_end_reached().await?;
        loaded += 1;
    }
}

async fn next_matching(
    events: &mut broadcast::Receiver<SyncEvent>,
    wanted: impl Fn(&SyncEvent) -> bool,
) -> Result<SyncEvent, broadcast::error::RecvError> {
    loop {
        match events.recv().await {
            Ok(event) if wanted(&event) => return Ok(event),
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(e) => return Err(e),
        }
    }
}
