//! Page through the product list and log the grid.

use shopnow_client::ShopListController;
use shopnow_client::ShopContext;
use shopnow_client::catalog::FetchOutcome;
use shopnow_client::presenter::ListView;
use tracing::info;

/// Mount the product list, load up to `pages` pages, log the grid and unmount.
///
/// # Errors
///
/// Returns an error if a page fails to load.
pub async fn run(context: ShopContext, pages: usize) -> Result<(), Box<dyn std::error::Error>> {
    let controller = ShopListController::new(context);

    let result = load_pages(&controller, pages).await;
    if result.is_ok() {
        log_view(&controller.view());
    }

    controller.unmount().await;
    result.map(|_| ())
}

/// Mount and keep appending until `pages` pages are loaded or the list ends.
///
/// Returns the number of pages that were loaded.
pub async fn load_pages(
    controller: &ShopListController,
    pages: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut loaded = match controller.mount().await? {
        FetchOutcome::Loaded { exhausted: true, .. } => return Ok(1),
        FetchOutcome::Loaded { .. } => 1,
        FetchOutcome::Skipped(_) | FetchOutcome::Discarded => 0,
    };

    while loaded < pages {
        match controller.on_end_reached().await? {
            FetchOutcome::Loaded { exhausted, .. } => {
                loaded += 1;
                if exhausted {
                    break;
                }
            }
            FetchOutcome::Skipped(_) | FetchOutcome::Discarded => break,
        }
    }

    Ok(loaded)
}

/// Log every card of the grid, row by row.
pub fn log_view(view: &ListView) {
    let Some(grid) = view.grid() else {
        info!("Product list is still loading");
        return;
    };

    for (row, cards) in grid.rows.iter().enumerate() {
        for card in &cards.cards {
            info!(
                row,
                id = %card.id,
                name = %card.name,
                price = %card.price_label,
                button = card.button.label,
                "Product"
            );
        }
    }

    info!(
        products = grid.card_count(),
        end_of_list = grid.end_of_list,
        "Product list loaded"
    );
}
