//! View model for the product grid.
//!
//! [`ListPresenter`] turns catalog and cart state into a [`ListView`]. It
//! holds no state of its own, so a view can be rebuilt whenever either input
//! changes.

use shopnow_core::{CurrencyCode, Product, ProductId};

use crate::cart::CartState;
use crate::catalog::CatalogState;
use crate::config::ListSettings;

/// Label of the add-to-cart control for an item not yet in the cart.
pub const ADD_LABEL: &str = "Add to Cart";
/// Label of the add-to-cart control for an item already in the cart.
pub const ADDED_LABEL: &str = "Added to Cart";

const COLUMNS: usize = 2;
const ELLIPSIS: &str = "...";

/// What the screen should render.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    /// Full-screen spinner; nothing has loaded yet.
    Loading,
    Grid(GridView),
}

impl ListView {
    #[must_use]
    pub const fn grid(&self) -> Option<&GridView> {
        match self {
            Self::Grid(grid) => Some(grid),
            Self::Loading => None,
        }
    }

    /// Every card in display order.
    pub fn cards(&self) -> impl Iterator<Item = &ProductCard> {
        self.grid()
            .into_iter()
            .flat_map(|grid| grid.rows.iter())
            .flat_map(|row| row.cards.iter())
    }

    /// Card for `id`, if it is on screen.
    #[must_use]
    pub fn card(&self, id: &ProductId) -> Option<&ProductCard> {
        self.cards().find(|card| &card.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub rows: Vec<GridRow>,
    /// Pull-to-refresh indicator.
    pub refreshing: bool,
    /// Footer spinner while the next page loads.
    pub loading_more: bool,
    /// Notice for the last failed fetch.
    pub error: Option<String>,
    /// No further pages.
    pub end_of_list: bool,
}

impl GridView {
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.rows.iter().map(|row| row.cards.len()).sum()
    }
}

/// One row of at most two cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub cards: Vec<ProductCard>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub price_label: String,
    pub image: String,
    pub button: AddButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddButton {
    pub label: &'static str,
    pub enabled: bool,
}

impl AddButton {
    #[must_use]
    pub const fn for_cart(in_cart: bool) -> Self {
        if in_cart {
            Self {
                label: ADDED_LABEL,
                enabled: false,
            }
        } else {
            Self {
                label: ADD_LABEL,
                enabled: true,
            }
        }
    }
}

/// Scroll position reported by the list widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top.
    pub offset: f64,
    /// Total length of the content.
    pub content_length: f64,
    /// Visible length.
    pub viewport_length: f64,
}

impl ScrollMetrics {
    /// Distance from the bottom of the viewport to the end of the content.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.content_length - self.offset - self.viewport_length
    }
}

/// Whether the end of the list is within `threshold` viewports.
#[must_use]
pub fn should_load_more(metrics: &ScrollMetrics, threshold: f64) -> bool {
    metrics.remaining() < threshold * metrics.viewport_length
}

/// Shorten `name` to `max_chars` characters followed by `...`.
#[must_use]
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    match name.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", name.get(..cut).unwrap_or(name)),
        None => name.to_string(),
    }
}

/// Builds [`ListView`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListPresenter {
    name_max_chars: usize,
    currency: CurrencyCode,
    load_more_threshold: f64,
}

impl ListPresenter {
    #[must_use]
    pub const fn new(settings: &ListSettings) -> Self {
        Self {
            name_max_chars: settings.name_max_chars,
            currency: settings.currency,
            load_more_threshold: settings.load_more_threshold,
        }
    }

    #[must_use]
    pub fn should_load_more(&self, metrics: &ScrollMetrics) -> bool {
        should_load_more(metrics, self.load_more_threshold)
    }

    #[must_use]
    pub fn present(&self, catalog: &CatalogState, cart: &CartState) -> ListView {
        if catalog.products.is_empty() && catalog.loading {
            return ListView::Loading;
        }

        let rows = catalog
            .products
            .chunks(COLUMNS)
            .map(|chunk| GridRow {
                cards: chunk
                    .iter()
                    .map(|product| self.card(product, cart.contains(&product.id)))
                    .collect(),
            })
            .collect();

        ListView::Grid(GridView {
            rows,
            refreshing: catalog.refreshing,
            loading_more: catalog.loading_more,
            error: catalog.last_error.clone(),
            end_of_list: catalog.cursor.is_exhausted(),
        })
    }

    #[must_use]
    pub fn card(&self, product: &Product, in_cart: bool) -> ProductCard {
        ProductCard {
            id: product.id.clone(),
            name: truncate_name(&product.name, self.name_max_chars),
            price_label: product.price_in(self.currency).label(),
            image: product.image.clone(),
            button: AddButton::for_cart(in_cart),
        }
    }
}

impl Default for ListPresenter {
    fn default() -> Self {
        Self::new(&ListSettings::default())
    }
}
