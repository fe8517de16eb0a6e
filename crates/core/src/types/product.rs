//! Catalog and cart records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::{CurrencyCode, Price};

/// A product in the remote catalog.
///
/// Products are immutable once fetched. Prices are written to the remote store
/// as plain numbers; numeric strings are accepted on read. The currency is a
/// display concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Identifier assigned by the remote store.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    /// Image URI.
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Price of this product in the given currency.
    #[must_use]
    pub const fn price_in(&self, currency: CurrencyCode) -> Price {
        Price::new(self.price, currency)
    }
}

/// One entry in the cart.
///
/// Carts hold at most one entry per product ID; presence means "in cart".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<&Product> for CartItem {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: (!product.image.is_empty()).then(|| product.image.clone()),
        }
    }
}

/// The per-user cart document kept in the remote store.
///
/// Writes always replace the whole item collection. A stored document without
/// an `items` field reads as an empty cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDocument {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartDocument {
    #[must_use]
    pub const fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: ProductId::parse("p1").unwrap(),
            name: "Rose Serum".to_string(),
            price: Decimal::new(350, 0),
            image: "https://cdn.example.test/p1.png".to_string(),
        }
    }

    #[test]
    fn test_product_deserializes_numeric_price() {
        let product: Product = serde_json::from_str(
            r#"{"id":"p1","name":"Rose Serum","price":349.5,"image":"https://x.test/a.png"}"#,
        )
        .unwrap();
        assert_eq!(product.price, Decimal::new(3495, 1));
    }

    #[test]
    fn test_product_deserializes_string_price() {
        let product: Product =
            serde_json::from_str(r#"{"id":"p1","name":"Soap","price":"20.50"}"#).unwrap();
        assert_eq!(product.price, Decimal::new(2050, 2));
    }

    #[test]
    fn test_cart_item_serializes_numeric_price() {
        let item = CartItem::from(&sample_product());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["price"], serde_json::json!(350.0));
    }

    #[test]
    fn test_product_image_optional_on_wire() {
        let product: Product =
            serde_json::from_str(r#"{"id":"p1","name":"Soap","price":20}"#).unwrap();
        assert!(product.image.is_empty());
    }

    #[test]
    fn test_cart_item_from_product() {
        let item = CartItem::from(&sample_product());
        assert_eq!(item.id.as_str(), "p1");
        assert_eq!(item.name, "Rose Serum");
        assert_eq!(item.image.as_deref(), Some("https://cdn.example.test/p1.png"));
    }

    #[test]
    fn test_cart_item_without_image() {
        let mut product = sample_product();
        product.image = String::new();
        assert_eq!(CartItem::from(&product).image, None);
    }

    #[test]
    fn test_cart_document_missing_items_is_empty() {
        let doc: CartDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_price_in_currency() {
        assert_eq!(sample_product().price_in(CurrencyCode::EGP).label(), "350 EGP");
    }
}
