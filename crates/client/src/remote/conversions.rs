//! Mapping between the document store's wire format and domain types.
//!
//! Documents travel as `{ "id": "...", "data": { ... } }`; lists as
//! `{ "documents": [ ... ] }`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopnow_core::{CartDocument, Product, ProductId, ProductPage};

use super::RemoteError;

/// A stored document with its key.
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub id: String,
    pub data: T,
}

/// A list of documents in collection order.
#[derive(Debug, Deserialize)]
pub struct DocumentList<T> {
    #[serde(default = "Vec::new")]
    pub documents: Vec<Document<T>>,
}

/// Body of a document write.
#[derive(Debug, Serialize)]
pub struct WriteDocument<'a, T> {
    pub data: &'a T,
}

/// Fields of a catalog product document.
#[derive(Debug, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
}

pub fn convert_product(document: Document<ProductFields>) -> Result<Product, RemoteError> {
    let id = ProductId::parse(document.id.clone()).map_err(|e| RemoteError::InvalidDocument {
        id: document.id,
        reason: e.to_string(),
    })?;

    Ok(Product {
        id,
        name: document.data.name,
        price: document.data.price,
        image: document.data.image,
    })
}

pub fn convert_product_page(list: DocumentList<ProductFields>) -> Result<ProductPage, RemoteError> {
    let products = list
        .documents
        .into_iter()
        .map(convert_product)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ProductPage::new(products))
}

pub fn convert_cart(document: Document<CartDocument>) -> CartDocument {
    document.data
}
