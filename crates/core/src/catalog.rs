//! Catalog products and the lookup trait used by aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// A read-only catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Product category as shown to customers (e.g. "drink", "pastry").
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub price: Price,
    /// Image URL or asset path.
    pub image: String,
    pub description: String,
}

/// Lookup of full product data by identifier.
///
/// Implemented for in-memory maps and slices so callers can load the catalog
/// once per request (or from a cache) and hand it to [`crate::aggregate`].
pub trait Catalog {
    /// Find a product by id, or `None` when the catalog has no such entry.
    fn find(&self, id: &ProductId) -> Option<&Product>;
}

impl Catalog for HashMap<ProductId, Product> {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        self.get(id)
    }
}

impl Catalog for [Product] {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        self.iter().find(|p| &p.id == id)
    }
}

impl Catalog for Vec<Product> {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        self.as_slice().find(id)
    }
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        (**self).find(id)
    }
}

impl<C: Catalog + ?Sized> Catalog for std::sync::Arc<C> {
    fn find(&self, id: &ProductId) -> Option<&Product> {
        (**self).find(id)
    }
}

/// Index a list of products by id.
#[must_use]
pub fn index(products: impl IntoIterator<Item = Product>) -> HashMap<ProductId, Product> {
    products.into_iter().map(|p| (p.id.clone(), p)).collect()
}
