//! Basket bookkeeping and line-item aggregation.
//!
//! A basket stores one product id per unit added, so `["p1", "p1", "p2"]`
//! means two of `p1` and one of `p2`. [`aggregate`] turns that multiset into
//! the display list: one [`LineItem`] per distinct product, with a quantity,
//! sorted by product id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Product};
use crate::error::CoreError;
use crate::types::{Price, ProductId};

/// A user's pre-checkout basket: an ordered multiset of product ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Basket {
    items: Vec<ProductId>,
}

impl Basket {
    /// Create an empty basket.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add one unit of a product.
    pub fn push(&mut self, id: ProductId) {
        self.items.push(id);
    }

    /// Remove one unit of a product, keeping the order of the others.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the product is not in the basket.
    pub fn remove_one(&mut self, id: &ProductId) -> Result<(), CoreError> {
        let position = self
            .items
            .iter()
            .rposition(|item| item == id)
            .ok_or_else(|| CoreError::NotFound(format!("product {id} in basket")))?;
        self.items.remove(position);
        Ok(())
    }

    /// Empty the basket.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of units in the basket.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Product ids in insertion order, duplicates included.
    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.items
    }

    /// Number of units of a single product.
    #[must_use]
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        count(self.items.iter().filter(|item| *item == id))
    }
}

impl From<Vec<ProductId>> for Basket {
    fn from(items: Vec<ProductId>) -> Self {
        Self { items }
    }
}

impl FromIterator<ProductId> for Basket {
    fn from_iter<I: IntoIterator<Item = ProductId>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Display-ready basket entry: product fields plus the unit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub quantity: u32,
}

impl LineItem {
    fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            kind: product.kind.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            description: product.description.clone(),
            quantity,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Collapse a basket into one line item per distinct product.
///
/// Quantities are counted in a single pass; the output is sorted ascending
/// by product id (lexicographic), independent of insertion order.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if a basket entry has no catalog product.
/// A dangling basket entry is a data-integrity fault and is never dropped.
pub fn aggregate<C>(basket_ids: &[ProductId], catalog: &C) -> Result<Vec<LineItem>, CoreError>
where
    C: Catalog + ?Sized,
{
    let mut quantities: BTreeMap<&ProductId, u32> = BTreeMap::new();
    for id in basket_ids {
        *quantities.entry(id).or_insert(0) += 1;
    }

    quantities
        .into_iter()
        .map(|(id, quantity)| {
            catalog
                .find(id)
                .map(|product| LineItem::from_product(product, quantity))
                .ok_or_else(|| CoreError::NotFound(format!("product {id}")))
        })
        .collect()
}

/// Sum of all line totals.
#[must_use]
pub fn total(lines: &[LineItem]) -> Price {
    lines.iter().map(LineItem::line_total).sum()
}

fn count<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::fixtures::product;
    use crate::catalog::index;

    fn ids(raw: &[&str]) -> Vec<ProductId> {
        raw.iter().map(|s| ProductId::new(*s)).collect()
    }

    fn catalog() -> HashMap<ProductId, Product> {
        index([
            product("p1", "A", 150),
            product("p2", "B", 300),
            product("p3", "C", 225),
        ])
    }

    #[test]
    fn test_aggregate_empty_basket() {
        assert_eq!(aggregate(&[], &catalog()).unwrap(), Vec::new());
    }

    #[test]
    fn test_aggregate_counts_duplicates() {
        let lines = aggregate(&ids(&["p1", "p1", "p2"]), &catalog()).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].id.as_str(), "p1");
        assert_eq!(lines[0].name, "A");
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[1].id.as_str(), "p2");
        assert_eq!(lines[1].name, "B");
        assert_eq!(lines[1].quantity, 1);
    }

    #[test]
    fn test_aggregate_sorted_regardless_of_insertion_order() {
        let basket = ids(&["p3", "p1", "p2", "p3", "p1", "p3"]);
        let lines = aggregate(&basket, &catalog()).unwrap();

        let summary: Vec<(&str, u32)> = lines.iter().map(|l| (l.id.as_str(), l.quantity)).collect();
        assert_eq!(summary, [("p1", 2), ("p2", 1), ("p3", 3)]);

        let mut reversed = basket.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed, &catalog()).unwrap(), lines);
    }

    #[test]
    fn test_aggregate_matches_naive_count() {
        let basket = ids(&["p2", "p1", "p2", "p2", "p3", "p1"]);
        let lines = aggregate(&basket, &catalog()).unwrap();

        let mut distinct = basket.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(lines.len(), distinct.len());

        for line in &lines {
            let expected = basket.iter().filter(|id| **id == line.id).count();
            assert_eq!(line.quantity as usize, expected);
        }
        assert!(lines.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_aggregate_missing_product_fails() {
        let err = aggregate(&ids(&["p1", "ghost"]), &catalog()).unwrap_err();
        assert_eq!(err, CoreError::NotFound("product ghost".to_owned()));
    }

    #[test]
    fn test_aggregate_with_slice_catalog() {
        let products = vec![product("p2", "B", 300), product("p1", "A", 150)];
        let lines = aggregate(&ids(&["p2", "p1"]), products.as_slice()).unwrap();
        assert_eq!(lines[0].id.as_str(), "p1");
    }

    #[test]
    fn test_total() {
        let lines = aggregate(&ids(&["p1", "p1", "p3"]), &catalog()).unwrap();
        assert_eq!(total(&lines), Price::from_cents(525));
        assert_eq!(total(&[]), Price::ZERO);
    }

    #[test]
    fn test_remove_one_removes_single_unit() {
        let mut basket: Basket = ids(&["p1", "p2", "p1"]).into();
        basket.remove_one(&ProductId::new("p1")).unwrap();

        assert_eq!(basket.ids(), ids(&["p1", "p2"]).as_slice());
        assert_eq!(basket.quantity_of(&ProductId::new("p1")), 1);
    }

    #[test]
    fn test_remove_one_missing_product() {
        let mut basket: Basket = ids(&["p1"]).into();
        let err = basket.remove_one(&ProductId::new("p2")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(basket.len(), 1);
    }

    #[test]
    fn test_push_and_clear() {
        let mut basket = Basket::new();
        basket.push(ProductId::new("p1"));
        basket.push(ProductId::new("p1"));
        assert_eq!(basket.quantity_of(&ProductId::new("p1")), 2);

        basket.clear();
        assert!(basket.is_empty());
    }
}
