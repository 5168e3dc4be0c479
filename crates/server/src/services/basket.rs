//! Basket operations.

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use planbe_core::basket::total;
use planbe_core::{CoreError, LineItem, Price, ProductId, UserId, aggregate};

use super::ShopError;
use super::catalog::CatalogService;
use crate::db::{baskets, users};

/// A user's basket as shown to the client.
#[derive(Debug, Clone, Serialize)]
pub struct BasketView {
    pub items: Vec<LineItem>,
    pub total: Price,
}

/// Basket service.
pub struct BasketService<'a> {
    pool: &'a PgPool,
    catalog: &'a CatalogService,
}

impl<'a> BasketService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, catalog: &'a CatalogService) -> Self {
        Self { pool, catalog }
    }

    /// Add one unit of a product. Adding "one more" of a line is the same call.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown user or product.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    pub async fn add(&self, user: &UserId, product: &ProductId) -> Result<(), ShopError> {
        if self.catalog.get(product).await?.is_none() {
            return Err(CoreError::NotFound(format!("product {product}")).into());
        }

        let mut tx = self.pool.begin().await?;
        users::lock(&mut *tx, user).await?;
        baskets::push(&mut *tx, user, product).await?;
        tx.commit().await?;

        Ok(())
    }

    /// The aggregated basket: one line per distinct product, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if a basket entry has no catalog product.
    pub async fn list(&self, user: &UserId) -> Result<BasketView, ShopError> {
        let basket = baskets::load(self.pool, user).await?;
        let catalog = self.catalog.covering(basket.ids()).await?;
        let items = aggregate(basket.ids(), &*catalog)?;
        let total = total(&items);

        Ok(BasketView { items, total })
    }

    /// Remove one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if the basket holds no such product.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    pub async fn remove_one(&self, user: &UserId, product: &ProductId) -> Result<(), ShopError> {
        let mut tx = self.pool.begin().await?;
        users::lock(&mut *tx, user).await?;

        let mut basket = baskets::load(&mut *tx, user).await?;
        basket.remove_one(product)?;
        baskets::remove_one(&mut *tx, user, product).await?;

        tx.commit().await?;
        Ok(())
    }
}
