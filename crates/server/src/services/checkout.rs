//! Checkout: order creation, finalization and history.
//!
//! Every write takes the user's row lock first, so concurrent checkout
//! requests for one user run one after another. Finalize writes the order and
//! clears the basket in the same transaction; the confirmation email goes out
//! only after commit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use planbe_core::order::{Delivery, discard_pending, ensure_no_pending};
use planbe_core::{
    Catalog, CoreError, DeliveryDetails, NewOrder, Order, OrderId, OrderState, Price, Product,
    Recipient, UserId, finalize,
};

use super::ShopError;
use super::catalog::CatalogService;
use super::email::{Notification, Notifier, deliver};
use crate::db::users::UserRepository;
use crate::db::{baskets, orders, users};

/// An order with its products resolved, as returned by order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub products: Vec<Product>,
    pub total: Price,
    #[serde(flatten)]
    pub delivery: Delivery,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
}

impl OrderView {
    fn resolve<C: Catalog + ?Sized>(order: Order, catalog: &C) -> Result<Self, CoreError> {
        let products = order
            .products
            .iter()
            .map(|id| {
                catalog
                    .find(id)
                    .cloned()
                    .ok_or_else(|| CoreError::NotFound(format!("product {id}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            state: order.state(),
            id: order.id,
            products,
            total: order.total,
            delivery: order.delivery,
            created_at: order.created_at,
        })
    }
}

/// Checkout service.
pub struct CheckoutService<'a, N> {
    pool: &'a PgPool,
    catalog: &'a CatalogService,
    notifier: &'a N,
}

impl<'a, N: Notifier> CheckoutService<'a, N> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, catalog: &'a CatalogService, notifier: &'a N) -> Self {
        Self {
            pool,
            catalog,
            notifier,
        }
    }

    /// Open a pending order with products and total.
    ///
    /// # Errors
    ///
    /// - `CoreError::Conflict` if the user already has a pending order.
    /// - `CoreError::Invalid` for an empty order or negative total.
    /// - `CoreError::NotFound` for an unknown user or product.
    #[instrument(skip(self, new), fields(user_id = %user, products = new.products.len()))]
    pub async fn create_order(&self, user: &UserId, new: NewOrder) -> Result<Order, ShopError> {
        let catalog = self.catalog.covering(&new.products).await?;
        new.validate(&*catalog)?;

        let mut tx = self.pool.begin().await?;
        users::lock(&mut *tx, user).await?;

        let existing = orders::list(&mut *tx, user).await?;
        ensure_no_pending(&existing)?;

        let order = Order::new(OrderId::generate(), new.products, new.total, Utc::now());
        orders::insert(&mut *tx, user, &order).await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total, "Order created");
        Ok(order)
    }

    /// Attach delivery details to the user's pending order, clear the basket
    /// and send the confirmation.
    ///
    /// # Errors
    ///
    /// - `CoreError::NotFound` if the user has no pending order.
    /// - `CoreError::Conflict` if the user has more than one pending order.
    /// - `CoreError::Invalid` if the delivery details are incomplete.
    #[instrument(skip(self, details), fields(user_id = %user))]
    pub async fn finalize(
        &self,
        user: &UserId,
        details: DeliveryDetails,
    ) -> Result<Order, ShopError> {
        let customer = UserRepository::new(self.pool)
            .get_by_id(user)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {user}")))?;

        let mut tx = self.pool.begin().await?;
        users::lock(&mut *tx, user).await?;

        let mut history = orders::list(&mut *tx, user).await?;
        let finalized = finalize(&mut history, details)?;

        let catalog = self.catalog.covering(&finalized.order.products).await?;
        let confirmation = finalized.confirmation(
            Recipient {
                name: customer.full_name(),
                email: customer.email,
            },
            &*catalog,
        )?;

        orders::save_delivery(&mut *tx, user, &finalized.order).await?;
        if finalized.clear_basket {
            let cleared = baskets::clear(&mut *tx, user).await?;
            tracing::debug!(cleared, "Basket cleared");
        }

        tx.commit().await?;

        tracing::info!(order_id = %finalized.order.id, "Order finalized");

        deliver(self.notifier, Notification::OrderConfirmed(confirmation)).await;

        Ok(finalized.order)
    }

    /// Delete every pending order of the user.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown user.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn discard_unfinished(&self, user: &UserId) -> Result<Vec<OrderId>, ShopError> {
        let mut tx = self.pool.begin().await?;
        users::lock(&mut *tx, user).await?;

        let mut history = orders::list(&mut *tx, user).await?;
        let discarded = discard_pending(&mut history);
        if !discarded.is_empty() {
            orders::delete(&mut *tx, user, &discarded).await?;
        }

        tx.commit().await?;

        tracing::info!(discarded = discarded.len(), "Unfinished orders discarded");
        Ok(discarded)
    }

    /// Order history with products resolved, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if an ordered product left the catalog.
    pub async fn list_orders(&self, user: &UserId) -> Result<Vec<OrderView>, ShopError> {
        let history = orders::list(self.pool, user).await?;
        let catalog = self
            .catalog
            .covering(history.iter().flat_map(|o| o.products.iter()))
            .await?;

        history
            .into_iter()
            .map(|order| OrderView::resolve(order, &*catalog).map_err(ShopError::from))
            .collect()
    }
}
