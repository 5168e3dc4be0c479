//! Basket routes and order creation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use planbe_core::{NewOrder, Order, ProductId, UserId};

use super::{ApiJson, Data};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::basket::{BasketService, BasketView};
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

/// The aggregated basket.
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Data<BasketView>> {
    auth.ensure_owner(&id)?;

    let basket = BasketService::new(state.pool(), state.catalog())
        .list(&id)
        .await?;

    Ok(Data::new(basket))
}

/// Add a product to the basket.
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((id, product_id)): Path<(UserId, ProductId)>,
) -> Result<Data<BasketView>> {
    auth.ensure_owner(&id)?;

    let basket = BasketService::new(state.pool(), state.catalog());
    basket.add(&id, &product_id).await?;

    Ok(Data::new(basket.list(&id).await?))
}

/// Add one more unit of a product already in the basket.
pub async fn add_more(
    state: State<AppState>,
    auth: RequireAuth,
    path: Path<(UserId, ProductId)>,
) -> Result<Data<BasketView>> {
    add(state, auth, path).await
}

/// Remove one unit of a product from the session user's basket.
pub async fn remove_one(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Data<BasketView>> {
    let basket = BasketService::new(state.pool(), state.catalog());
    basket.remove_one(auth.id(), &product_id).await?;

    Ok(Data::new(basket.list(auth.id()).await?))
}

/// Open a pending order with the given products and total.
pub async fn create_order(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    ApiJson(new): ApiJson<NewOrder>,
) -> Result<(StatusCode, Data<Order>)> {
    auth.ensure_owner(&id)?;

    let order = CheckoutService::new(state.pool(), state.catalog(), state.email())
        .create_order(&id, new)
        .await?;

    Ok((StatusCode::CREATED, Data::new(order)))
}
