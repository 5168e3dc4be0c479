//! Order routes: finalize, discard and history.

use axum::extract::{Path, State};
use serde::Serialize;

use planbe_core::{DeliveryDetails, Order, OrderId, UserId};

use super::{ApiJson, Data};
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::checkout::{CheckoutService, OrderView};
use crate::state::AppState;

/// Ids of the orders a discard removed.
#[derive(Debug, Serialize)]
pub struct Discarded {
    pub discarded: Vec<OrderId>,
}

/// Attach delivery details to the pending order and clear the basket.
pub async fn finalize(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    ApiJson(details): ApiJson<DeliveryDetails>,
) -> Result<Data<Order>> {
    auth.ensure_owner(&id)?;

    let order = CheckoutService::new(state.pool(), state.catalog(), state.email())
        .finalize(&id, details)
        .await?;

    add_breadcrumb("checkout", "Order finalized", Some(&[("order_id", order.id.as_str())]));

    Ok(Data::new(order))
}

/// Delete every pending order of the user.
pub async fn discard_unfinished(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Data<Discarded>> {
    auth.ensure_owner(&id)?;

    let discarded = CheckoutService::new(state.pool(), state.catalog(), state.email())
        .discard_unfinished(&id)
        .await?;

    Ok(Data::new(Discarded { discarded }))
}

/// Order history with products resolved.
pub async fn list(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Data<Vec<OrderView>>> {
    auth.ensure_owner(&id)?;

    let orders = CheckoutService::new(state.pool(), state.catalog(), state.email())
        .list_orders(&id)
        .await?;

    Ok(Data::new(orders))
}
