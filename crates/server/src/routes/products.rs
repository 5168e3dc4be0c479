//! Catalog routes.

use axum::extract::State;

use planbe_core::Product;

use super::Data;
use crate::error::Result;
use crate::state::AppState;

/// All products, ordered by id. Public.
pub async fn list(State(state): State<AppState>) -> Result<Data<Vec<Product>>> {
    let products = state.catalog().list().await?;
    Ok(Data::new(products))
}
