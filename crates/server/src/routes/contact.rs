//! Contact form route.

use axum::extract::{Path, State};

use planbe_core::UserId;

use super::{ApiJson, Data};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::contact::{self, ContactMessage};
use crate::state::AppState;

/// Send a message to the shop inbox on behalf of the logged-in user.
pub async fn send(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    ApiJson(form): ApiJson<ContactMessage>,
) -> Result<Data<()>> {
    auth.ensure_owner(&id)?;

    contact::send(state.pool(), state.email(), &id, form).await?;

    Ok(Data::new(()))
}
