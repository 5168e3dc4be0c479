//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an order.
///
/// The only transition is `Pending -> Finalized`, performed by
/// [`crate::order::finalize`]. The state is derived from the delivery fields,
/// never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Created at checkout-start, awaiting delivery details.
    #[default]
    Pending,
    /// Delivery place, time window and payment are recorded.
    Finalized,
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}
