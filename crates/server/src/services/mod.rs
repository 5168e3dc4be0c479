//! Business services.
//!
//! Services own transactions and call into `planbe_core` for the rules.
//! Handlers construct them per request from [`crate::state::AppState`].

pub mod auth;
pub mod basket;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod email;

use thiserror::Error;

use planbe_core::CoreError;

use crate::db::RepositoryError;
use email::EmailError;

/// Errors from basket, checkout and contact operations.
///
/// Repository `NotFound`/`Conflict` are folded into [`CoreError`] so callers
/// see one set of domain error kinds.
#[derive(Debug, Error)]
pub enum ShopError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failed.
    #[error(transparent)]
    Repository(RepositoryError),

    /// A message the caller is waiting on could not be sent.
    #[error(transparent)]
    Email(#[from] EmailError),
}

impl From<RepositoryError> for ShopError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::Core(CoreError::NotFound(what)),
            RepositoryError::Conflict(what) => Self::Core(CoreError::Conflict(what)),
            other => Self::Repository(other),
        }
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
