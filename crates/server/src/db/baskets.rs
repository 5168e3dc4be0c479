//! Basket rows: one per unit added, ordered by insertion.

use planbe_core::{Basket, ProductId, UserId};

use super::RepositoryError;

/// Load a user's basket in insertion order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn load<'e, E>(executor: E, user: &UserId) -> Result<Basket, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let ids: Vec<ProductId> = sqlx::query_scalar(
        "SELECT product_id FROM planbe.basket_items WHERE user_id = $1 ORDER BY id",
    )
    .bind(user)
    .fetch_all(executor)
    .await?;

    Ok(Basket::from(ids))
}

/// Append one unit of a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn push<'e, E>(executor: E, user: &UserId, product: &ProductId) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("INSERT INTO planbe.basket_items (user_id, product_id) VALUES ($1, $2)")
        .bind(user)
        .bind(product)
        .execute(executor)
        .await?;
    Ok(())
}

/// Delete the most recently added unit of a product.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the basket holds no such product.
pub async fn remove_one<'e, E>(
    executor: E,
    user: &UserId,
    product: &ProductId,
) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r"
        DELETE FROM planbe.basket_items
        WHERE id = (
            SELECT id FROM planbe.basket_items
            WHERE user_id = $1 AND product_id = $2
            ORDER BY id DESC
            LIMIT 1
        )
        ",
    )
    .bind(user)
    .bind(product)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("product {product} in basket")));
    }
    Ok(())
}

/// Empty a user's basket, returning the number of units removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear<'e, E>(executor: E, user: &UserId) -> Result<u64, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM planbe.basket_items WHERE user_id = $1")
        .bind(user)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
