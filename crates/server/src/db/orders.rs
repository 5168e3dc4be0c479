//! Order rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use planbe_core::order::Delivery;
use planbe_core::{Order, OrderId, Price, ProductId, UserId};

use super::RepositoryError;

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    products: Vec<ProductId>,
    total: Price,
    place: Option<String>,
    day: Option<String>,
    month: Option<String>,
    year: Option<String>,
    time_window: Option<String>,
    comments: Option<String>,
    paid: bool,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            products: row.products,
            total: row.total,
            delivery: Delivery {
                place: row.place,
                day: row.day,
                month: row.month,
                year: row.year,
                time: row.time_window,
                comments: row.comments,
                paid: row.paid,
            },
            created_at: row.created_at,
        }
    }
}

/// Load all of a user's orders, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list<'e, E>(executor: E, user: &UserId) -> Result<Vec<Order>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows: Vec<OrderRow> = sqlx::query_as(
        r"
        SELECT id, products, total, place, day, month, year, time_window, comments, paid,
               created_at
        FROM planbe.orders
        WHERE user_id = $1
        ORDER BY created_at, id
        ",
    )
    .bind(user)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Order::from).collect())
}

/// Insert a new pending order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already has a pending order.
pub async fn insert<'e, E>(executor: E, user: &UserId, order: &Order) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO planbe.orders (id, user_id, products, total, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(&order.id)
    .bind(user)
    .bind(&order.products)
    .bind(order.total)
    .bind(order.created_at)
    .execute(executor)
    .await
    .map_err(|e| RepositoryError::from_unique(e, |_| "a pending order already exists".to_owned()))?;

    Ok(())
}

/// Persist the delivery details of a finalized order.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not belong to the user.
pub async fn save_delivery<'e, E>(
    executor: E,
    user: &UserId,
    order: &Order,
) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let delivery = &order.delivery;
    let result = sqlx::query(
        r"
        UPDATE planbe.orders
        SET place = $3, day = $4, month = $5, year = $6, time_window = $7,
            comments = $8, paid = $9, finalized_at = NOW()
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(&order.id)
    .bind(user)
    .bind(&delivery.place)
    .bind(&delivery.day)
    .bind(&delivery.month)
    .bind(&delivery.year)
    .bind(&delivery.time)
    .bind(&delivery.comments)
    .bind(delivery.paid)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("order {}", order.id)));
    }
    Ok(())
}

/// Delete the given orders of a user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete<'e, E>(executor: E, user: &UserId, ids: &[OrderId]) -> Result<u64, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM planbe.orders WHERE user_id = $1 AND id = ANY($2)")
        .bind(user)
        .bind(ids)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
