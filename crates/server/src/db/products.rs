//! Product catalog queries.

use sqlx::{FromRow, PgPool};

use planbe_core::{Price, Product, ProductId};

use super::RepositoryError;

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    kind: String,
    name: String,
    price: Price,
    image: String,
    description: String,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            name: row.name,
            price: row.price,
            image: row.image,
            description: row.description,
        }
    }
}

/// Load the whole catalog, ordered by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<Product>, RepositoryError> {
    let rows: Vec<ProductRow> = sqlx::query_as(
        "SELECT id, kind, name, price, image, description FROM planbe.products ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Product::from).collect())
}

/// Insert or replace a catalog entry.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert(pool: &PgPool, product: &Product) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO planbe.products (id, kind, name, price, image, description)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET kind = EXCLUDED.kind, name = EXCLUDED.name, price = EXCLUDED.price,
            image = EXCLUDED.image, description = EXCLUDED.description
        ",
    )
    .bind(&product.id)
    .bind(&product.kind)
    .bind(&product.name)
    .bind(product.price)
    .bind(&product.image)
    .bind(&product.description)
    .execute(pool)
    .await?;

    Ok(())
}
