//! Product catalog with an in-memory cache.
//!
//! The catalog is small and read-mostly, so the whole table is cached as one
//! id-indexed snapshot via `moka` (5-minute TTL). A lookup that misses the
//! snapshot reloads it once before giving up, so newly seeded products show
//! up without waiting for the TTL. Miss-triggered reloads are throttled to one
//! per [`MISS_RELOAD_COOLDOWN`], so unknown ids cannot force a table scan per
//! request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use planbe_core::catalog::index;
use planbe_core::{Product, ProductId};

use crate::db::{RepositoryError, products};

/// Id-indexed view of the whole catalog.
pub type Snapshot = Arc<HashMap<ProductId, Product>>;

const SNAPSHOT_KEY: &str = "catalog";

/// Minimum time between reloads caused by a lookup miss.
pub const MISS_RELOAD_COOLDOWN: Duration = Duration::from_secs(5);

/// Cached access to the product catalog.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    pool: PgPool,
    cache: Cache<&'static str, Snapshot>,
    /// Holds `SNAPSHOT_KEY` while a miss-triggered reload is cooling down.
    miss_reloads: Cache<&'static str, ()>,
}

impl CatalogService {
    /// Create a catalog service backed by `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        let miss_reloads = Cache::builder()
            .max_capacity(1)
            .time_to_live(MISS_RELOAD_COOLDOWN)
            .build();

        Self {
            inner: Arc::new(CatalogServiceInner {
                pool,
                cache,
                miss_reloads,
            }),
        }
    }

    /// Current catalog snapshot, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog cannot be loaded.
    pub async fn snapshot(&self) -> Result<Snapshot, RepositoryError> {
        if let Some(snapshot) = self.inner.cache.get(SNAPSHOT_KEY).await {
            debug!("Cache hit for catalog");
            return Ok(snapshot);
        }
        self.reload().await
    }

    /// Reload the catalog from the database and replace the cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog cannot be loaded.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<Snapshot, RepositoryError> {
        let snapshot: Snapshot = Arc::new(index(products::list(&self.inner.pool).await?));
        debug!(products = snapshot.len(), "Catalog loaded");

        self.inner
            .cache
            .insert(SNAPSHOT_KEY, Arc::clone(&snapshot))
            .await;

        Ok(snapshot)
    }

    /// A snapshot that contains every id in `ids`, if the database has them.
    ///
    /// Ids still missing after one reload, or while a previous miss-triggered
    /// reload is cooling down, are left for the caller to report.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog cannot be loaded.
    pub async fn covering<'a, I>(&self, ids: I) -> Result<Snapshot, RepositoryError>
    where
        I: IntoIterator<Item = &'a ProductId>,
    {
        let snapshot = self.snapshot().await?;
        if ids.into_iter().all(|id| snapshot.contains_key(id)) {
            return Ok(snapshot);
        }
        if self.inner.miss_reloads.contains_key(SNAPSHOT_KEY) {
            debug!("Catalog miss within reload cooldown");
            return Ok(snapshot);
        }
        self.inner.miss_reloads.insert(SNAPSHOT_KEY, ()).await;
        self.reload().await
    }

    /// All products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog cannot be loaded.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let snapshot = self.snapshot().await?;
        Ok(sorted(&snapshot))
    }

    /// Look up a single product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the catalog cannot be loaded.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let snapshot = self.covering([id]).await?;
        Ok(snapshot.get(id).cloned())
    }
}

fn sorted(snapshot: &HashMap<ProductId, Product>) -> Vec<Product> {
    let mut products: Vec<Product> = snapshot.values().cloned().collect();
    products.sort_by(|a, b| a.id.cmp(&b.id));
    products
}
