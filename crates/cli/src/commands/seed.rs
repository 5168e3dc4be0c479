//! Seed the product catalog from YAML.
//!
//! The file holds a `products` list; each entry is upserted by id, so running
//! the command again updates names, prices and descriptions in place.
//!
//! ```yaml
//! products:
//!   - id: p01
//!     type: pastry
//!     name: Croissant
//!     price: "1.80"
//!     image: /img/croissant.jpg
//!     description: Butter croissant, baked every morning
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use planbe_core::Product;
use planbe_server::db;

/// Top-level layout of the seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<Product>,
}

/// Check a catalog before touching the database.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for product in &catalog.products {
        let id = product.id.as_str();
        if id.trim().is_empty() {
            errors.push("product with blank id".to_string());
            continue;
        }
        if !seen.insert(id) {
            errors.push(format!("{id}: duplicate id"));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("{id}: blank name"));
        }
        if product.kind.trim().is_empty() {
            errors.push(format!("{id}: blank type"));
        }
        if product.price.is_negative() {
            errors.push(format!("{id}: negative price"));
        }
    }

    errors
}

/// Upsert every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, validation fails,
/// or a database write fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    info!(products = catalog.products.len(), "Parsed catalog");

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    for product in &catalog.products {
        db::products::upsert(&pool, product).await?;
    }

    info!("Seeding complete! Products upserted: {}", catalog.products.len());
    Ok(())
}
