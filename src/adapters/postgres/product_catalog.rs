//! PostgreSQL product catalog.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId};
use crate::ports::ProductCatalog;

/// PostgreSQL implementation of [`ProductCatalog`].
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    /// Creates the catalog over an established pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the products table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id            TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                category      TEXT NOT NULL DEFAULT '',
                anchor_price  BIGINT NOT NULL,
                cost_price    BIGINT NOT NULL,
                min_margin    DOUBLE PRECISION NOT NULL,
                target_margin DOUBLE PRECISION NOT NULL,
                metadata      JSONB NOT NULL DEFAULT '{}',
                created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    fn row_to_product(row: &sqlx::postgres::PgRow) -> Result<Product, DomainError> {
        let id: String = row.try_get("id").map_err(db_error)?;
        let name: String = row.try_get("name").map_err(db_error)?;
        let category: String = row.try_get("category").map_err(db_error)?;
        let anchor_price: i64 = row.try_get("anchor_price").map_err(db_error)?;
        let cost_price: i64 = row.try_get("cost_price").map_err(db_error)?;
        let min_margin: f64 = row.try_get("min_margin").map_err(db_error)?;
        let target_margin: f64 = row.try_get("target_margin").map_err(db_error)?;
        let metadata: serde_json::Value = row.try_get("metadata").map_err(db_error)?;

        let metadata: HashMap<String, serde_json::Value> = match metadata {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        Product::new(
            ProductId::new(id).map_err(|e| DomainError::internal(e.to_string()))?,
            name,
            category,
            anchor_price,
            cost_price,
            min_margin,
            target_margin,
            metadata,
        )
        .map_err(|e| DomainError::internal(format!("corrupt product row: {}", e)))
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::degraded(format!("durable store error: {}", e))
}

#[async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, anchor_price, cost_price,
                   min_margin, target_margin, metadata
            FROM products WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn upsert(&self, product: &Product) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, anchor_price, cost_price,
                min_margin, target_margin, metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                anchor_price = EXCLUDED.anchor_price,
                cost_price = EXCLUDED.cost_price,
                min_margin = EXCLUDED.min_margin,
                target_margin = EXCLUDED.target_margin,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.anchor_price)
        .bind(product.cost_price)
        .bind(product.min_margin)
        .bind(product.target_margin)
        .bind(serde_json::Value::Object(
            product.metadata.clone().into_iter().collect(),
        ))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, anchor_price, cost_price,
                   min_margin, target_margin, metadata
            FROM products
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(Self::row_to_product).collect()
    }
}

impl std::fmt::Debug for PgProductCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgProductCatalog").finish_non_exhaustive()
    }
}
