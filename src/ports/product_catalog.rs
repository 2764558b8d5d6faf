//! Product catalog port. Read-only to the negotiation core; writes come
//! from the admin surface.

use async_trait::async_trait;

use crate::domain::catalog::Product;
use crate::domain::foundation::{DomainError, ProductId};

/// Catalog of negotiable products.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Fetches a single product.
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, DomainError>;

    /// Inserts or replaces a product (admin surface only).
    async fn upsert(&self, product: &Product) -> Result<(), DomainError>;

    /// Lists products, newest first.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>, DomainError>;
}
