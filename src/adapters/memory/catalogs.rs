//! In-memory product and coupon catalogs for tests and seeding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::catalog::Product;
use crate::domain::coupon::Coupon;
use crate::domain::foundation::{DomainError, ProductId};
use crate::ports::{CouponCatalog, ProductCatalog};

/// In-memory implementation of [`ProductCatalog`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the catalog, replacing existing entries.
    pub async fn seed(&self, products: Vec<Product>) {
        let mut map = self.products.write().await;
        for p in products {
            map.insert(p.id.clone(), p);
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn upsert(&self, product: &Product) -> Result<(), DomainError> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Product>, DomainError> {
        let map = self.products.read().await;
        let mut all: Vec<Product> = map.values().cloned().collect();
        all.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

/// In-memory ordered coupon catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponCatalog {
    coupons: Arc<RwLock<Vec<Coupon>>>,
}

impl InMemoryCouponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the coupon list. Order is priority order.
    pub async fn seed(&self, coupons: Vec<Coupon>) {
        *self.coupons.write().await = coupons;
    }
}

#[async_trait]
impl CouponCatalog for InMemoryCouponCatalog {
    async fn active_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        Ok(self
            .coupons
            .read()
            .await
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect())
    }
}
