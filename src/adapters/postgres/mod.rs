//! PostgreSQL adapters - the production durable tier.

mod durable_store;
mod product_catalog;

pub use durable_store::PgDurableStore;
pub use product_catalog::PgProductCatalog;
