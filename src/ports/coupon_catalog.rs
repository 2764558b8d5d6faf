//! Coupon catalog port.

use async_trait::async_trait;

use crate::domain::coupon::Coupon;
use crate::domain::foundation::DomainError;

/// Ordered catalog of invisible promotions. Order matters: the first
/// applicable coupon wins.
#[async_trait]
pub trait CouponCatalog: Send + Sync {
    /// Active coupons in priority order.
    async fn active_coupons(&self) -> Result<Vec<Coupon>, DomainError>;
}
