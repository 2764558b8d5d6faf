//! Invisible coupon application.
//!
//! At most one coupon per session, only inside concession-style tactics,
//! and never below the floor. The buyer sees a lower price, not a code.

use std::sync::Arc;

use crate::domain::coupon::AppliedCoupon;
use crate::domain::foundation::Rupees;
use crate::domain::negotiation::{NegotiationSession, Tactic};
use crate::ports::CouponCatalog;

/// Applies invisible promotions as an extra concession lever.
pub struct CouponService {
    catalog: Arc<dyn CouponCatalog>,
}

impl CouponService {
    /// Creates the service over a coupon catalog.
    pub fn new(catalog: Arc<dyn CouponCatalog>) -> Self {
        Self { catalog }
    }

    /// Finds the coupon to fold into this turn's counter, if any.
    ///
    /// The catalog is ordered; the first coupon whose predicates hold and
    /// whose discount keeps the counter at or above the floor wins.
    pub async fn apply(
        &self,
        session: &NegotiationSession,
        tactic: Tactic,
        counter_price: Rupees,
    ) -> Option<AppliedCoupon> {
        if !tactic.allows_coupon() {
            return None;
        }
        if !session.coupons_applied.is_empty() {
            return None;
        }

        let coupons = match self.catalog.active_coupons().await {
            Ok(coupons) => coupons,
            Err(e) => {
                // Coupons are an optimisation; a catalog outage never
                // touches the negotiation.
                tracing::warn!(error = %e, "coupon catalog unavailable, skipping");
                return None;
            }
        };

        for coupon in coupons {
            if !coupon.applies(&session.product_category, counter_price, session.round) {
                continue;
            }
            let price_after = counter_price - coupon.discount;
            if price_after < session.floor_price {
                continue;
            }
            tracing::info!(
                coupon_id = %coupon.id,
                discount = coupon.discount,
                "applying invisible coupon"
            );
            return Some(AppliedCoupon {
                coupon_id: coupon.id,
                discount: coupon.discount,
                price_after,
            });
        }
        None
    }
}
