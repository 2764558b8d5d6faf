//! Invisible coupons.
//!
//! Promotions the dialogue frames as personal favours. The coupon code
//! never reaches the buyer; only the price moves.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Rupees;

/// A backend promotion that can be folded into a concession.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    /// Redemption code, server-side only.
    pub code: String,
    /// Restrict to a product category; `None` is store-wide.
    #[serde(default)]
    pub category: Option<String>,
    /// Minimum counter price for the coupon to apply.
    #[serde(default)]
    pub min_cart_value: Option<Rupees>,
    /// Earliest round the coupon may fire in.
    #[serde(default)]
    pub min_round: u32,
    /// Flat discount in rupees.
    pub discount: Rupees,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Coupon {
    /// Whether this coupon's predicates hold for the given turn.
    pub fn applies(&self, category: &str, counter_price: Rupees, round: u32) -> bool {
        if !self.active || self.discount <= 0 {
            return false;
        }
        if let Some(ref c) = self.category {
            if c != category {
                return false;
            }
        }
        if let Some(min) = self.min_cart_value {
            if counter_price < min {
                return false;
            }
        }
        round >= self.min_round
    }
}

/// A coupon folded into a counter this turn. Only the id and the price
/// movement are recorded; the code stays server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub coupon_id: String,
    pub discount: Rupees,
    pub price_after: Rupees,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon() -> Coupon {
        Coupon {
            id: "diwali-10".into(),
            code: "DIWALI10".into(),
            category: Some("apparel".into()),
            min_cart_value: Some(5000),
            min_round: 3,
            discount: 200,
            active: true,
        }
    }

    #[test]
    fn applies_when_all_predicates_hold() {
        assert!(coupon().applies("apparel", 9000, 3));
    }

    #[test]
    fn category_mismatch_rejects() {
        assert!(!coupon().applies("footwear", 9000, 3));
    }

    #[test]
    fn store_wide_coupon_ignores_category() {
        let mut c = coupon();
        c.category = None;
        assert!(c.applies("footwear", 9000, 3));
    }

    #[test]
    fn cart_value_and_round_gates() {
        assert!(!coupon().applies("apparel", 4999, 3));
        assert!(!coupon().applies("apparel", 9000, 2));
    }

    #[test]
    fn inactive_or_worthless_coupons_never_apply() {
        let mut c = coupon();
        c.active = false;
        assert!(!c.applies("apparel", 9000, 3));

        let mut c = coupon();
        c.discount = 0;
        assert!(!c.applies("apparel", 9000, 3));
    }
}
