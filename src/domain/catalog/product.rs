//! Product catalog entries and the derived negotiation range.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{ceil_rupees, ProductId, Rupees, ValidationError};

/// A negotiable catalog item.
///
/// `anchor_price` is the listed sticker price and the seller's opening
/// offer. The floor price is derived from cost and minimum margin and is
/// never serialised into buyer-facing responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub anchor_price: Rupees,
    pub cost_price: Rupees,
    pub min_margin: f64,
    pub target_margin: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Product {
    /// Creates a validated product.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        anchor_price: Rupees,
        cost_price: Rupees,
        min_margin: f64,
        target_margin: f64,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if anchor_price <= 0 {
            return Err(ValidationError::out_of_range(
                "anchor_price",
                1.0,
                f64::MAX,
                anchor_price as f64,
            ));
        }
        if cost_price <= 0 || cost_price >= anchor_price {
            return Err(ValidationError::invalid_format(
                "cost_price",
                "must be positive and below anchor_price",
            ));
        }
        if !(0.0..1.0).contains(&min_margin) {
            return Err(ValidationError::out_of_range(
                "min_margin",
                0.0,
                1.0,
                min_margin,
            ));
        }
        if target_margin < min_margin || target_margin >= 1.0 {
            return Err(ValidationError::invalid_format(
                "target_margin",
                "must satisfy min_margin <= target_margin < 1",
            ));
        }

        let product = Self {
            id,
            name,
            category: category.into(),
            anchor_price,
            cost_price,
            min_margin,
            target_margin,
            metadata,
        };

        if product.floor_price() > product.anchor_price {
            return Err(ValidationError::invalid_format(
                "min_margin",
                "floor price exceeds anchor price",
            ));
        }
        if product.target_price() > product.anchor_price {
            return Err(ValidationError::invalid_format(
                "target_margin",
                "target price exceeds anchor price",
            ));
        }

        Ok(product)
    }

    /// Floor price: cost * (1 + min_margin), rounded up. Never sell below this.
    pub fn floor_price(&self) -> Rupees {
        ceil_rupees(self.cost_price as f64 * (1.0 + self.min_margin))
    }

    /// Ideal selling price: cost * (1 + target_margin), rounded up.
    pub fn target_price(&self) -> Rupees {
        ceil_rupees(self.cost_price as f64 * (1.0 + self.target_margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product::new(
            ProductId::new("sku-1").unwrap(),
            "Banarasi saree",
            "apparel",
            12999,
            9000,
            0.05,
            0.30,
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn floor_and_target_derive_from_cost() {
        let p = sample();
        assert_eq!(p.floor_price(), 9450);
        assert_eq!(p.target_price(), 11700);
    }

    #[test]
    fn floor_rounds_up() {
        let p = Product::new(
            ProductId::new("sku-2").unwrap(),
            "Brass diya",
            "decor",
            500,
            100,
            0.333,
            0.5,
            HashMap::new(),
        )
        .unwrap();
        // 100 * 1.333 = 133.3 -> 134
        assert_eq!(p.floor_price(), 134);
    }

    #[test]
    fn invariant_floor_lte_target_lte_anchor() {
        let p = sample();
        assert!(p.floor_price() <= p.target_price());
        assert!(p.target_price() <= p.anchor_price);
    }

    #[test]
    fn rejects_cost_at_or_above_anchor() {
        assert!(Product::new(
            ProductId::new("sku-3").unwrap(),
            "x",
            "",
            100,
            100,
            0.0,
            0.1,
            HashMap::new(),
        )
        .is_err());
    }

    #[test]
    fn rejects_target_below_min_margin() {
        assert!(Product::new(
            ProductId::new("sku-4").unwrap(),
            "x",
            "",
            1000,
            500,
            0.3,
            0.1,
            HashMap::new(),
        )
        .is_err());
    }

    #[test]
    fn rejects_margin_pushing_floor_past_anchor() {
        assert!(Product::new(
            ProductId::new("sku-5").unwrap(),
            "x",
            "",
            1000,
            900,
            0.5,
            0.6,
            HashMap::new(),
        )
        .is_err());
    }

    #[test]
    fn rejects_blank_name() {
        assert!(Product::new(
            ProductId::new("sku-6").unwrap(),
            "  ",
            "",
            1000,
            500,
            0.05,
            0.3,
            HashMap::new(),
        )
        .is_err());
    }
}
