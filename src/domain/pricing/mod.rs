//! Deterministic pricing: concession curve, reciprocity, validation gate.

mod curve;
mod reciprocity;
mod validator;

pub use curve::{reservation_price, within_zopa, zopa_epsilon};
pub use reciprocity::{ConcessionTrend, ReciprocityTracker};
pub use validator::{validate_price, PriceBounds, ValidatedPrice};
