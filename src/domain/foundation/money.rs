//! Integer-rupee currency helpers.
//!
//! All prices on the wire and in state are whole rupees. Curve and
//! reciprocity math runs in f64 and is rounded back here.

/// Whole rupees.
pub type Rupees = i64;

/// Rounds half-up to whole rupees.
pub fn round_rupees(value: f64) -> Rupees {
    (value + 0.5).floor() as Rupees
}

/// Rounds up to whole rupees. Used for the floor price so rounding can
/// never push a price below the minimum margin.
pub fn ceil_rupees(value: f64) -> Rupees {
    value.ceil() as Rupees
}

/// Clamps a price into [lo, hi].
pub fn clamp_rupees(value: Rupees, lo: Rupees, hi: Rupees) -> Rupees {
    value.max(lo).min(hi)
}
