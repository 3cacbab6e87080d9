//! Mathematical utilities: least squares and numeric tolerances.

pub mod ols;

pub use ols::*;

/// Relative size below which a centered sum of squares counts as zero.
const SPREAD_REL_TOL: f64 = 1e-12;

/// `true` when a centered sum of squares `ss` is indistinguishable from zero
/// relative to the raw sum of squares `raw_ss` of the same values.
///
/// Series rebuilt from prices (e.g. a constant 1% daily return) carry
/// rounding noise, so an exact `== 0.0` test is not enough.
pub fn negligible_spread(ss: f64, raw_ss: f64) -> bool {
    !(ss > SPREAD_REL_TOL * raw_ss.max(f64::MIN_POSITIVE))
}
