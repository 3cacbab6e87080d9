//! Growth-of-$1 curves and drawdown.

/// `Π (1 + r_s)` for `s <= t`.
pub fn cumulative_growth(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// `growth[t] / max(growth[..=t]) - 1`, using a single left-to-right running max.
pub fn drawdown(growth: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    growth
        .iter()
        .map(|&g| {
            peak = peak.max(g);
            if peak > 0.0 { (g / peak - 1.0).min(0.0) } else { 0.0 }
        })
        .collect()
}

/// Total return over the window (`growth[last] - 1`); `0` for an empty series.
pub fn total_return(growth: &[f64]) -> f64 {
    growth.last().map(|g| g - 1.0).unwrap_or(0.0)
}

/// Largest decline from a running peak (most negative drawdown).
pub fn max_drawdown(drawdown: &[f64]) -> f64 {
    drawdown.iter().copied().fold(0.0, f64::min)
}
