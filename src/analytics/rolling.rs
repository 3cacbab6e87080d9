//! Trailing-window statistics.
//!
//! Output series are aligned with their input: entry `t` covers rows
//! `t+1-W ..= t`, and the first `W-1` entries are `None`. A window whose
//! statistic is mathematically undefined (zero variance for a correlation)
//! is also `None` rather than a fabricated number.

use crate::error::StatError;
use crate::math::negligible_spread;

/// Rolling sample standard deviation (n-1 denominator) scaled by `sqrt(F)`.
pub fn rolling_volatility(values: &[f64], window: usize, annualization: f64) -> Vec<Option<f64>> {
    let scale = annualization.sqrt();
    rolling(values.len(), window, |lo, hi| {
        let w = &values[lo..hi];
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let vol = var.max(0.0).sqrt() * scale;
        vol.is_finite().then_some(vol)
    })
}

/// Rolling Pearson correlation of two aligned series.
pub fn rolling_correlation(x: &[f64], y: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    rolling(n, window, |lo, hi| pearson(&x[lo..hi], &y[lo..hi]))
}

/// Pearson correlation; `None` when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut raw_xx = 0.0;
    let mut raw_yy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
        raw_xx += a * a;
        raw_yy += b * b;
    }

    if negligible_spread(sxx, raw_xx) || negligible_spread(syy, raw_yy) {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Last defined entry of a rolling series, scanning from the end.
pub fn latest_valid(series: &[Option<f64>], window: usize) -> Result<f64, StatError> {
    series
        .iter()
        .rev()
        .find_map(|v| *v)
        .ok_or(StatError::UnavailableStatistic { window })
}

fn rolling(n: usize, window: usize, stat: impl Fn(usize, usize) -> Option<f64>) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..n)
        .map(|t| {
            if t + 1 < window {
                None
            } else {
                stat(t + 1 - window, t + 1)
            }
        })
        .collect()
}
