//! Synthetic price generation for offline runs.
//!
//! Every symbol follows a geometric random walk driven by two shared factors
//! (broad market and an "AI" theme) plus its own idiosyncratic noise, so the
//! dashboard shows realistic correlation and beta without network access.
//! Output is deterministic for a given seed, end date and symbol set.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, Days, NaiveDate, Utc, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Span, Symbol};
use crate::error::FetchError;

use super::{FIELD_CLOSE, PriceSource, RawPriceFrame};

/// Daily volatility of the market factor.
const MARKET_VOL: f64 = 0.011;
/// Daily volatility of the AI theme factor.
const THEME_VOL: f64 = 0.014;

pub struct SyntheticSource {
    seed: u64,
    end: NaiveDate,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            end: Utc::now().date_naive(),
        }
    }

    /// Pin the last generated date (useful for reproducible exports).
    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = end;
        self
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "Synthetic random walk"
    }

    fn fetch(&self, symbols: &[Symbol], span: Span) -> Result<RawPriceFrame, FetchError> {
        let dates = business_days(span.start_date(self.end), self.end);
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| FetchError::Invalid(format!("noise distribution error: {e}")))?;

        let mut factor_rng = StdRng::seed_from_u64(self.seed);
        let factors: Vec<(f64, f64)> = dates
            .iter()
            .map(|_| {
                (
                    MARKET_VOL * normal.sample(&mut factor_rng),
                    THEME_VOL * normal.sample(&mut factor_rng),
                )
            })
            .collect();

        let mut observations = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let mut rng = StdRng::seed_from_u64(symbol_seed(self.seed, symbol));
            let profile = Profile::draw(&mut rng);

            let mut price = profile.start_price;
            let mut closes = Vec::with_capacity(dates.len());
            for (date, (market, theme)) in dates.iter().zip(&factors) {
                let r = profile.drift
                    + profile.market_beta * market
                    + profile.theme_beta * theme
                    + profile.idio_vol * normal.sample(&mut rng);
                price *= (1.0 + r).max(0.01);
                closes.push((*date, price));
            }
            observations.push(((FIELD_CLOSE.to_string(), symbol.clone()), closes));
        }

        tracing::debug!(rows = dates.len(), symbols = symbols.len(), "generated synthetic prices");
        Ok(RawPriceFrame::from_observations(observations, true))
    }
}

/// Per-symbol walk parameters.
struct Profile {
    start_price: f64,
    drift: f64,
    market_beta: f64,
    theme_beta: f64,
    idio_vol: f64,
}

impl Profile {
    fn draw(rng: &mut StdRng) -> Self {
        Self {
            start_price: rng.gen_range(20.0..900.0),
            drift: rng.gen_range(-0.0002..0.0012),
            market_beta: rng.gen_range(0.6..1.3),
            theme_beta: rng.gen_range(0.0..1.2),
            idio_vol: rng.gen_range(0.004..0.018),
        }
    }
}

fn symbol_seed(seed: u64, symbol: &Symbol) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    symbol.hash(&mut hasher);
    hasher.finish()
}

/// Weekdays in `[start, end]`.
fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut day = start;
    while day <= end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(day);
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawColumns;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn business_days_skip_weekends() {
        // 2025-06-27 is a Friday.
        let days = business_days(
            NaiveDate::from_ymd_opt(2025, 6, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        );
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn same_seed_same_prices() {
        let symbols = vec![Symbol::new("A"), Symbol::new("B")];
        let a = SyntheticSource::new(7).with_end(end()).fetch(&symbols, Span::OneYear).unwrap();
        let b = SyntheticSource::new(7).with_end(end()).fetch(&symbols, Span::OneYear).unwrap();
        assert_eq!(a, b);

        let c = SyntheticSource::new(8).with_end(end()).fetch(&symbols, Span::OneYear).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn prices_are_positive_and_cover_span() {
        let symbols = vec![Symbol::new("BLK")];
        let frame = SyntheticSource::new(1)
            .with_end(end())
            .fetch(&symbols, Span::SixMonths)
            .unwrap();

        // Roughly 21 trading days per month.
        assert!(frame.index.len() > 120 && frame.index.len() < 140);
        let RawColumns::Grouped(cols) = &frame.columns else {
            panic!("expected grouped layout");
        };
        let close = &cols[&(FIELD_CLOSE.to_string(), Symbol::new("BLK"))];
        assert!(close.iter().all(|v| v.is_some_and(|p| p > 0.0)));
    }
}
