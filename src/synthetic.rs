//! Synthetic price source for offline demos and tests.

use crate::grid::{Cell, Route};
use crate::source::{Outcome, PriceSource, SourceError};
use async_trait::async_trait;
use chrono::Datelike;
use rand::RngExt;
use std::hash::{DefaultHasher, Hash, Hasher};
use tracing::debug;

/// Generates plausible fares without touching the network. Prices are a
/// pure function of (seed, route, cell): weekend departures carry a
/// premium, longer stays cost more, and a small fraction of cells has no
/// offer at all.
pub struct SyntheticSource {
    currency: String,
    seed: u64,
}

impl SyntheticSource {
    /// Deterministic generator quoting in the given currency.
    pub fn new(currency: impl Into<String>) -> Self {
        Self { currency: currency.into(), seed: 0 }
    }

    /// Varies the whole price surface per seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Randomizes the seed, for demo runs that should differ.
    pub fn with_random_seed(self) -> Self {
        let seed = rand::rng().random::<u64>();
        self.with_seed(seed)
    }

    fn cell_hash(&self, route: &Route, cell: &Cell) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        route.origin.hash(&mut hasher);
        route.destination.hash(&mut hasher);
        cell.departure.hash(&mut hasher);
        cell.stay_nights.hash(&mut hasher);
        hasher.finish()
    }

    fn scale(&self) -> f64 {
        // Zero-decimal currencies quote in much larger figures
        match self.currency.as_str() {
            "KRW" | "JPY" => 1000.0,
            _ => 1.0,
        }
    }
}

#[async_trait]
impl PriceSource for SyntheticSource {
    async fn lookup(&self, route: &Route, cell: &Cell) -> Result<Outcome, SourceError> {
        let hash = self.cell_hash(route, cell);

        // Roughly one cell in 23 has no offer
        if hash % 23 == 0 {
            debug!("Synthetic gap at {}", cell);
            return Ok(Outcome::NotFound);
        }

        let weekday = cell.departure.weekday().num_days_from_monday();
        let weekend_premium = if weekday >= 4 { 1.18 } else { 1.0 };
        let stay_factor = 1.0 + 0.04 * f64::from(cell.stay_nights);
        let wiggle = 0.85 + (hash % 1000) as f64 / 1000.0 * 0.3;

        let amount = (320.0 * weekend_premium * stay_factor * wiggle * self.scale()).round();

        Ok(Outcome::Priced { amount, currency: self.currency.clone() })
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
