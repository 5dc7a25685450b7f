//! Response models for the fare-search API.

use serde::Deserialize;

/// Top-level quote response for one (departure, return) query.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub quotes: Vec<Quote>,
}

/// One round-trip offer.
#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub direct: bool,
}

impl QuoteResponse {
    /// The lowest-priced offer, if any.
    pub fn cheapest(&self) -> Option<&Quote> {
        self.quotes.iter().min_by(|a, b| a.price.total_cmp(&b.price))
    }
}
