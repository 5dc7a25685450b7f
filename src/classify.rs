//! Cheap-fare classification by weekday/weekend peer group.

use crate::matrix::{PriceMatrix, PricedCell};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Which peer group a departure date belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerGroup {
    Weekday,
    Weekend,
}

/// Derived cheap-fare cutoffs, one per peer group. An empty group has no
/// cutoff: none of its cells are cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub weekday_cutoff: Option<f64>,
    pub weekend_cutoff: Option<f64>,
    pub percentile: f64,
    pub weekend_start: String,
}

impl Threshold {
    /// Cutoff for the peer group the given departure date belongs to.
    pub fn cutoff_for(&self, departure: NaiveDate) -> Option<f64> {
        let start = self.weekend_start.parse::<Weekday>().unwrap_or(Weekday::Fri);
        match group_of(departure, start) {
            PeerGroup::Weekday => self.weekday_cutoff,
            PeerGroup::Weekend => self.weekend_cutoff,
        }
    }

    /// A cell is cheap iff its price is at or below its own group's cutoff.
    pub fn is_cheap(&self, cell: &PricedCell) -> bool {
        match (cell.price(), self.cutoff_for(cell.cell.departure)) {
            (Some(price), Some(cutoff)) => price <= cutoff,
            _ => false,
        }
    }
}

fn group_of(departure: NaiveDate, weekend_start: Weekday) -> PeerGroup {
    if departure.weekday().num_days_from_monday() >= weekend_start.num_days_from_monday() {
        PeerGroup::Weekend
    } else {
        PeerGroup::Weekday
    }
}

/// Computes cheap-fare cutoffs from a completed matrix.
#[derive(Debug, Clone)]
pub struct Classifier {
    percentile: f64,
    weekend_start: Weekday,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { percentile: 0.25, weekend_start: Weekday::Fri }
    }
}

impl Classifier {
    /// Creates a classifier. `percentile` marks the boundary of the cheapest
    /// fraction of each group; `weekend_start` is the first weekend day.
    pub fn new(percentile: f64, weekend_start: Weekday) -> Self {
        Self { percentile: percentile.clamp(0.0, 1.0), weekend_start }
    }

    /// Partitions priced cells by departure weekday and derives one cutoff
    /// per non-empty group: the price at index `floor(len * percentile)` of
    /// the ascending-sorted group.
    pub fn classify(&self, matrix: &PriceMatrix) -> Threshold {
        let mut weekday_prices = Vec::new();
        let mut weekend_prices = Vec::new();

        for cell in matrix.priced() {
            if let Some(price) = cell.price() {
                match group_of(cell.cell.departure, self.weekend_start) {
                    PeerGroup::Weekday => weekday_prices.push(price),
                    PeerGroup::Weekend => weekend_prices.push(price),
                }
            }
        }

        Threshold {
            weekday_cutoff: self.cutoff(weekday_prices),
            weekend_cutoff: self.cutoff(weekend_prices),
            percentile: self.percentile,
            weekend_start: weekday_name(self.weekend_start),
        }
    }

    fn cutoff(&self, mut prices: Vec<f64>) -> Option<f64> {
        if prices.is_empty() {
            return None;
        }
        prices.sort_by(|a, b| a.total_cmp(b));
        let index = ((prices.len() as f64 * self.percentile).floor() as usize).min(prices.len() - 1);
        Some(prices[index])
    }
}

fn weekday_name(day: Weekday) -> String {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
    .to_string()
}
