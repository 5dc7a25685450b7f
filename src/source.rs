//! The price-lookup capability shared by all upstream variants.

use crate::grid::{Cell, Route};
use async_trait::async_trait;
use thiserror::Error;

/// Result of a single price lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A definite fare was found.
    Priced { amount: f64, currency: String },
    /// The upstream completed without error but had no offer for this cell.
    NotFound,
    /// The upstream signaled anti-automation defense. Not cell-local: the
    /// whole source is unusable for the remainder of the run.
    Blocked,
}

/// Cell-local lookup failures. Logged and skipped; never aborts a scan.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// A fare source for one scan. Implementations must make each `lookup`
/// self-contained: per-call resources are acquired and released on every
/// exit path, so errors never leak state into the next call.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Looks up the round-trip fare for one cell.
    async fn lookup(&self, route: &Route, cell: &Cell) -> Result<Outcome, SourceError>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}
