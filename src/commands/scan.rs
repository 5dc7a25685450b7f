//! Scan command implementation.

use crate::classify::Threshold;
use crate::config::{Config, SourceKind};
use crate::fareapi::FareApiClient;
use crate::format::Formatter;
use crate::grid::{Cell, DateGrid, DateWindow, Route, StayRange};
use crate::matrix::{CellStatus, ScanReport};
use crate::rates::{CachedRates, HttpRates, RateLookup, StaticRates};
use crate::scan::{CancelToken, Orchestrator, ProgressSink};
use crate::skyscanner::SkyscannerClient;
use crate::source::PriceSource;
use crate::synthetic::SyntheticSource;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Executes a calendar scan.
pub struct ScanCommand {
    config: Config,
}

/// Sink that logs progress through tracing.
struct TracingSink;

impl ProgressSink for TracingSink {
    fn cell_done(&self, cell: &Cell, status: CellStatus) {
        info!("{} -> {}", cell, status);
    }

    fn progress(&self, completed: usize, total: usize) {
        info!("Progress: {}/{}", completed, total);
    }
}

impl ScanCommand {
    /// Creates a new scan command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the scan and returns formatted output. Ctrl-C cancels
    /// cooperatively: in-flight lookups drain and the partial calendar is
    /// still rendered.
    pub async fn execute(
        &self,
        route: &Route,
        window: &DateWindow,
        stay: &StayRange,
    ) -> Result<String> {
        let source = self.build_source()?;
        let rates = self.build_rates()?;

        let cancel = CancelToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested; draining in-flight lookups");
                ctrl_c.cancel();
            }
        });

        self.execute_with(source, rates, cancel, route, window, stay).await
    }

    /// Runs the scan with provided collaborators (for testing).
    pub async fn execute_with(
        &self,
        source: Arc<dyn PriceSource>,
        rates: Arc<dyn RateLookup>,
        cancel: CancelToken,
        route: &Route,
        window: &DateWindow,
        stay: &StayRange,
    ) -> Result<String> {
        let grid = DateGrid::generate(window, stay)?;
        info!("Scanning {} over {} cells via {}", route, grid.len(), source.name());

        let orchestrator =
            Orchestrator::new(self.config.policy(), self.config.effective_currency())
                .with_fallback_rate(self.config.fallback_rate);

        let report = orchestrator
            .run(route, grid.clone(), source, rates, Arc::new(TracingSink), cancel)
            .await;

        let threshold = self.config.classifier().classify(&report.matrix);
        self.log_summary(&report, &threshold);

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_report(route, &grid, &report, &threshold))
    }

    fn log_summary(&self, report: &ScanReport, threshold: &Threshold) {
        info!(
            "Scan {}: {} priced, {} unavailable, {} errors",
            report.termination,
            report.matrix.count_status(CellStatus::Ok),
            report.matrix.count_status(CellStatus::Unavailable),
            report.matrix.count_status(CellStatus::Error),
        );
        if let Some(cutoff) = threshold.weekday_cutoff {
            info!("Weekday cheap cutoff: {}", cutoff);
        }
        if let Some(cutoff) = threshold.weekend_cutoff {
            info!("Weekend cheap cutoff: {}", cutoff);
        }
    }

    fn build_source(&self) -> Result<Arc<dyn PriceSource>> {
        match self.config.source {
            SourceKind::Scrape => {
                let client = SkyscannerClient::new(&self.config)
                    .context("Failed to create Skyscanner client")?;
                Ok(Arc::new(client))
            }
            SourceKind::Api => {
                let key = self
                    .config
                    .api_key
                    .clone()
                    .context("Fare API source selected but no api_key configured")?;
                let client = match &self.config.api_base_url {
                    Some(base) => FareApiClient::with_base_url(key, base.clone()),
                    None => FareApiClient::new(key),
                }
                .context("Failed to create fare API client")?;
                Ok(Arc::new(client))
            }
            SourceKind::Synthetic => {
                Ok(Arc::new(SyntheticSource::new(self.config.effective_currency())))
            }
        }
    }

    fn build_rates(&self) -> Result<Arc<dyn RateLookup>> {
        // The synthetic source already quotes in the base currency
        if self.config.source == SourceKind::Synthetic {
            return Ok(Arc::new(StaticRates::new()));
        }

        let rates = match &self.config.rates_base_url {
            Some(base) => HttpRates::with_base_url(base.clone()),
            None => HttpRates::new(),
        }
        .context("Failed to create rate client")?;

        Ok(Arc::new(CachedRates::new(rates)))
    }
}
