//! HTTP client for Skyscanner day views using wreq for TLS fingerprint
//! emulation.

use super::market::Market;
use super::parser;
use crate::config::Config;
use crate::grid::{Cell, Route};
use crate::source::{Outcome, PriceSource, SourceError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Skyscanner client with browser impersonation and anti-bot measures.
/// Pacing between lookups is the orchestrator's job; each call here is a
/// single self-contained fetch.
pub struct SkyscannerClient {
    client: Client,
    market: Market,
    base_url: Option<String>,
}

impl SkyscannerClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, None)
    }

    /// Creates a new client with an optional custom base URL (for testing).
    pub fn with_base_url(config: &Config, base_url: Option<String>) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self { client, market: config.market, base_url })
    }

    fn base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| self.market.base_url())
    }

    /// Day-view URL for one cell, dates in the site's yymmdd form.
    fn day_url(&self, route: &Route, cell: &Cell) -> String {
        format!(
            "{}/transport/flights/{}/{}/{}/{}/?adults=1&cabinclass=economy",
            self.base_url(),
            urlencoding::encode(&route.origin.to_lowercase()),
            urlencoding::encode(&route.destination.to_lowercase()),
            cell.departure.format("%y%m%d"),
            cell.return_date().format("%y%m%d"),
        )
    }

    async fn get(&self, url: &str) -> Result<GetOutcome, SourceError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8")
            .header("Accept-Language", self.market.accept_language())
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"")
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", "\"macOS\"")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if status == 403 || status == 429 {
            warn!("Anti-bot response ({}). Further requests would likely also be blocked.", status);
            return Ok(GetOutcome::Blocked);
        }

        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body =
            response.text().await.map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(GetOutcome::Body(body))
    }
}

enum GetOutcome {
    Body(String),
    Blocked,
}

#[async_trait]
impl PriceSource for SkyscannerClient {
    async fn lookup(&self, route: &Route, cell: &Cell) -> Result<Outcome, SourceError> {
        let url = self.day_url(route, cell);
        info!("Fetching {} departing {} for {} nights", route, cell.departure, cell.stay_nights);

        match self.get(&url).await? {
            GetOutcome::Blocked => Ok(Outcome::Blocked),
            GetOutcome::Body(html) => parser::parse_day(&html, self.market),
        }
    }

    fn name(&self) -> &'static str {
        "skyscanner"
    }
}
