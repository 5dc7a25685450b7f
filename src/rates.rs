//! Currency-rate lookup with caching and a static table for tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;
use wreq::Client;

const FRANKFURTER_BASE: &str = "https://api.frankfurter.dev/v1";

/// Rate lookup failures. The orchestrator falls back to a configured
/// default rate on failure; a scan is never aborted over rates.
#[derive(Debug, Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Network(String),

    #[error("rate endpoint returned status: {0}")]
    Status(u16),

    #[error("failed to parse rate response: {0}")]
    Parse(String),

    #[error("no rate published for {0}->{1}")]
    Missing(String, String),
}

/// Conversion-factor lookup between two currency codes.
#[async_trait]
pub trait RateLookup: Send + Sync {
    /// Returns the factor that converts an amount in `from` into `to`.
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError>;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Rate client against a frankfurter-style JSON endpoint.
pub struct HttpRates {
    client: Client,
    base_url: String,
}

impl HttpRates {
    pub fn new() -> Result<Self, RateError> {
        Self::with_base_url(FRANKFURTER_BASE.to_string())
    }

    /// Custom base URL, for testing.
    pub fn with_base_url(base_url: String) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RateError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RateLookup for HttpRates {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Ok(1.0);
        }

        let url = format!("{}/latest?base={}&symbols={}", self.base_url, from, to);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status(status.as_u16()));
        }

        let text = response.text().await.map_err(|e| RateError::Network(e.to_string()))?;
        let body: RatesResponse =
            serde_json::from_str(&text).map_err(|e| RateError::Parse(e.to_string()))?;

        body.rates.get(&to).copied().ok_or(RateError::Missing(from, to))
    }
}

/// Caching wrapper with a freshness window. Conversion rates drift slowly;
/// one fetch per currency pair per hour is plenty for a scan.
pub struct CachedRates<R> {
    inner: R,
    ttl: Duration,
    cache: Mutex<HashMap<(String, String), (Instant, f64)>>,
}

impl<R: RateLookup> CachedRates<R> {
    /// Wraps a lookup with the default one-hour freshness window.
    pub fn new(inner: R) -> Self {
        Self::with_ttl(inner, Duration::from_secs(3600))
    }

    pub fn with_ttl(inner: R, ttl: Duration) -> Self {
        Self { inner, ttl, cache: Mutex::new(HashMap::new()) }
    }

    fn fresh(&self, key: &(String, String)) -> Option<f64> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(key).filter(|(at, _)| at.elapsed() < self.ttl).map(|(_, rate)| *rate)
    }

    fn store(&self, key: (String, String), rate: f64) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, (Instant::now(), rate));
    }
}

#[async_trait]
impl<R: RateLookup> RateLookup for CachedRates<R> {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let key = (from.to_uppercase(), to.to_uppercase());

        if let Some(rate) = self.fresh(&key) {
            debug!("Rate cache hit for {}->{}", key.0, key.1);
            return Ok(rate);
        }

        let rate = self.inner.rate(from, to).await?;
        self.store(key, rate);
        Ok(rate)
    }
}

/// Fixed rate table for offline runs and tests.
#[derive(Default)]
pub struct StaticRates {
    rates: HashMap<(String, String), f64>,
}

impl StaticRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a one-way conversion factor.
    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates.insert((from.to_uppercase(), to.to_uppercase()), rate);
        self
    }
}

#[async_trait]
impl RateLookup for StaticRates {
    async fn rate(&self, from: &str, to: &str) -> Result<f64, RateError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Ok(1.0);
        }
        self.rates.get(&(from.clone(), to.clone())).copied().ok_or(RateError::Missing(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_rates_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "USD"))
            .and(query_param("symbols", "KRW"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates":{"KRW":1456.2}}"#),
            )
            .mount(&mock_server)
            .await;

        let rates = HttpRates::with_base_url(mock_server.uri()).unwrap();
        let rate = rates.rate("usd", "krw").await.unwrap();
        assert_eq!(rate, 1456.2);
    }

    #[tokio::test]
    async fn test_http_rates_identity() {
        // Same currency never hits the network
        let rates = HttpRates::with_base_url("http://localhost:1".to_string()).unwrap();
        assert_eq!(rates.rate("KRW", "KRW").await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_http_rates_missing_symbol() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"rates":{}}"#))
            .mount(&mock_server)
            .await;

        let rates = HttpRates::with_base_url(mock_server.uri()).unwrap();
        let err = rates.rate("USD", "KRW").await.unwrap_err();
        assert!(matches!(err, RateError::Missing(_, _)));
    }

    #[tokio::test]
    async fn test_http_rates_server_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let rates = HttpRates::with_base_url(mock_server.uri()).unwrap();
        let err = rates.rate("USD", "KRW").await.unwrap_err();
        assert!(matches!(err, RateError::Status(500)));
    }

    #[tokio::test]
    async fn test_http_rates_bad_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let rates = HttpRates::with_base_url(mock_server.uri()).unwrap();
        let err = rates.rate("USD", "KRW").await.unwrap_err();
        assert!(matches!(err, RateError::Parse(_)));
    }

    /// Counts how many times the inner lookup is hit.
    struct CountingRates {
        calls: AtomicU32,
    }

    #[async_trait]
    impl RateLookup for CountingRates {
        async fn rate(&self, _from: &str, _to: &str) -> Result<f64, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(2.0)
        }
    }

    #[tokio::test]
    async fn test_cached_rates_hits_inner_once() {
        let cached = CachedRates::new(CountingRates { calls: AtomicU32::new(0) });

        assert_eq!(cached.rate("USD", "KRW").await.unwrap(), 2.0);
        assert_eq!(cached.rate("USD", "KRW").await.unwrap(), 2.0);
        assert_eq!(cached.rate("usd", "krw").await.unwrap(), 2.0);

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_rates_distinct_pairs() {
        let cached = CachedRates::new(CountingRates { calls: AtomicU32::new(0) });

        cached.rate("USD", "KRW").await.unwrap();
        cached.rate("EUR", "KRW").await.unwrap();

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_rates_expiry() {
        let cached =
            CachedRates::with_ttl(CountingRates { calls: AtomicU32::new(0) }, Duration::ZERO);

        cached.rate("USD", "KRW").await.unwrap();
        cached.rate("USD", "KRW").await.unwrap();

        // Zero TTL: every call goes through
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_static_rates() {
        let rates = StaticRates::new().with_rate("USD", "KRW", 1400.0);

        assert_eq!(rates.rate("USD", "KRW").await.unwrap(), 1400.0);
        assert_eq!(rates.rate("JPY", "JPY").await.unwrap(), 1.0);
        assert!(matches!(rates.rate("EUR", "KRW").await, Err(RateError::Missing(_, _))));
    }
}
