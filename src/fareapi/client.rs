//! HTTP client for the fare-search API.

use super::models::QuoteResponse;
use crate::grid::{Cell, Route};
use crate::source::{Outcome, PriceSource, SourceError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;

const FAREAPI_BASE: &str = "https://api.fareapi.dev";

/// Authenticated fare-search API client.
pub struct FareApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FareApiClient {
    /// Creates a new client from an API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, FAREAPI_BASE.to_string())
    }

    /// Creates a new client with a custom base URL (for testing).
    pub fn with_base_url(api_key: impl Into<String>, base_url: String) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("Fare API key is empty. Set api_key in config or FARE_API_KEY.");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url, api_key })
    }

    fn quote_url(&self, route: &Route, cell: &Cell) -> String {
        format!(
            "{}/v1/quotes?origin={}&destination={}&departure={}&return={}",
            self.base_url,
            urlencoding::encode(&route.origin),
            urlencoding::encode(&route.destination),
            cell.departure.format("%Y-%m-%d"),
            cell.return_date().format("%Y-%m-%d"),
        )
    }
}

#[async_trait]
impl PriceSource for FareApiClient {
    async fn lookup(&self, route: &Route, cell: &Cell) -> Result<Outcome, SourceError> {
        let url = self.quote_url(route, cell);
        info!("Quoting {} departing {} for {} nights", route, cell.departure, cell.stay_nights);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        // Rejected credentials or exhausted quota make every remaining
        // call pointless, so these end the scan like a block does.
        if status == 401 || status == 403 || status == 429 {
            warn!("Fare API refused the request ({})", status);
            return Ok(Outcome::Blocked);
        }

        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let text = response.text().await.map_err(|e| SourceError::Network(e.to_string()))?;
        let quotes: QuoteResponse =
            serde_json::from_str(&text).map_err(|e| SourceError::Parse(e.to_string()))?;

        match quotes.cheapest() {
            Some(quote) => Ok(Outcome::Priced {
                amount: quote.price,
                currency: quote.currency.to_uppercase(),
            }),
            None => {
                debug!("No offers for this cell");
                Ok(Outcome::NotFound)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fareapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_cell() -> Cell {
        Cell::new(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(), 3)
    }

    fn test_route() -> Route {
        Route::new("ICN", "NRT")
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = FareApiClient::new("  ");
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("API key"));
    }

    #[test]
    fn test_quote_url_shape() {
        let client =
            FareApiClient::with_base_url("key", "http://test".to_string()).unwrap();
        let url = client.quote_url(&test_route(), &test_cell());
        assert_eq!(
            url,
            "http://test/v1/quotes?origin=ICN&destination=NRT&departure=2026-05-01&return=2026-05-04"
        );
    }

    #[tokio::test]
    async fn test_lookup_priced_cheapest_quote() {
        let mock_server = MockServer::start().await;

        let body = r#"{"quotes": [
            {"price": 512.0, "currency": "usd", "direct": true},
            {"price": 398.5, "currency": "usd"}
        ]}"#;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .and(query_param("origin", "ICN"))
            .and(query_param("destination", "NRT"))
            .and(query_param("departure", "2026-05-01"))
            .and(query_param("return", "2026-05-04"))
            .and(header("X-Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("secret", mock_server.uri()).unwrap();
        let outcome = client.lookup(&test_route(), &test_cell()).await.unwrap();

        assert_eq!(outcome, Outcome::Priced { amount: 398.5, currency: "USD".to_string() });
    }

    #[tokio::test]
    async fn test_lookup_no_quotes_is_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"quotes": []}"#))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("secret", mock_server.uri()).unwrap();
        let outcome = client.lookup(&test_route(), &test_cell()).await.unwrap();
        assert_eq!(outcome, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_auth_rejected_is_blocked() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("expired", mock_server.uri()).unwrap();
        let outcome = client.lookup(&test_route(), &test_cell()).await.unwrap();
        assert_eq!(outcome, Outcome::Blocked);
    }

    #[tokio::test]
    async fn test_lookup_quota_exhausted_is_blocked() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("secret", mock_server.uri()).unwrap();
        let outcome = client.lookup(&test_route(), &test_cell()).await.unwrap();
        assert_eq!(outcome, Outcome::Blocked);
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_source_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("secret", mock_server.uri()).unwrap();
        let err = client.lookup(&test_route(), &test_cell()).await.unwrap_err();
        assert!(matches!(err, SourceError::Status(502)));
    }

    #[tokio::test]
    async fn test_lookup_malformed_body_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/quotes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = FareApiClient::with_base_url("secret", mock_server.uri()).unwrap();
        let err = client.lookup(&test_route(), &test_cell()).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_source_name() {
        let client = FareApiClient::with_base_url("key", "http://test".to_string()).unwrap();
        assert_eq!(client.name(), "fareapi");
    }
}
