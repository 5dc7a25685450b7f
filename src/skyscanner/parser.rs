//! HTML parsing for Skyscanner day-view pages.

use super::market::Market;
use super::selectors;
use crate::source::{Outcome, SourceError};
use scraper::Html;
use tracing::{debug, warn};

/// Interprets a fetched day view into a lookup outcome.
///
/// A challenge marker, or a page with neither a price nor an explicit
/// no-offers marker, means the site has stopped serving real results:
/// both map to `Blocked`.
pub fn parse_day(html: &str, market: Market) -> Result<Outcome, SourceError> {
    let document = Html::parse_document(html);

    if document.select(&selectors::CHALLENGE).next().is_some() {
        warn!("Challenge page detected");
        return Ok(Outcome::Blocked);
    }

    if let Some(element) = document.select(&selectors::PRICE).next() {
        let text = element.text().collect::<String>();
        let (amount, currency) = parse_price_text(&text, market)?;
        debug!("Parsed price: {} {}", amount, currency);
        return Ok(Outcome::Priced { amount, currency });
    }

    if document.select(&selectors::NO_RESULTS).next().is_some() {
        debug!("No offers for this day");
        return Ok(Outcome::NotFound);
    }

    warn!("Page contained neither a price nor a no-results marker");
    Ok(Outcome::Blocked)
}

/// Extracts a numeric amount and currency from a displayed price string
/// such as `₩420,000`, `$1,234.56` or `420,000원`.
fn parse_price_text(text: &str, market: Market) -> Result<(f64, String), SourceError> {
    let text = text.trim();

    let currency = detect_currency(text).unwrap_or_else(|| market.currency().to_string());

    let numeric: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();

    if numeric.is_empty() {
        return Err(SourceError::Parse(format!("no digits in price text: {:?}", text)));
    }

    let amount = numeric
        .parse::<f64>()
        .map_err(|_| SourceError::Parse(format!("unparseable price text: {:?}", text)))?;

    Ok((amount, currency))
}

fn detect_currency(text: &str) -> Option<String> {
    let symbol_map = [
        ("₩", "KRW"),
        ("원", "KRW"),
        ("$", "USD"),
        ("£", "GBP"),
        ("€", "EUR"),
        ("¥", "JPY"),
    ];

    symbol_map
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| (*code).to_string())
}
