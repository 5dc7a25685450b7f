//! Skyscanner country sites and their currencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported Skyscanner markets with their domains and currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    #[default]
    Kr,
    Us,
    Uk,
    Jp,
    De,
    Fr,
    Es,
    Au,
}

impl Market {
    /// Returns the Skyscanner domain for this market.
    pub fn domain(&self) -> &'static str {
        match self {
            Market::Kr => "www.skyscanner.co.kr",
            Market::Us => "www.skyscanner.com",
            Market::Uk => "www.skyscanner.net",
            Market::Jp => "www.skyscanner.jp",
            Market::De => "www.skyscanner.de",
            Market::Fr => "www.skyscanner.fr",
            Market::Es => "www.skyscanner.es",
            Market::Au => "www.skyscanner.com.au",
        }
    }

    /// Returns the base URL for this market.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain())
    }

    /// Returns the currency code prices are quoted in on this site.
    pub fn currency(&self) -> &'static str {
        match self {
            Market::Kr => "KRW",
            Market::Us => "USD",
            Market::Uk => "GBP",
            Market::Jp => "JPY",
            Market::De | Market::Fr | Market::Es => "EUR",
            Market::Au => "AUD",
        }
    }

    /// Returns the Accept-Language header value for this market.
    pub fn accept_language(&self) -> &'static str {
        match self {
            Market::Kr => "ko-KR,ko;q=0.9,en;q=0.8",
            Market::Us => "en-US,en;q=0.9",
            Market::Uk => "en-GB,en;q=0.9",
            Market::Jp => "ja-JP,ja;q=0.9,en;q=0.8",
            Market::De => "de-DE,de;q=0.9,en;q=0.8",
            Market::Fr => "fr-FR,fr;q=0.9,en;q=0.8",
            Market::Es => "es-ES,es;q=0.9,en;q=0.8",
            Market::Au => "en-AU,en;q=0.9",
        }
    }

    /// Returns all supported markets.
    pub fn all() -> &'static [Market] {
        &[
            Market::Kr,
            Market::Us,
            Market::Uk,
            Market::Jp,
            Market::De,
            Market::Fr,
            Market::Es,
            Market::Au,
        ]
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Market::Kr => "kr",
            Market::Us => "us",
            Market::Uk => "uk",
            Market::Jp => "jp",
            Market::De => "de",
            Market::Fr => "fr",
            Market::Es => "es",
            Market::Au => "au",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kr" => Ok(Market::Kr),
            "us" => Ok(Market::Us),
            "uk" => Ok(Market::Uk),
            "jp" => Ok(Market::Jp),
            "de" => Ok(Market::De),
            "fr" => Ok(Market::Fr),
            "es" => Ok(Market::Es),
            "au" => Ok(Market::Au),
            _ => Err(format!("Unknown market: {}. Use one of: kr, us, uk, jp, de, fr, es, au", s)),
        }
    }
}
