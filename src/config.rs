//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::classify::Classifier;
use crate::scan::ScanPolicy;
use crate::skyscanner::Market;
use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Skyscanner market (site + quote currency)
    #[serde(default)]
    pub market: Market,

    /// Base currency for the matrix; defaults to the market's currency
    #[serde(default)]
    pub base_currency: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between lookups in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to the delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Concurrent lookup workers; 1 is the safe default
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retries per cell on lookup errors (0 or 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause before the one retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cheapest fraction of each peer group flagged as cheap
    #[serde(default = "default_percentile")]
    pub percentile: f64,

    /// First weekend day for peer grouping (e.g., "fri")
    #[serde(default = "default_weekend_start")]
    pub weekend_start: String,

    /// Which price source to scan with
    #[serde(default)]
    pub source: SourceKind,

    /// Fare API key (FARE_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Fare API base URL override
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Currency-rate endpoint override
    #[serde(default)]
    pub rates_base_url: Option<String>,

    /// Conversion factor used when the rate lookup fails
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_delay_jitter_ms() -> u64 {
    500
}

fn default_max_concurrency() -> usize {
    1
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    3000
}

fn default_percentile() -> f64 {
    0.25
}

fn default_weekend_start() -> String {
    "fri".to_string()
}

fn default_fallback_rate() -> f64 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market: Market::Kr,
            base_currency: None,
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            percentile: default_percentile(),
            weekend_start: default_weekend_start(),
            source: SourceKind::Scrape,
            api_key: None,
            api_base_url: None,
            rates_base_url: None,
            fallback_rate: default_fallback_rate(),
            format: OutputFormat::Table,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("fare-scan.toml");
        if local_config.exists() {
            debug!("Found fare-scan.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("fare-scan").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(market) = std::env::var("FARE_MARKET") {
            if let Ok(m) = market.parse() {
                self.market = m;
            }
        }

        if let Ok(proxy) = std::env::var("FARE_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("FARE_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(key) = std::env::var("FARE_API_KEY") {
            self.api_key = Some(key);
        }

        self
    }

    /// The currency every matrix price is normalized into.
    pub fn effective_currency(&self) -> String {
        self.base_currency.clone().unwrap_or_else(|| self.market.currency().to_string())
    }

    /// Scan policy derived from the pacing and retry fields.
    pub fn policy(&self) -> ScanPolicy {
        ScanPolicy {
            max_concurrency: self.max_concurrency,
            inter_request_delay: Duration::from_millis(self.delay_ms),
            delay_jitter: Duration::from_millis(self.delay_jitter_ms),
            max_retries_per_cell: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Classifier derived from the percentile and weekend-boundary fields.
    pub fn classifier(&self) -> Classifier {
        let weekend_start = self.weekend_start.parse::<Weekday>().unwrap_or(Weekday::Fri);
        Classifier::new(self.percentile, weekend_start)
    }
}

/// Which price source a scan uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Scrape,
    Api,
    Synthetic,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scrape" => Ok(SourceKind::Scrape),
            "api" => Ok(SourceKind::Api),
            "synthetic" | "demo" => Ok(SourceKind::Synthetic),
            _ => Err(format!("Unknown source: {}. Use: scrape, api, synthetic", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Scrape => write!(f, "scrape"),
            SourceKind::Api => write!(f, "api"),
            SourceKind::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.market, Market::Kr);
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.delay_jitter_ms, 500);
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.percentile, 0.25);
        assert_eq!(config.weekend_start, "fri");
        assert_eq!(config.source, SourceKind::Scrape);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.proxy.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_effective_currency_follows_market() {
        let mut config = Config::default();
        assert_eq!(config.effective_currency(), "KRW");

        config.market = Market::Uk;
        assert_eq!(config.effective_currency(), "GBP");

        config.base_currency = Some("USD".to_string());
        assert_eq!(config.effective_currency(), "USD");
    }

    #[test]
    fn test_policy_derivation() {
        let mut config = Config::default();
        config.delay_ms = 2500;
        config.max_concurrency = 3;
        config.max_retries = 0;

        let policy = config.policy();
        assert_eq!(policy.inter_request_delay, Duration::from_millis(2500));
        assert_eq!(policy.max_concurrency, 3);
        assert_eq!(policy.max_retries_per_cell, 0);
    }

    #[test]
    fn test_classifier_derivation_bad_weekday_falls_back() {
        let mut config = Config::default();
        config.weekend_start = "notaday".to_string();
        // Falls back to Friday rather than failing the scan
        let _ = config.classifier();
    }

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("scrape".parse::<SourceKind>().unwrap(), SourceKind::Scrape);
        assert_eq!("API".parse::<SourceKind>().unwrap(), SourceKind::Api);
        assert_eq!("synthetic".parse::<SourceKind>().unwrap(), SourceKind::Synthetic);
        assert_eq!("demo".parse::<SourceKind>().unwrap(), SourceKind::Synthetic);
        assert!("webdriver".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            market = "us"
            delay_ms = 3000
            max_concurrency = 2
            percentile = 0.3
            source = "api"
            api_key = "secret"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.market, Market::Us);
        assert_eq!(config.delay_ms, 3000);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.percentile, 0.3);
        assert_eq!(config.source, SourceKind::Api);
        assert_eq!(config.api_key, Some("secret".to_string()));
        // Unset fields keep defaults
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.weekend_start, "fri");
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            market = "jp"
            weekend_start = "sat"
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.market, Market::Jp);
        assert_eq!(config.weekend_start, "sat");
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/fare-scan.toml");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let result = Config::from_file(file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            source = "synthetic"
            fallback_rate = 1350.0
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.source, SourceKind::Synthetic);
        assert_eq!(config.fallback_rate, 1350.0);
    }

    #[test]
    fn test_config_with_env() {
        let orig_market = std::env::var("FARE_MARKET").ok();
        let orig_proxy = std::env::var("FARE_PROXY").ok();
        let orig_delay = std::env::var("FARE_DELAY").ok();
        let orig_key = std::env::var("FARE_API_KEY").ok();

        std::env::set_var("FARE_MARKET", "au");
        std::env::set_var("FARE_PROXY", "http://proxy:8080");
        std::env::set_var("FARE_DELAY", "5000");
        std::env::set_var("FARE_API_KEY", "from-env");

        let config = Config::new().with_env();
        assert_eq!(config.market, Market::Au);
        assert_eq!(config.proxy, Some("http://proxy:8080".to_string()));
        assert_eq!(config.delay_ms, 5000);
        assert_eq!(config.api_key, Some("from-env".to_string()));

        for (var, orig) in [
            ("FARE_MARKET", orig_market),
            ("FARE_PROXY", orig_proxy),
            ("FARE_DELAY", orig_delay),
            ("FARE_API_KEY", orig_key),
        ] {
            match orig {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }

    #[test]
    fn test_config_with_env_invalid_values() {
        let orig_market = std::env::var("FARE_MARKET").ok();
        let orig_delay = std::env::var("FARE_DELAY").ok();

        std::env::set_var("FARE_MARKET", "invalid_market");
        std::env::set_var("FARE_DELAY", "not_a_number");

        let config = Config::new().with_env();
        // Invalid values are ignored, keeping defaults
        assert_eq!(config.market, Market::Kr);
        assert_eq!(config.delay_ms, 1000);

        match orig_market {
            Some(v) => std::env::set_var("FARE_MARKET", v),
            None => std::env::remove_var("FARE_MARKET"),
        }
        match orig_delay {
            Some(v) => std::env::set_var("FARE_DELAY", v),
            None => std::env::remove_var("FARE_DELAY"),
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.market = Market::Uk;
        config.base_currency = Some("EUR".to_string());
        config.source = SourceKind::Api;
        config.percentile = 0.2;

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.market, config.market);
        assert_eq!(parsed.base_currency, config.base_currency);
        assert_eq!(parsed.source, config.source);
        assert_eq!(parsed.percentile, config.percentile);
    }
}
