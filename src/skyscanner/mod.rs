//! Skyscanner live-scrape price source.

pub mod client;
pub mod market;
pub mod parser;
pub mod selectors;

pub use client::SkyscannerClient;
pub use market::Market;
