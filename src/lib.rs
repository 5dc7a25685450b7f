//! fare-scan - Round-trip airfare calendar scanner CLI
//!
//! Scans fares across a grid of departure dates and stay lengths for one
//! route, with TLS fingerprint emulation for reliable scraping without
//! detection, and flags cells that are cheap against their weekday or
//! weekend peers.

pub mod classify;
pub mod commands;
pub mod config;
pub mod fareapi;
pub mod format;
pub mod grid;
pub mod matrix;
pub mod rates;
pub mod scan;
pub mod skyscanner;
pub mod source;
pub mod synthetic;

pub use classify::{Classifier, Threshold};
pub use config::Config;
pub use grid::{Cell, DateGrid, DateWindow, Route, StayRange};
pub use matrix::{CellStatus, PriceMatrix, PricedCell, ScanReport, Termination};
pub use scan::{CancelToken, Orchestrator, ScanPolicy};
pub use skyscanner::Market;
pub use source::{Outcome, PriceSource};
