//! The in-memory result set for one scan run.

use crate::grid::Cell;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Per-cell fetch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    Pending,
    Ok,
    Unavailable,
    Blocked,
    Error,
}

impl std::fmt::Display for CellStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellStatus::Pending => write!(f, "pending"),
            CellStatus::Ok => write!(f, "ok"),
            CellStatus::Unavailable => write!(f, "unavailable"),
            CellStatus::Blocked => write!(f, "blocked"),
            CellStatus::Error => write!(f, "error"),
        }
    }
}

/// A fare normalized to the scan's base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fare {
    pub amount: f64,
    pub currency: String,
}

/// A cell annotated with its fetch outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedCell {
    pub cell: Cell,
    pub status: CellStatus,
    /// Present only when status is `Ok`.
    pub fare: Option<Fare>,
    pub fetched_at: DateTime<Utc>,
}

impl PricedCell {
    /// A successfully priced cell.
    pub fn ok(cell: Cell, amount: f64, currency: impl Into<String>) -> Self {
        Self {
            cell,
            status: CellStatus::Ok,
            fare: Some(Fare { amount, currency: currency.into() }),
            fetched_at: Utc::now(),
        }
    }

    /// The upstream had no offer for this cell.
    pub fn unavailable(cell: Cell) -> Self {
        Self { cell, status: CellStatus::Unavailable, fare: None, fetched_at: Utc::now() }
    }

    /// The upstream blocked this lookup.
    pub fn blocked(cell: Cell) -> Self {
        Self { cell, status: CellStatus::Blocked, fare: None, fetched_at: Utc::now() }
    }

    /// The lookup failed with a cell-local error.
    pub fn error(cell: Cell) -> Self {
        Self { cell, status: CellStatus::Error, fare: None, fetched_at: Utc::now() }
    }

    /// Returns the normalized price if this cell was priced.
    pub fn price(&self) -> Option<f64> {
        self.fare.as_ref().map(|f| f.amount)
    }
}

/// Matrix insertion errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("duplicate cell: {0}")]
    DuplicateCell(Cell),
}

/// Why a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    Completed,
    Cancelled,
    Blocked,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::Blocked => write!(f, "blocked"),
        }
    }
}

/// Normalized prices keyed by (departure, stay length). Append-only during a
/// scan, read-only afterward. At most one entry per cell; insertion is
/// atomic per cell under concurrent workers.
#[derive(Debug, Default)]
pub struct PriceMatrix {
    cells: Mutex<HashMap<(NaiveDate, u32), PricedCell>>,
}

impl PriceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<(NaiveDate, u32), PricedCell>> {
        self.cells.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records the outcome for one cell. Each cell is written exactly once;
    /// a second write for the same cell is a scheduling bug.
    pub fn insert(&self, priced: PricedCell) -> Result<(), MatrixError> {
        let key = (priced.cell.departure, priced.cell.stay_nights);
        let mut cells = self.guard();
        if cells.contains_key(&key) {
            return Err(MatrixError::DuplicateCell(priced.cell));
        }
        cells.insert(key, priced);
        Ok(())
    }

    /// Looks up one cell's outcome.
    pub fn get(&self, departure: NaiveDate, stay_nights: u32) -> Option<PricedCell> {
        self.guard().get(&(departure, stay_nights)).cloned()
    }

    /// All cells with a definite price, in no particular order.
    pub fn priced(&self) -> Vec<PricedCell> {
        self.guard().values().filter(|c| c.status == CellStatus::Ok).cloned().collect()
    }

    /// Snapshot of every recorded cell.
    pub fn cells(&self) -> Vec<PricedCell> {
        self.guard().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Number of recorded cells with the given status.
    pub fn count_status(&self, status: CellStatus) -> usize {
        self.guard().values().filter(|c| c.status == status).count()
    }

    /// Deep copy, used when the matrix is still shared at scan end.
    pub fn snapshot(&self) -> PriceMatrix {
        PriceMatrix { cells: Mutex::new(self.guard().clone()) }
    }
}

/// A finished (possibly partial) scan: the matrix plus why it ended.
#[derive(Debug)]
pub struct ScanReport {
    pub matrix: PriceMatrix,
    pub termination: Termination,
    /// Cells that were actually attempted.
    pub attempted: usize,
    /// Cells in the full grid.
    pub total: usize,
}

impl ScanReport {
    /// True if every grid cell was attempted and the scan ran to the end.
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed && self.attempted == self.total
    }
}
