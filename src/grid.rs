//! Scan grid: routes, date windows, stay ranges, and cell enumeration.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fixed origin/destination pair for one scan run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Origin airport or city code (e.g. ICN)
    pub origin: String,
    /// Destination airport or city code (e.g. NRT)
    pub destination: String,
}

impl Route {
    /// Creates a route, uppercasing both codes.
    pub fn new(origin: impl AsRef<str>, destination: impl AsRef<str>) -> Self {
        Self {
            origin: origin.as_ref().trim().to_uppercase(),
            destination: destination.as_ref().trim().to_uppercase(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

/// Candidate departure dates: `start` through `start + day_count - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub day_count: u32,
}

impl DateWindow {
    pub fn new(start: NaiveDate, day_count: u32) -> Self {
        Self { start, day_count }
    }
}

/// Inclusive range of stay lengths in nights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub min_stay: u32,
    pub max_stay: u32,
}

impl StayRange {
    pub fn new(min_stay: u32, max_stay: u32) -> Self {
        Self { min_stay, max_stay }
    }
}

/// One (departure date, stay length) point in the scan grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub departure: NaiveDate,
    pub stay_nights: u32,
}

impl Cell {
    pub fn new(departure: NaiveDate, stay_nights: u32) -> Self {
        Self { departure, stay_nights }
    }

    /// Return date = departure + stay length.
    pub fn return_date(&self) -> NaiveDate {
        self.departure
            .checked_add_days(Days::new(u64::from(self.stay_nights)))
            .unwrap_or(self.departure)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}n)", self.departure, self.stay_nights)
    }
}

/// Errors from grid construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
}

/// Enumerates the candidate cells for a window and a stay range.
pub struct DateGrid;

impl DateGrid {
    /// Generates the full cell sequence, departure-date-major then ascending
    /// stay length. This ordering is the scan order and the user-visible
    /// progress order.
    pub fn generate(window: &DateWindow, stay: &StayRange) -> Result<Vec<Cell>, GridError> {
        if window.day_count == 0 {
            return Err(GridError::InvalidRange("day_count must be at least 1".into()));
        }
        if stay.min_stay > stay.max_stay {
            return Err(GridError::InvalidRange(format!(
                "min_stay {} exceeds max_stay {}",
                stay.min_stay, stay.max_stay
            )));
        }

        let mut cells =
            Vec::with_capacity(window.day_count as usize * (stay.max_stay - stay.min_stay + 1) as usize);

        for offset in 0..window.day_count {
            let departure = window
                .start
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| GridError::InvalidRange("departure date out of range".into()))?;

            for nights in stay.min_stay..=stay.max_stay {
                cells.push(Cell::new(departure, nights));
            }
        }

        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_route_uppercases() {
        let route = Route::new(" icn ", "nrt");
        assert_eq!(route.origin, "ICN");
        assert_eq!(route.destination, "NRT");
        assert_eq!(route.to_string(), "ICN-NRT");
    }

    #[test]
    fn test_cell_return_date() {
        let cell = Cell::new(date(2026, 5, 1), 3);
        assert_eq!(cell.return_date(), date(2026, 5, 4));

        // Crosses a month boundary
        let cell = Cell::new(date(2026, 5, 30), 4);
        assert_eq!(cell.return_date(), date(2026, 6, 3));
    }

    #[test]
    fn test_generate_order_and_count() {
        let window = DateWindow::new(date(2026, 5, 1), 3);
        let stay = StayRange::new(3, 4);

        let cells = DateGrid::generate(&window, &stay).unwrap();

        let expected = vec![
            Cell::new(date(2026, 5, 1), 3),
            Cell::new(date(2026, 5, 1), 4),
            Cell::new(date(2026, 5, 2), 3),
            Cell::new(date(2026, 5, 2), 4),
            Cell::new(date(2026, 5, 3), 3),
            Cell::new(date(2026, 5, 3), 4),
        ];
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_generate_cell_count_formula() {
        let window = DateWindow::new(date(2026, 7, 10), 14);
        let stay = StayRange::new(2, 9);

        let cells = DateGrid::generate(&window, &stay).unwrap();
        assert_eq!(cells.len(), 14 * 8);

        // All cells unique
        let unique: std::collections::HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
    }

    #[test]
    fn test_generate_single_day_single_stay() {
        let window = DateWindow::new(date(2026, 5, 1), 1);
        let stay = StayRange::new(7, 7);

        let cells = DateGrid::generate(&window, &stay).unwrap();
        assert_eq!(cells, vec![Cell::new(date(2026, 5, 1), 7)]);
    }

    #[test]
    fn test_generate_rejects_zero_days() {
        let window = DateWindow::new(date(2026, 5, 1), 0);
        let stay = StayRange::new(3, 4);

        let err = DateGrid::generate(&window, &stay).unwrap_err();
        assert!(matches!(err, GridError::InvalidRange(_)));
    }

    #[test]
    fn test_generate_rejects_inverted_stay_range() {
        let window = DateWindow::new(date(2026, 5, 1), 3);
        let stay = StayRange::new(5, 3);

        let err = DateGrid::generate(&window, &stay).unwrap_err();
        assert!(err.to_string().contains("min_stay 5 exceeds max_stay 3"));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let window = DateWindow::new(date(2026, 5, 1), 5);
        let stay = StayRange::new(1, 3);

        let first = DateGrid::generate(&window, &stay).unwrap();
        let second = DateGrid::generate(&window, &stay).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cell_serde() {
        let cell = Cell::new(date(2026, 5, 1), 3);
        let json = serde_json::to_string(&cell).unwrap();
        assert!(json.contains("2026-05-01"));

        let parsed: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cell);
    }
}
