//! Calendar rendering for finished scans (table, JSON, markdown, CSV).

use crate::classify::Threshold;
use crate::config::OutputFormat;
use crate::grid::{Cell, Route};
use crate::matrix::{CellStatus, ScanReport};
use serde::Serialize;

/// Formats a finished scan for output.
pub struct Formatter {
    format: OutputFormat,
}

/// One rendered grid cell.
#[derive(Debug, Serialize)]
struct CellView {
    departure: chrono::NaiveDate,
    stay_nights: u32,
    status: String,
    price: Option<f64>,
    currency: Option<String>,
    cheap: bool,
}

#[derive(Debug, Serialize)]
struct ReportView<'a> {
    route: String,
    termination: String,
    attempted: usize,
    total: usize,
    threshold: &'a Threshold,
    cells: Vec<CellView>,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Renders the report over the full grid, so never-attempted cells are
    /// visible and distinguishable from failed ones.
    pub fn format_report(
        &self,
        route: &Route,
        grid: &[Cell],
        report: &ScanReport,
        threshold: &Threshold,
    ) -> String {
        if grid.is_empty() {
            return "No cells to scan.".to_string();
        }

        match self.format {
            OutputFormat::Json => self.json(route, grid, report, threshold),
            OutputFormat::Table => self.table(route, grid, report, threshold),
            OutputFormat::Markdown => self.markdown(route, grid, report, threshold),
            OutputFormat::Csv => self.csv(grid, report, threshold),
        }
    }

    fn cell_views(
        &self,
        grid: &[Cell],
        report: &ScanReport,
        threshold: &Threshold,
    ) -> Vec<CellView> {
        grid.iter()
            .map(|cell| match report.matrix.get(cell.departure, cell.stay_nights) {
                Some(priced) => CellView {
                    departure: cell.departure,
                    stay_nights: cell.stay_nights,
                    status: priced.status.to_string(),
                    price: priced.price(),
                    currency: priced.fare.as_ref().map(|f| f.currency.clone()),
                    cheap: threshold.is_cheap(&priced),
                },
                None => CellView {
                    departure: cell.departure,
                    stay_nights: cell.stay_nights,
                    status: "skipped".to_string(),
                    price: None,
                    currency: None,
                    cheap: false,
                },
            })
            .collect()
    }

    // JSON formatting

    fn json(
        &self,
        route: &Route,
        grid: &[Cell],
        report: &ScanReport,
        threshold: &Threshold,
    ) -> String {
        let view = ReportView {
            route: route.to_string(),
            termination: report.termination.to_string(),
            attempted: report.attempted,
            total: report.total,
            threshold,
            cells: self.cell_views(grid, report, threshold),
        };
        serde_json::to_string_pretty(&view).unwrap_or_else(|_| "{}".to_string())
    }

    // Table formatting

    fn table(
        &self,
        route: &Route,
        grid: &[Cell],
        report: &ScanReport,
        threshold: &Threshold,
    ) -> String {
        let stays = stay_columns(grid);
        let departures = departure_rows(grid);

        let mut lines = Vec::new();
        lines.push(format!(
            "{} scan {} ({}/{} cells)",
            route, report.termination, report.attempted, report.total
        ));
        lines.push(cutoff_line(threshold));
        lines.push(String::new());

        let mut header = format!("{:<12}", "Departure");
        for stay in &stays {
            header.push_str(&format!(" {:>10}", format!("{}n", stay)));
        }
        lines.push(header);

        for departure in &departures {
            let mut row = format!("{:<12}", departure.to_string());
            for stay in &stays {
                row.push_str(&format!(" {:>10}", self.table_cell(report, threshold, *departure, *stay)));
            }
            lines.push(row);
        }

        lines.push(String::new());
        lines.push(
            "* cheap for its group · '-' no offer · 'err' lookup failed · \
             'blkd' blocked · '.' not attempted"
                .to_string(),
        );

        lines.join("\n")
    }

    fn table_cell(
        &self,
        report: &ScanReport,
        threshold: &Threshold,
        departure: chrono::NaiveDate,
        stay: u32,
    ) -> String {
        match report.matrix.get(departure, stay) {
            Some(priced) => match priced.status {
                CellStatus::Ok => {
                    let price = priced.price().unwrap_or(0.0);
                    let mark = if threshold.is_cheap(&priced) { "*" } else { "" };
                    format!("{}{}", fmt_amount(price), mark)
                }
                CellStatus::Unavailable => "-".to_string(),
                CellStatus::Error => "err".to_string(),
                CellStatus::Blocked => "blkd".to_string(),
                CellStatus::Pending => ".".to_string(),
            },
            None => ".".to_string(),
        }
    }

    // Markdown formatting

    fn markdown(
        &self,
        route: &Route,
        grid: &[Cell],
        report: &ScanReport,
        threshold: &Threshold,
    ) -> String {
        let stays = stay_columns(grid);
        let departures = departure_rows(grid);

        let mut lines = Vec::new();
        lines.push(format!(
            "## {} scan {} ({}/{} cells)",
            route, report.termination, report.attempted, report.total
        ));
        lines.push(String::new());
        lines.push(cutoff_line(threshold));
        lines.push(String::new());

        let mut header = "| Departure |".to_string();
        let mut divider = "|-----------|".to_string();
        for stay in &stays {
            header.push_str(&format!(" {}n |", stay));
            divider.push_str("----|");
        }
        lines.push(header);
        lines.push(divider);

        for departure in &departures {
            let mut row = format!("| {} |", departure);
            for stay in &stays {
                let cell = self.table_cell(report, threshold, *departure, *stay);
                let cell = if cell.ends_with('*') {
                    format!("**{}**", cell.trim_end_matches('*'))
                } else {
                    cell
                };
                row.push_str(&format!(" {} |", cell));
            }
            lines.push(row);
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv(&self, grid: &[Cell], report: &ScanReport, threshold: &Threshold) -> String {
        let mut lines = vec!["departure,stay_nights,status,price,currency,cheap".to_string()];

        for view in self.cell_views(grid, report, threshold) {
            lines.push(format!(
                "{},{},{},{},{},{}",
                view.departure,
                view.stay_nights,
                view.status,
                view.price.map(|p| fmt_amount(p)).unwrap_or_default(),
                view.currency.unwrap_or_default(),
                view.cheap
            ));
        }

        lines.join("\n")
    }
}

fn stay_columns(grid: &[Cell]) -> Vec<u32> {
    let mut stays: Vec<u32> = grid.iter().map(|c| c.stay_nights).collect();
    stays.sort_unstable();
    stays.dedup();
    stays
}

fn departure_rows(grid: &[Cell]) -> Vec<chrono::NaiveDate> {
    let mut dates: Vec<chrono::NaiveDate> = grid.iter().map(|c| c.departure).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn cutoff_line(threshold: &Threshold) -> String {
    let describe = |cutoff: Option<f64>| match cutoff {
        Some(v) => format!("<= {}", fmt_amount(v)),
        None => "none".to_string(),
    };
    format!(
        "Cheap cutoffs: weekday {}, weekend {}",
        describe(threshold.weekday_cutoff),
        describe(threshold.weekend_cutoff)
    )
}

/// Whole amounts render without decimals, fractional ones with two.
fn fmt_amount(amount: f64) -> String {
    if (amount - amount.round()).abs() < f64::EPSILON {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}
