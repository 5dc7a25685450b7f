//! The fetch orchestrator: drives a price source over every grid cell
//! under a concurrency and pacing policy.

use crate::grid::{Cell, Route};
use crate::matrix::{CellStatus, PriceMatrix, PricedCell, ScanReport, Termination};
use crate::rates::RateLookup;
use crate::source::{Outcome, PriceSource, SourceError};
use rand::RngExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Concurrency, pacing, and retry policy for one scan.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Concurrent workers. Most upstreams tolerate only 1.
    pub max_concurrency: usize,
    /// Minimum spacing between lookups per worker.
    pub inter_request_delay: Duration,
    /// Random extra spacing on top of the fixed delay.
    pub delay_jitter: Duration,
    /// 0 or 1. Repeated hammering increases block risk.
    pub max_retries_per_cell: u32,
    /// Pause before the one retry.
    pub retry_backoff: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            inter_request_delay: Duration::from_millis(1000),
            delay_jitter: Duration::from_millis(500),
            max_retries_per_cell: 1,
            retry_backoff: Duration::from_millis(3000),
        }
    }
}

impl ScanPolicy {
    /// Clamps fields to their allowed ranges.
    fn normalized(&self) -> Self {
        Self {
            max_concurrency: self.max_concurrency.max(1),
            max_retries_per_cell: self.max_retries_per_cell.min(1),
            ..self.clone()
        }
    }
}

/// Receives progress updates during a scan. UI feedback only, never
/// control flow.
pub trait ProgressSink: Send + Sync {
    /// One cell finished with the given status.
    fn cell_done(&self, _cell: &Cell, _status: CellStatus) {}

    /// Running completion counter over the full grid.
    fn progress(&self, _completed: usize, _total: usize) {}
}

/// Sink that ignores all updates.
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Cooperative cancellation handle, checked at cell boundaries. An
/// in-flight lookup is allowed to finish naturally.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a price source over a cell sequence and assembles the matrix.
pub struct Orchestrator {
    policy: ScanPolicy,
    base_currency: String,
    /// Conversion factor used when the rate lookup fails.
    fallback_rate: f64,
}

impl Orchestrator {
    pub fn new(policy: ScanPolicy, base_currency: impl Into<String>) -> Self {
        Self { policy: policy.normalized(), base_currency: base_currency.into(), fallback_rate: 1.0 }
    }

    pub fn with_fallback_rate(mut self, rate: f64) -> Self {
        self.fallback_rate = rate;
        self
    }

    /// Runs the scan. Cell-local failures are recorded and skipped; a
    /// `Blocked` outcome stops all further dispatch, as does cancellation.
    /// Either way the partial matrix comes back with an explicit
    /// termination tag.
    pub async fn run(
        &self,
        route: &Route,
        cells: Vec<Cell>,
        source: Arc<dyn PriceSource>,
        rates: Arc<dyn RateLookup>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> ScanReport {
        let total = cells.len();
        let workers = self.policy.max_concurrency.min(total.max(1));

        info!(
            "Scanning {} cells on {} via {} ({} worker{})",
            total,
            route,
            source.name(),
            workers,
            if workers == 1 { "" } else { "s" }
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(cells)));
        let matrix = Arc::new(PriceMatrix::new());
        let blocked = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(tokio::spawn(worker_loop(WorkerContext {
                policy: self.policy.clone(),
                route: route.clone(),
                base_currency: self.base_currency.clone(),
                fallback_rate: self.fallback_rate,
                queue: Arc::clone(&queue),
                matrix: Arc::clone(&matrix),
                blocked: Arc::clone(&blocked),
                completed: Arc::clone(&completed),
                source: Arc::clone(&source),
                rates: Arc::clone(&rates),
                sink: Arc::clone(&sink),
                cancel: cancel.clone(),
                total,
            })));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Scan worker panicked: {}", e);
            }
        }

        let termination = if blocked.load(Ordering::SeqCst) {
            Termination::Blocked
        } else if cancel.is_cancelled() {
            Termination::Cancelled
        } else {
            Termination::Completed
        };

        let attempted = completed.load(Ordering::SeqCst);
        info!("Scan {} after {}/{} cells", termination, attempted, total);

        let matrix = Arc::try_unwrap(matrix).unwrap_or_else(|shared| shared.snapshot());
        ScanReport { matrix, termination, attempted, total }
    }
}

struct WorkerContext {
    policy: ScanPolicy,
    route: Route,
    base_currency: String,
    fallback_rate: f64,
    queue: Arc<Mutex<VecDeque<Cell>>>,
    matrix: Arc<PriceMatrix>,
    blocked: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
    source: Arc<dyn PriceSource>,
    rates: Arc<dyn RateLookup>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
    total: usize,
}

async fn worker_loop(ctx: WorkerContext) {
    loop {
        if ctx.cancel.is_cancelled() || ctx.blocked.load(Ordering::SeqCst) {
            break;
        }

        let cell = {
            let mut queue = ctx.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.pop_front()
        };
        let Some(cell) = cell else { break };

        let priced = match lookup_with_retry(&ctx, &cell).await {
            Ok(Outcome::Priced { amount, currency }) => {
                let normalized = to_base(&ctx, amount, &currency).await;
                PricedCell::ok(cell, normalized, ctx.base_currency.clone())
            }
            Ok(Outcome::NotFound) => PricedCell::unavailable(cell),
            Ok(Outcome::Blocked) => {
                warn!("Source blocked at {}; stopping dispatch", cell);
                ctx.blocked.store(true, Ordering::SeqCst);
                PricedCell::blocked(cell)
            }
            Err(e) => {
                warn!("Lookup failed for {}: {}", cell, e);
                PricedCell::error(cell)
            }
        };

        let status = priced.status;
        if let Err(e) = ctx.matrix.insert(priced) {
            // Grid uniqueness plus single-pop dispatch make this
            // unreachable; reaching it means a scheduling bug.
            error!("{}", e);
            debug_assert!(false, "duplicate cell insert");
        }

        let completed = ctx.completed.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.sink.cell_done(&cell, status);
        ctx.sink.progress(completed, ctx.total);

        if ctx.cancel.is_cancelled() || ctx.blocked.load(Ordering::SeqCst) {
            break;
        }
        pace(&ctx.policy).await;
    }
}

/// One lookup, retried at most once and only on cell-local errors.
async fn lookup_with_retry(
    ctx: &WorkerContext,
    cell: &Cell,
) -> Result<Outcome, SourceError> {
    let mut attempt = 0;
    loop {
        match ctx.source.lookup(&ctx.route, cell).await {
            Err(e) if attempt < ctx.policy.max_retries_per_cell => {
                attempt += 1;
                debug!("Retrying {} after error: {}", cell, e);
                tokio::time::sleep(ctx.policy.retry_backoff).await;
            }
            other => return other,
        }
    }
}

/// Converts a fare into the base currency, falling back to the configured
/// default rate rather than aborting the scan.
async fn to_base(ctx: &WorkerContext, amount: f64, currency: &str) -> f64 {
    if currency.eq_ignore_ascii_case(&ctx.base_currency) {
        return amount;
    }

    match ctx.rates.rate(currency, &ctx.base_currency).await {
        Ok(rate) => amount * rate,
        Err(e) => {
            warn!(
                "Rate lookup {}->{} failed ({}); using fallback rate {}",
                currency, ctx.base_currency, e, ctx.fallback_rate
            );
            amount * ctx.fallback_rate
        }
    }
}

/// Sleeps the inter-request delay plus random jitter.
async fn pace(policy: &ScanPolicy) {
    let base = policy.inter_request_delay;
    let jitter = if policy.delay_jitter.is_zero() {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::rng().random_range(0..=policy.delay_jitter.as_millis() as u64))
    };

    let total = base + jitter;
    if !total.is_zero() {
        debug!("Pacing {}ms before next lookup", total.as_millis());
        tokio::time::sleep(total).await;
    }
}
