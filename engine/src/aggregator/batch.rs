// Per-symbol fetch with failure isolation, then a single align over the
// successes. Concurrent and sequential variants produce the same outcome.
use super::AlignedTable;
use crate::data::PriceFetcher;
use crate::error::FetchFailure;
use chrono::NaiveDate;
use shared::models::{PriceSeries, Symbol};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub table: AlignedTable,
    pub failures: BTreeMap<Symbol, FetchFailure>,
}

fn unique_symbols(symbols: &[Symbol]) -> Vec<Symbol> {
    let mut unique: Vec<Symbol> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        if !unique.contains(symbol) {
            unique.push(symbol.clone());
        }
    }
    unique
}

fn fold_outcomes(outcomes: Vec<(Symbol, Result<PriceSeries, FetchFailure>)>) -> BatchOutcome {
    let mut table = AlignedTable::new();
    let mut failures = BTreeMap::new();

    for (symbol, outcome) in outcomes {
        let inserted = outcome.and_then(|mut series| {
            // The column is keyed by the requested symbol, whatever the source called it.
            series.symbol = symbol.clone();
            table.insert_series(series).map_err(|e| e.into_fetch_failure())
        });
        if let Err(reason) = inserted {
            tracing::warn!(%symbol, error = %reason, "Skipping symbol, keeping the rest of the batch");
            failures.insert(symbol, reason);
        }
    }

    tracing::info!(
        columns = table.column_count(),
        rows = table.row_count(),
        failed = failures.len(),
        "Batch aligned"
    );
    BatchOutcome { table, failures }
}

/// Fetches every symbol in turn and aligns whatever succeeded.
///
/// Never fails as a whole: each symbol that cannot be fetched, or whose
/// series is rejected, is reported in `failures` and gets no column.
pub fn batch_fetch_and_align<F>(symbols: &[Symbol], fetcher: &F, start: NaiveDate, end: NaiveDate) -> BatchOutcome
where
    F: PriceFetcher + ?Sized,
{
    let outcomes = unique_symbols(symbols)
        .into_iter()
        .map(|symbol| {
            tracing::debug!(%symbol, %start, %end, "Fetching price series");
            let outcome = fetcher.fetch(&symbol, start, end);
            (symbol, outcome)
        })
        .collect();
    fold_outcomes(outcomes)
}

/// Same contract as [`batch_fetch_and_align`], with one blocking task per
/// symbol and at most `max_concurrent` fetches in flight.
///
/// All outcomes are joined before alignment. A fetch task that panics is
/// reported as that symbol's failure.
pub async fn batch_fetch_and_align_concurrent<F>(
    symbols: &[Symbol],
    fetcher: Arc<F>,
    start: NaiveDate,
    end: NaiveDate,
    max_concurrent: usize,
) -> BatchOutcome
where
    F: PriceFetcher + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut pending = Vec::new();
    let mut outcomes = Vec::new();

    for symbol in unique_symbols(symbols) {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                outcomes.push((symbol, Err(FetchFailure::Source(format!("fetch pool unavailable: {}", e)))));
                continue;
            }
        };
        let task_fetcher = Arc::clone(&fetcher);
        let task_symbol = symbol.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            tracing::debug!(symbol = %task_symbol, %start, %end, "Fetching price series");
            task_fetcher.fetch(&task_symbol, start, end)
        });
        pending.push((symbol, handle));
    }

    for (symbol, handle) in pending {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                tracing::error!(%symbol, error_detail = ?join_error, "Fetch task did not complete");
                Err(FetchFailure::Source(format!("fetch task failed: {}", join_error)))
            }
        };
        outcomes.push((symbol, outcome));
    }

    fold_outcomes(outcomes)
}
