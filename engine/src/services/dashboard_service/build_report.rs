// Handler for building a dashboard report: fetch -> align -> rebase -> derive.
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{DashboardReport, DashboardRequest};
use crate::aggregator::{batch_fetch_and_align_concurrent, rebase, AlignedTable, BatchOutcome};
use crate::alerts::{SkippedAlert, TriggeredAlert};
use crate::data::PriceFetcher;
use crate::error::{EngineError, FetchFailure};
use crate::indicators::{annualized_volatility, derive_indicators};
use shared::models::{PricePoint, PriceSeries, Symbol};

pub async fn handle_build_report(
    request: DashboardRequest,
    fetcher: Arc<dyn PriceFetcher>,
    max_concurrent_fetches: usize,
) -> Result<DashboardReport, EngineError> {
    if request.symbols.is_empty() {
        return Err(EngineError::InvalidRequest("at least one symbol is required".to_string()));
    }
    if request.start > request.end {
        return Err(EngineError::InvalidRequest(format!(
            "start {} is after end {}",
            request.start, request.end
        )));
    }

    let batch = batch_fetch_and_align_concurrent(
        &request.symbols,
        Arc::clone(&fetcher),
        request.start,
        request.end,
        max_concurrent_fetches,
    )
    .await;
    if batch.table.column_count() == 0 {
        tracing::warn!(requested = request.symbols.len(), "No valid price data for any requested symbol");
    }

    // Alerts may watch tickers that are not charted; those are fetched on
    // their own and never become table columns.
    let alert_only: Vec<Symbol> = request
        .alerts
        .iter()
        .map(|alert| alert.symbol.clone())
        .filter(|symbol| !request.symbols.contains(symbol))
        .collect();
    let alert_batch = if alert_only.is_empty() {
        None
    } else {
        tracing::debug!(symbols = alert_only.len(), "Fetching prices for alert-only symbols");
        Some(batch_fetch_and_align_concurrent(&alert_only, fetcher, request.start, request.end, max_concurrent_fetches).await)
    };

    let raw = batch.table;
    let volatility = raw
        .symbols()
        .map(|symbol| {
            let closes: Vec<f64> = observed_series(&raw, symbol).closes();
            (symbol.clone(), annualized_volatility(&closes))
        })
        .collect::<BTreeMap<_, _>>();
    let (triggered_alerts, skipped_alerts) = evaluate_alerts(&request, &raw, &batch.failures, alert_batch.as_ref());

    let (table, rebase_failures) = if request.normalize {
        let outcome = rebase(raw);
        (outcome.table, outcome.failures)
    } else {
        (raw, BTreeMap::new())
    };

    // Indicators follow the presented table so moving averages share its scale.
    let indicators = derive_indicators(&table, &request.indicators);

    tracing::info!(
        columns = table.column_count(),
        rows = table.row_count(),
        fetch_failures = batch.failures.len(),
        rebase_failures = rebase_failures.len(),
        alerts = triggered_alerts.len(),
        skipped_alerts = skipped_alerts.len(),
        "Dashboard report built"
    );

    Ok(DashboardReport {
        table,
        fetch_failures: batch.failures,
        rebase_failures,
        indicators,
        volatility,
        triggered_alerts,
        skipped_alerts,
    })
}

fn observed_series(table: &AlignedTable, symbol: &Symbol) -> PriceSeries {
    let points = table
        .observations(symbol)
        .unwrap_or_default()
        .into_iter()
        .map(|(date, close)| PricePoint::new(date, close))
        .collect();
    PriceSeries::new(symbol.clone(), points)
}

fn evaluate_alerts(
    request: &DashboardRequest,
    raw: &AlignedTable,
    failures: &BTreeMap<Symbol, FetchFailure>,
    alert_batch: Option<&BatchOutcome>,
) -> (Vec<TriggeredAlert>, Vec<SkippedAlert>) {
    let mut triggered = Vec::new();
    let mut skipped = Vec::new();

    for alert in &request.alerts {
        let symbol = &alert.symbol;
        let (table, failures) = match alert_batch {
            Some(extra) if !request.symbols.contains(symbol) => (&extra.table, &extra.failures),
            _ => (raw, failures),
        };
        if !table.contains_symbol(symbol) {
            let reason = failures
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| FetchFailure::UnknownSymbol(symbol.clone()));
            tracing::warn!(%symbol, error = %reason, "Alert symbol has no price data, skipping");
            skipped.push(SkippedAlert { alert: alert.clone(), reason });
            continue;
        }
        if let Some(hit) = alert.evaluate(&observed_series(table, symbol)) {
            tracing::info!(alert = %hit, "Price alert triggered");
            triggered.push(hit);
        }
    }
    (triggered, skipped)
}
