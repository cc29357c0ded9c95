// engine/src/services/dashboard_service/mod.rs
// DashboardService owns the collaborators (price fetcher, optional news
// source) and dispatches each operation to a handler submodule.

use crate::aggregator::AlignedTable;
use crate::alerts::{PriceAlert, SkippedAlert, TriggeredAlert};
use crate::data::news::{HeadlineBatch, NewsSource};
use crate::data::PriceFetcher;
use crate::error::{EngineError, FetchFailure, RebaseFailure};
use crate::indicators::DerivedIndicators;
use chrono::{Days, NaiveDate, NaiveDateTime};
use shared::models::{IndicatorSpec, Symbol};
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod build_report;
pub mod export_csv;
pub mod headlines;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub symbols: Vec<Symbol>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub normalize: bool,
    pub indicators: Vec<IndicatorSpec>,
    pub alerts: Vec<PriceAlert>,
}

impl DashboardRequest {
    /// The last `days` days up to and including `end`.
    pub fn for_lookback(symbols: Vec<Symbol>, end: NaiveDate, days: u32) -> Self {
        let start = end.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN);
        DashboardRequest {
            symbols,
            start,
            end,
            normalize: false,
            indicators: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardReport {
    /// Rebased when the request asked for normalization.
    pub table: AlignedTable,
    pub fetch_failures: BTreeMap<Symbol, FetchFailure>,
    pub rebase_failures: BTreeMap<Symbol, RebaseFailure>,
    pub indicators: DerivedIndicators,
    /// Annualized, from unrebased closes.
    pub volatility: BTreeMap<Symbol, Option<f64>>,
    pub triggered_alerts: Vec<TriggeredAlert>,
    pub skipped_alerts: Vec<SkippedAlert>,
}

impl DashboardReport {
    /// Per-symbol problems the report was built around, fetch failures first.
    pub fn warnings(&self) -> Vec<EngineError> {
        let fetch = self.fetch_failures.iter().map(|(symbol, reason)| EngineError::FetchFailure {
            symbol: symbol.clone(),
            reason: reason.clone(),
        });
        let rebase = self.rebase_failures.iter().map(|(symbol, reason)| EngineError::RebaseFailure {
            symbol: symbol.clone(),
            reason: *reason,
        });
        fetch.chain(rebase).collect()
    }
}

pub struct DashboardService {
    fetcher: Arc<dyn PriceFetcher>,
    news: Option<Arc<dyn NewsSource>>,
    max_concurrent_fetches: usize,
}

impl DashboardService {
    pub fn new(fetcher: Arc<dyn PriceFetcher>, max_concurrent_fetches: usize) -> Self {
        DashboardService {
            fetcher,
            news: None,
            max_concurrent_fetches,
        }
    }

    pub fn with_news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    pub async fn build_report(&self, request: DashboardRequest) -> Result<DashboardReport, EngineError> {
        tracing::info!(
            symbols = request.symbols.len(),
            start = %request.start,
            end = %request.end,
            normalize = request.normalize,
            indicators = request.indicators.len(),
            "Received dashboard request, dispatching to handler."
        );
        build_report::handle_build_report(request, Arc::clone(&self.fetcher), self.max_concurrent_fetches).await
    }

    pub fn export_csv(&self, report: &DashboardReport, include_indicators: bool, delimiter: u8) -> Result<Vec<u8>, EngineError> {
        export_csv::handle_export_csv(report, include_indicators, delimiter)
    }

    pub fn headlines(&self, symbols: &[Symbol], cutoff: NaiveDateTime) -> Result<HeadlineBatch, EngineError> {
        let source = self
            .news
            .as_deref()
            .ok_or_else(|| EngineError::ConfigError("No news source configured".to_string()))?;
        tracing::info!(symbols = symbols.len(), %cutoff, "Received headline request, dispatching to handler.");
        Ok(headlines::handle_headlines(symbols, source, cutoff))
    }
}
