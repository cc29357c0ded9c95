// Data sources feeding the aggregator: price files, the in-memory store,
// the TTL cache wrapper and per-symbol news.
pub mod cache;
pub mod csv_parser;
pub mod market_data;
pub mod news;

use crate::error::FetchFailure;
use chrono::NaiveDate;
use shared::models::{PriceSeries, Symbol};

/// Market-data provider seam. One call per symbol, inclusive date range.
///
/// Implementations return the symbol's closes ascending by date, or a
/// [`FetchFailure`] describing why nothing could be produced.
pub trait PriceFetcher: Send + Sync {
    fn fetch(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure>;
}

