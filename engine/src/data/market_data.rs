// In-memory price store; doubles as a fetcher for tests and preloaded data.
use super::PriceFetcher;
use crate::error::FetchFailure;
use chrono::NaiveDate;
use shared::models::{PricePoint, PriceSeries, Symbol};
use std::collections::HashMap;

pub struct MarketDataStore {
    data: HashMap<Symbol, Vec<PricePoint>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        MarketDataStore { data: HashMap::new() }
    }

    /// Merges `series` into whatever is stored for its symbol.
    ///
    /// Points are kept sorted by date; on a repeated date the newer point wins.
    pub fn add_series(&mut self, series: PriceSeries) {
        let stored = self.data.entry(series.symbol).or_default();
        // Newer points first so the stable sort keeps them ahead of older duplicates.
        let mut merged = series.points;
        merged.append(stored);
        merged.sort_by_key(|p| p.date);
        merged.dedup_by_key(|p| p.date);
        *stored = merged;
    }

    pub fn get_series(&self, symbol: &Symbol, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<PriceSeries> {
        self.data.get(symbol).map(|points| {
            let points = points
                .iter()
                .filter(|p| from.map_or(true, |start| p.date >= start))
                .filter(|p| to.map_or(true, |end| p.date <= end))
                .copied()
                .collect();
            PriceSeries::new(symbol.clone(), points)
        })
    }
}

impl Default for MarketDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFetcher for MarketDataStore {
    fn fetch(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
        let series = self
            .get_series(symbol, Some(start), Some(end))
            .ok_or_else(|| FetchFailure::UnknownSymbol(symbol.clone()))?;
        if series.is_empty() {
            return Err(FetchFailure::EmptyRange { symbol: symbol.clone(), start, end });
        }
        Ok(series)
    }
}
