//! Series aggregation: per-symbol closes merged into one date-aligned table,
//! optionally rebased so every symbol starts at 100.
//!
//! Alignment is an outer join. The row index is the sorted union of every
//! contributing date and a symbol without an observation on a row is simply
//! absent there; nothing is interpolated or forward-filled.

pub mod batch;

pub use batch::{batch_fetch_and_align, batch_fetch_and_align_concurrent, BatchOutcome};

use crate::error::{EngineError, RebaseFailure};
use chrono::NaiveDate;
use shared::models::{PriceSeries, Symbol};
use std::collections::{BTreeMap, BTreeSet};

/// One row of a column: the date and the value if the symbol traded that day.
pub type SeriesPoint = (NaiveDate, Option<f64>);

#[derive(Debug, Clone, PartialEq)]
struct Column {
    symbol: Symbol,
    values: BTreeMap<NaiveDate, f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    index: BTreeSet<NaiveDate>,
    // Insertion order is the column order of exports.
    columns: Vec<Column>,
}

impl AlignedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the column for `series.symbol`.
    ///
    /// Re-inserting a symbol is idempotent, so columns may arrive one at a
    /// time and in any order. The series is validated first and rejected
    /// without touching the table if it is unsorted or has duplicate dates.
    pub fn insert_series(&mut self, series: PriceSeries) -> Result<(), EngineError> {
        validate_series(&series)?;
        let values: BTreeMap<NaiveDate, f64> = series.points.iter().map(|p| (p.date, p.close)).collect();

        match self.columns.iter_mut().find(|c| c.symbol == series.symbol) {
            Some(existing) => {
                existing.values = values;
                self.rebuild_index();
            }
            None => {
                self.index.extend(values.keys().copied());
                self.columns.push(Column { symbol: series.symbol, values });
            }
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        self.index = self.columns.iter().flat_map(|c| c.values.keys().copied()).collect();
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.index.iter().copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.columns.iter().map(|c| &c.symbol)
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.columns.is_empty()
    }

    pub fn contains_symbol(&self, symbol: &Symbol) -> bool {
        self.columns.iter().any(|c| &c.symbol == symbol)
    }

    pub fn value(&self, date: NaiveDate, symbol: &Symbol) -> Option<f64> {
        self.find_column(symbol).and_then(|c| c.values.get(&date).copied())
    }

    /// The symbol's column over the full row index.
    pub fn column(&self, symbol: &Symbol) -> Option<Vec<SeriesPoint>> {
        self.find_column(symbol)
            .map(|c| self.index.iter().map(|d| (*d, c.values.get(d).copied())).collect())
    }

    /// Only the rows where the symbol is present, in date order.
    pub fn observations(&self, symbol: &Symbol) -> Option<Vec<(NaiveDate, f64)>> {
        self.find_column(symbol)
            .map(|c| c.values.iter().map(|(d, v)| (*d, *v)).collect())
    }

    /// Rows in date order, one value slot per column in column order.
    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<Option<f64>>)> + '_ {
        self.index.iter().map(move |d| {
            let values = self.columns.iter().map(|c| c.values.get(d).copied()).collect();
            (*d, values)
        })
    }

    fn find_column(&self, symbol: &Symbol) -> Option<&Column> {
        self.columns.iter().find(|c| &c.symbol == symbol)
    }
}

/// Rejects a series whose dates are not strictly ascending or whose closes
/// are negative or not finite.
pub fn validate_series(series: &PriceSeries) -> Result<(), EngineError> {
    for pair in series.points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(EngineError::UnsortedOrDuplicateInput {
                symbol: series.symbol.clone(),
                detail: format!("{} follows {}", pair[1].date, pair[0].date),
            });
        }
    }
    if let Some(bad) = series.points.iter().find(|p| !p.close.is_finite() || p.close < 0.0) {
        return Err(EngineError::UnsortedOrDuplicateInput {
            symbol: series.symbol.clone(),
            detail: format!("close {} on {} is not a finite non-negative price", bad.close, bad.date),
        });
    }
    Ok(())
}

/// Outer-joins the given series into one table.
///
/// Empty input is an empty table. A series that fails validation is logged
/// and left out; batch callers validate beforehand and report it per symbol.
pub fn align<I>(series: I) -> AlignedTable
where
    I: IntoIterator<Item = PriceSeries>,
{
    let mut table = AlignedTable::new();
    for s in series {
        let symbol = s.symbol.clone();
        if let Err(e) = table.insert_series(s) {
            tracing::warn!(%symbol, error = %e, "Series rejected during alignment");
        }
    }
    tracing::debug!(rows = table.row_count(), columns = table.column_count(), "Aligned price table");
    table
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebaseOutcome {
    pub table: AlignedTable,
    /// Symbols left with their original values.
    pub failures: BTreeMap<Symbol, RebaseFailure>,
}

/// Rescales each column so its first present value becomes 100.
///
/// Columns are independent: one that has no data or starts at zero keeps its
/// original values and is reported in `failures`.
pub fn rebase(mut table: AlignedTable) -> RebaseOutcome {
    let mut failures = BTreeMap::new();
    for column in table.columns.iter_mut() {
        let base = match column.values.values().next().copied() {
            None => Err(RebaseFailure::NoData),
            Some(v0) if v0 == 0.0 => Err(RebaseFailure::ZeroFirstValue),
            Some(v0) => Ok(v0),
        };
        match base {
            Ok(v0) => {
                for value in column.values.values_mut() {
                    *value = *value / v0 * 100.0;
                }
            }
            Err(reason) => {
                tracing::warn!(symbol = %column.symbol, %reason, "Leaving column unrebased");
                failures.insert(column.symbol.clone(), reason);
            }
        }
    }
    RebaseOutcome { table, failures }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use shared::models::PricePoint;

    pub(crate) fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    pub(crate) fn series(symbol: &str, points: &[(u32, f64)]) -> PriceSeries {
        PriceSeries::new(
            Symbol::new(symbol),
            points.iter().map(|&(d, c)| PricePoint::new(date(d), c)).collect(),
        )
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let v = actual.expect("value should be present");
        assert!((v - expected).abs() < 1e-9, "{} != {}", v, expected);
    }

    #[test]
    fn test_align_is_outer_join() {
        let a = series("AAPL", &[(1, 10.0), (2, 11.0), (4, 12.0)]);
        let b = series("MSFT", &[(2, 20.0), (3, 21.0)]);
        let table = align(vec![a.clone(), b.clone()]);

        let dates: Vec<NaiveDate> = table.dates().collect();
        assert_eq!(dates, vec![date(1), date(2), date(3), date(4)]);

        for s in [&a, &b] {
            for p in &s.points {
                assert_eq!(table.value(p.date, &s.symbol), Some(p.close));
            }
        }
        assert_eq!(table.value(date(3), &Symbol::new("AAPL")), None);
        assert_eq!(table.value(date(1), &Symbol::new("MSFT")), None);
    }

    #[test]
    fn test_align_is_order_independent() {
        let a = series("AAPL", &[(1, 10.0), (5, 11.0)]);
        let b = series("MSFT", &[(2, 20.0), (3, 21.0)]);
        let forward = align(vec![a.clone(), b.clone()]);
        let backward = align(vec![b, a]);
        let aapl = Symbol::new("AAPL");
        assert_eq!(forward.column(&aapl), backward.column(&aapl));
        assert_eq!(forward.row_count(), backward.row_count());
    }

    #[test]
    fn test_align_empty_input() {
        let table = align(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_single_point_series_contributes_row() {
        let table = align(vec![series("XV2.F", &[(7, 0.42)])]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.value(date(7), &Symbol::new("XV2.F")), Some(0.42));
    }

    #[test]
    fn test_reinserting_symbol_replaces_column() {
        let mut table = AlignedTable::new();
        table.insert_series(series("AAPL", &[(1, 1.0), (9, 2.0)])).unwrap();
        table.insert_series(series("AAPL", &[(2, 5.0)])).unwrap();
        assert_eq!(table.column_count(), 1);
        assert_eq!(table.dates().collect::<Vec<_>>(), vec![date(2)]);
    }

    #[test]
    fn test_unsorted_series_rejected_without_touching_others() {
        let mut table = AlignedTable::new();
        table.insert_series(series("AAPL", &[(1, 1.0)])).unwrap();
        let err = table.insert_series(series("BAD", &[(3, 1.0), (2, 1.0)])).unwrap_err();
        assert!(matches!(err, EngineError::UnsortedOrDuplicateInput { .. }));

        let dup = table.insert_series(series("DUP", &[(3, 1.0), (3, 2.0)]));
        assert!(dup.is_err());

        assert_eq!(table.column_count(), 1);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_rebase_scales_to_100() {
        let table = align(vec![series("AAPL", &[(1, 50.0), (2, 75.0), (3, 25.0)])]);
        let outcome = rebase(table);
        let aapl = Symbol::new("AAPL");
        assert!(outcome.failures.is_empty());
        assert_close(outcome.table.value(date(1), &aapl), 100.0);
        assert_close(outcome.table.value(date(2), &aapl), 150.0);
        assert_close(outcome.table.value(date(3), &aapl), 50.0);
    }

    #[test]
    fn test_rebase_uses_first_present_row() {
        // MSFT has nothing on the first table row; its own first value is the base.
        let table = align(vec![
            series("AAPL", &[(1, 10.0), (2, 10.0)]),
            series("MSFT", &[(2, 40.0), (3, 20.0)]),
        ]);
        let outcome = rebase(table);
        let msft = Symbol::new("MSFT");
        assert_eq!(outcome.table.value(date(1), &msft), None);
        assert_close(outcome.table.value(date(2), &msft), 100.0);
        assert_close(outcome.table.value(date(3), &msft), 50.0);
    }

    #[test]
    fn test_rebase_noop_when_already_at_100() {
        let table = align(vec![series("AAPL", &[(1, 100.0), (2, 103.7), (3, 98.2)])]);
        let outcome = rebase(table.clone());
        let aapl = Symbol::new("AAPL");
        for d in table.dates() {
            let before = table.value(d, &aapl).unwrap();
            assert_close(outcome.table.value(d, &aapl), before);
        }
    }

    #[test]
    fn test_rebase_isolates_zero_start() {
        let table = align(vec![
            series("AAPL", &[(1, 40.0), (2, 44.0), (3, 38.0)]),
            series("ZERO", &[(1, 0.0), (2, 5.0)]),
        ]);
        let outcome = rebase(table);
        let aapl = Symbol::new("AAPL");
        let zero = Symbol::new("ZERO");

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[&zero], RebaseFailure::ZeroFirstValue);

        for (d, v) in [(1, 40.0), (2, 44.0), (3, 38.0)] {
            assert_close(outcome.table.value(date(d), &aapl), 100.0 * v / 40.0);
        }
        // Failed column stays, unrebased.
        assert_eq!(outcome.table.value(date(2), &zero), Some(5.0));
    }

    #[test]
    fn test_rebase_reports_empty_column() {
        let table = align(vec![series("EMPTY", &[]), series("AAPL", &[(1, 2.0)])]);
        let outcome = rebase(table);
        assert_eq!(outcome.failures[&Symbol::new("EMPTY")], RebaseFailure::NoData);
        assert!(outcome.table.contains_symbol(&Symbol::new("EMPTY")));
        assert_close(outcome.table.value(date(1), &Symbol::new("AAPL")), 100.0);
    }
}
