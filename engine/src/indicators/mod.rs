// Technical indicators module
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use rsi::{relative_strength_index, Rsi};
pub use sma::{simple_moving_average, Sma};
pub use volatility::annualized_volatility;

use crate::aggregator::{AlignedTable, SeriesPoint};
use crate::error::EngineError;
use serde_json::Value;
use shared::models::{IndicatorSpec, Symbol};
use std::collections::BTreeMap;

// Common trait for all indicators
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this indicator instance
    // One output per input; None where the indicator is undefined or an input is absent.
    fn calculate(&self, values: &[Option<f64>]) -> Vec<Option<f64>>;
}

pub fn build_calculator(spec: &IndicatorSpec) -> Result<Box<dyn IndicatorCalculator>, EngineError> {
    Ok(match spec {
        IndicatorSpec::Sma { window } => Box::new(Sma::new(*window)?),
        IndicatorSpec::Rsi { window } => Box::new(Rsi::new(*window)?),
    })
}

/// Runs `calculator` over a dated series, keeping the dates.
pub(crate) fn apply_dated(calculator: &dyn IndicatorCalculator, series: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let values: Vec<Option<f64>> = series.iter().map(|(_, v)| *v).collect();
    series
        .iter()
        .zip(calculator.calculate(&values))
        .map(|((date, _), out)| (*date, out))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub spec: IndicatorSpec,
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFailure {
    pub spec: IndicatorSpec,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedIndicators {
    pub series: BTreeMap<Symbol, Vec<DerivedSeries>>,
    pub failures: Vec<IndicatorFailure>,
}

impl DerivedIndicators {
    pub fn for_symbol(&self, symbol: &Symbol) -> &[DerivedSeries] {
        self.series.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Computes every requested indicator for every column of `table`.
///
/// Each symbol's indicator runs over that symbol's own observations, so rows
/// contributed only by other symbols do not open gaps in its window. A spec
/// with an invalid window fails on its own; the other specs still run.
pub fn derive_indicators(table: &AlignedTable, specs: &[IndicatorSpec]) -> DerivedIndicators {
    let mut derived = DerivedIndicators::default();

    for spec in specs {
        let calculator = match build_calculator(spec) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(indicator = %spec.label(), error = %e, "Skipping indicator");
                derived.failures.push(IndicatorFailure { spec: *spec, reason: e.to_string() });
                continue;
            }
        };

        for symbol in table.symbols() {
            let observed: Vec<SeriesPoint> = table
                .observations(symbol)
                .unwrap_or_default()
                .into_iter()
                .map(|(date, value)| (date, Some(value)))
                .collect();
            let points = apply_dated(calculator.as_ref(), &observed);
            tracing::debug!(%symbol, indicator = calculator.name(), parameters = %calculator.parameters(), "Derived indicator series");
            derived.series.entry(symbol.clone()).or_default().push(DerivedSeries {
                spec: *spec,
                name: calculator.name().to_string(),
                points,
            });
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::align;
    use crate::aggregator::tests::{date, series};

    #[test]
    fn test_build_calculator_rejects_zero_window() {
        assert!(matches!(
            build_calculator(&IndicatorSpec::Sma { window: 0 }),
            Err(EngineError::InvalidWindow(0))
        ));
        let rsi = build_calculator(&IndicatorSpec::Rsi { window: 14 }).unwrap();
        assert_eq!(rsi.name(), "RSI(14)");
        assert_eq!(rsi.parameters()["window"], 14);
    }

    #[test]
    fn test_derive_uses_each_symbols_own_rows() {
        // MSFT trades on days AAPL does not; AAPL's SMA(2) must not see those gaps.
        let table = align(vec![
            series("AAPL", &[(1, 10.0), (3, 20.0), (5, 30.0)]),
            series("MSFT", &[(2, 1.0), (4, 1.0)]),
        ]);
        let derived = derive_indicators(&table, &[IndicatorSpec::Sma { window: 2 }]);
        let aapl = derived.for_symbol(&Symbol::new("AAPL"));

        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].name, "SMA(2)");
        assert_eq!(
            aapl[0].points,
            vec![(date(1), None), (date(3), Some(15.0)), (date(5), Some(25.0))]
        );
    }

    #[test]
    fn test_invalid_window_fails_only_that_indicator() {
        let table = align(vec![series("AAPL", &[(1, 1.0), (2, 2.0), (3, 3.0)])]);
        let derived = derive_indicators(
            &table,
            &[IndicatorSpec::Sma { window: 0 }, IndicatorSpec::Rsi { window: 1 }],
        );

        assert_eq!(derived.failures.len(), 1);
        assert_eq!(derived.failures[0].spec, IndicatorSpec::Sma { window: 0 });
        let aapl = derived.for_symbol(&Symbol::new("AAPL"));
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].spec, IndicatorSpec::Rsi { window: 1 });
    }

    #[test]
    fn test_unknown_symbol_has_no_derived_series() {
        let derived = DerivedIndicators::default();
        assert!(derived.for_symbol(&Symbol::new("NONE")).is_empty());
    }
}
