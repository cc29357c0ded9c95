// Simple Moving Average (SMA) indicator implementation
use super::{apply_dated, IndicatorCalculator};
use crate::aggregator::SeriesPoint;
use crate::error::EngineError;
use serde_json::Value;

pub struct Sma {
    name: String,
    window: usize,
}

impl Sma {
    pub fn new(window: usize) -> Result<Self, EngineError> {
        if window == 0 {
            return Err(EngineError::InvalidWindow(window));
        }
        Ok(Self {
            name: format!("SMA({})", window),
            window,
        })
    }
}

impl IndicatorCalculator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "window": self.window })
    }

    fn calculate(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut results = vec![None; values.len()];
        if values.len() < self.window {
            return results;
        }

        for i in (self.window - 1)..values.len() {
            let trailing = &values[i + 1 - self.window..=i];
            // Any gap inside the window leaves this position undefined.
            let sum: Option<f64> = trailing.iter().copied().sum();
            results[i] = sum.map(|s| s / self.window as f64);
        }
        results
    }
}

/// Trailing mean over `window` positions of a dated series.
pub fn simple_moving_average(series: &[SeriesPoint], window: usize) -> Result<Vec<SeriesPoint>, EngineError> {
    let sma = Sma::new(window)?;
    Ok(apply_dated(&sma, series))
}
