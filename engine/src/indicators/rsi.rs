// Relative Strength Index (RSI) indicator implementation, Wilder smoothing
use super::{apply_dated, IndicatorCalculator};
use crate::aggregator::SeriesPoint;
use crate::error::EngineError;
use serde_json::Value;

pub struct Rsi {
    name: String,
    window: usize,
}

impl Rsi {
    pub fn new(window: usize) -> Result<Self, EngineError> {
        if window == 0 {
            return Err(EngineError::InvalidWindow(window));
        }
        Ok(Self {
            name: format!("RSI({})", window),
            window,
        })
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0; // no losses in the window
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

impl IndicatorCalculator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "window": self.window })
    }

    // A missing value makes the adjacent deltas undefined. Smoothing restarts
    // after such a gap and needs `window` fresh deltas before it reports again.
    fn calculate(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        let period = self.window as f64;
        let mut results = vec![None; values.len()];

        let mut seed_gains = 0.0;
        let mut seed_losses = 0.0;
        let mut seed_count = 0usize;
        let mut smoothed: Option<(f64, f64)> = None;

        for i in 1..values.len() {
            let change = match (values[i - 1], values[i]) {
                (Some(prev), Some(curr)) => curr - prev,
                _ => {
                    seed_gains = 0.0;
                    seed_losses = 0.0;
                    seed_count = 0;
                    smoothed = None;
                    continue;
                }
            };
            let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };

            match smoothed {
                Some((avg_gain, avg_loss)) => {
                    let avg_gain = (avg_gain * (period - 1.0) + gain) / period;
                    let avg_loss = (avg_loss * (period - 1.0) + loss) / period;
                    smoothed = Some((avg_gain, avg_loss));
                    results[i] = Some(rsi_value(avg_gain, avg_loss));
                }
                None => {
                    seed_gains += gain;
                    seed_losses += loss;
                    seed_count += 1;
                    if seed_count == self.window {
                        let avg_gain = seed_gains / period;
                        let avg_loss = seed_losses / period;
                        smoothed = Some((avg_gain, avg_loss));
                        results[i] = Some(rsi_value(avg_gain, avg_loss));
                    }
                }
            }
        }
        results
    }
}

/// Wilder RSI over a dated series; the first `window` positions are absent.
pub fn relative_strength_index(series: &[SeriesPoint], window: usize) -> Result<Vec<SeriesPoint>, EngineError> {
    let rsi = Rsi::new(window)?;
    Ok(apply_dated(&rsi, series))
}
