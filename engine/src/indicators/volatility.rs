// Annualized volatility from daily closes.

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Sample standard deviation of daily log returns, scaled by sqrt(252).
///
/// Undefined with fewer than two returns or when any close is not positive.
pub fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    if closes.len() < 3 || closes.iter().any(|c| !(*c > 0.0)) {
        return None;
    }

    let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}
