// Price alerts checked against a symbol's latest close.
use crate::error::{EngineError, FetchFailure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{PriceSeries, Symbol};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub symbol: Symbol,
    pub target: f64,
    pub direction: AlertDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredAlert {
    pub alert: PriceAlert,
    pub date: NaiveDate,
    pub close: f64,
}

impl fmt::Display for TriggeredAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.alert.direction {
            AlertDirection::Above => "rose above",
            AlertDirection::Below => "fell below",
        };
        write!(
            f,
            "{} {} {:.2} (close {:.2} on {})",
            self.alert.symbol, verb, self.alert.target, self.close, self.date
        )
    }
}

/// An alert that could not be checked because its symbol had no prices.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAlert {
    pub alert: PriceAlert,
    pub reason: FetchFailure,
}

impl fmt::Display for SkippedAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert on {} not checked: {}", self.alert.symbol, self.reason)
    }
}

impl PriceAlert {
    /// Strict comparison: a close equal to the target does not trigger.
    pub fn evaluate(&self, series: &PriceSeries) -> Option<TriggeredAlert> {
        let latest = series.last()?;
        let hit = match self.direction {
            AlertDirection::Above => latest.close > self.target,
            AlertDirection::Below => latest.close < self.target,
        };
        hit.then(|| TriggeredAlert {
            alert: self.clone(),
            date: latest.date,
            close: latest.close,
        })
    }
}

impl FromStr for PriceAlert {
    type Err = EngineError;

    /// Parses `SYMBOL:above:PRICE` or `SYMBOL:below:PRICE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [symbol, direction, target] = parts.as_slice() else {
            return Err(EngineError::ConfigError(format!("Alert '{}' must look like SYMBOL:above|below:PRICE", s)));
        };
        let direction = match direction.to_lowercase().as_str() {
            "above" => AlertDirection::Above,
            "below" => AlertDirection::Below,
            other => return Err(EngineError::ConfigError(format!("Unknown alert direction '{}'", other))),
        };
        let target: f64 = target
            .parse()
            .map_err(|e| EngineError::ConfigError(format!("Invalid alert price '{}': {}", target, e)))?;
        if symbol.is_empty() || !target.is_finite() || target < 0.0 {
            return Err(EngineError::ConfigError(format!("Invalid alert '{}'", s)));
        }
        Ok(PriceAlert {
            symbol: Symbol::new(symbol.to_uppercase()),
            target,
            direction,
        })
    }
}
