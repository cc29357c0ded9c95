use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque instrument identifier, e.g. `AAPL` or `XV2.F`.
///
/// Nothing inside the string is interpreted; it is passed through to the
/// market-data and news collaborators as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(value: impl Into<String>) -> Self {
        Symbol(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Symbol(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }
}

/// Daily closes for one symbol, expected ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Self {
        PriceSeries { symbol, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub published: NaiveDateTime,
    #[serde(default)]
    pub summary: String,
    pub link: String,
}

/// A derived series requested for every symbol in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndicatorSpec {
    Sma { window: usize },
    Rsi { window: usize },
}

impl IndicatorSpec {
    /// Column-friendly label such as `SMA(50)`.
    pub fn label(&self) -> String {
        match self {
            IndicatorSpec::Sma { window } => format!("SMA({})", window),
            IndicatorSpec::Rsi { window } => format!("RSI({})", window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_spec_deserializes_from_tagged_json() {
        let spec: IndicatorSpec = serde_json::from_str(r#"{"kind":"rsi","window":14}"#).unwrap();
        assert_eq!(spec, IndicatorSpec::Rsi { window: 14 });
        assert_eq!(spec.label(), "RSI(14)");
    }

    #[test]
    fn symbol_serializes_as_plain_string() {
        let json = serde_json::to_string(&Symbol::new("XV2.F")).unwrap();
        assert_eq!(json, "\"XV2.F\"");
    }
}
