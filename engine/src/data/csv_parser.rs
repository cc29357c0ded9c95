use anyhow::{anyhow, Result};
use csv::{ReaderBuilder, StringRecord};
use shared::models::{PricePoint, PriceSeries, Symbol};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::PriceFetcher;
use crate::error::FetchFailure;
use chrono::NaiveDate;

// Field parsing for provider exports: ISO dates (optionally with a time part)
// and plain decimal closes.
pub mod price_format {
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use std::str::FromStr;

    /// Parses `2024-01-02`, `2024-01-02 00:00:00-05:00` or `2024-01-02T00:00:00Z`.
    pub fn parse_date(s: &str) -> Result<NaiveDate> {
        let trimmed = s.trim();
        let date_part = trimmed
            .split(|c| c == ' ' || c == 'T')
            .next()
            .unwrap_or(trimmed);
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| anyhow!("Failed to parse date '{}': {}", s, e))
    }

    pub fn parse_close(s: &str) -> Result<f64> {
        let value = f64::from_str(s.trim())
            .map_err(|e| anyhow!("Failed to parse close '{}': {}", s, e))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow!("Close '{}' is not a finite non-negative number", s));
        }
        Ok(value)
    }

}

const DATE_HEADERS: &[&str] = &["date", "timestamp"];
const CLOSE_HEADERS: &[&str] = &["close"];

pub struct PriceCsvParser;

impl PriceCsvParser {
    // Header: Date,Open,High,Low,Close,Volume (only Date and Close are read)
    // Example row: 2024-01-02,187.15,188.44,183.89,185.64,82488700
    pub fn load_series_from_csv(file_path: &Path, symbol: &Symbol, delimiter: u8) -> Result<PriceSeries> {
        let file = File::open(file_path)
            .map_err(|e| anyhow!("Failed to open CSV file '{}': {}", file_path.display(), e))?;
        Self::parse_series(BufReader::new(file), symbol, delimiter)
    }

    /// Rows with an empty close are treated as absent observations and skipped.
    pub fn parse_series<R: Read>(reader: R, symbol: &Symbol, delimiter: u8) -> Result<PriceSeries> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let date_idx = Self::column_index(&headers, DATE_HEADERS)
            .ok_or_else(|| anyhow!("Missing 'Date' column in CSV header"))?;
        let close_idx = Self::column_index(&headers, CLOSE_HEADERS)
            .ok_or_else(|| anyhow!("Missing 'Close' column in CSV header"))?;

        let mut points = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| anyhow!("Error reading CSV record at line {}: {}", line, e))?;

            let date_str = Self::get_field(&record, date_idx)
                .ok_or_else(|| anyhow!("Missing 'Date' field in CSV record at line {}", line))?;
            let close_str = match Self::get_field(&record, close_idx) {
                Some(s) => s,
                None => {
                    tracing::debug!(%symbol, line, "Skipping row without close");
                    continue;
                }
            };

            let date = price_format::parse_date(date_str)
                .map_err(|e| anyhow!("Error parsing 'Date' at line {}: {}", line, e))?;
            let close = price_format::parse_close(close_str)
                .map_err(|e| anyhow!("Error parsing 'Close' at line {}: {}", line, e))?;

            points.push(PricePoint::new(date, close));
        }
        Ok(PriceSeries::new(symbol.clone(), points))
    }

    fn column_index(headers: &StringRecord, names: &[&str]) -> Option<usize> {
        headers
            .iter()
            .position(|header| names.iter().any(|name| header.trim().eq_ignore_ascii_case(name)))
    }

    fn get_field(record: &StringRecord, idx: usize) -> Option<&str> {
        record.get(idx).map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Reads `<dir>/<SYMBOL>.csv` per request and keeps the rows inside the range.
pub struct CsvDirectoryFetcher {
    dir: std::path::PathBuf,
    delimiter: u8,
}

impl CsvDirectoryFetcher {
    pub fn new(dir: impl Into<std::path::PathBuf>, delimiter: u8) -> Self {
        CsvDirectoryFetcher { dir: dir.into(), delimiter }
    }

    fn path_for(&self, symbol: &Symbol) -> std::path::PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

impl PriceFetcher for CsvDirectoryFetcher {
    fn fetch(&self, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries, FetchFailure> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(FetchFailure::UnknownSymbol(symbol.clone()));
        }
        let mut series = PriceCsvParser::load_series_from_csv(&path, symbol, self.delimiter)
            .map_err(|e| FetchFailure::Source(e.to_string()))?;
        series.points.retain(|p| p.date >= start && p.date <= end);
        if series.is_empty() {
            return Err(FetchFailure::EmptyRange { symbol: symbol.clone(), start, end });
        }
        tracing::debug!(%symbol, count = series.len(), path = %path.display(), "Loaded price series from CSV");
        Ok(series)
    }
}
