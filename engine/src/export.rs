//! Delimited-text export of an aligned table.
//!
//! Header is `timestamp` followed by one column per symbol in table order;
//! each row is one aligned date (`YYYY-MM-DD`) and absent values are empty
//! fields.

use crate::aggregator::AlignedTable;
use crate::error::EngineError;
use crate::indicators::DerivedIndicators;
use chrono::NaiveDate;
use csv::WriterBuilder;
use std::collections::HashMap;

pub const TIMESTAMP_HEADER: &str = "timestamp";

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn export_table(table: &AlignedTable, delimiter: u8) -> Result<Vec<u8>, EngineError> {
    export_with_indicators(table, &DerivedIndicators::default(), delimiter)
}

/// Like [`export_table`], plus one `SYMBOL_NAME` column per derived series
/// (e.g. `AAPL_SMA(50)`) after the price columns.
pub fn export_with_indicators(
    table: &AlignedTable,
    derived: &DerivedIndicators,
    delimiter: u8,
) -> Result<Vec<u8>, EngineError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(Vec::new());

    let mut header: Vec<String> = vec![TIMESTAMP_HEADER.to_string()];
    header.extend(table.symbols().map(|s| s.to_string()));

    let mut extra: Vec<HashMap<NaiveDate, Option<f64>>> = Vec::new();
    for symbol in table.symbols() {
        for series in derived.for_symbol(symbol) {
            header.push(format!("{}_{}", symbol, series.name));
            extra.push(series.points.iter().copied().collect());
        }
    }
    writer.write_record(&header)?;

    for (date, values) in table.rows() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(values.into_iter().map(format_value));
        record.extend(extra.iter().map(|points| format_value(points.get(&date).copied().flatten())));
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| EngineError::ProcessingError(format!("Failed to flush CSV export: {}", e)))
}
