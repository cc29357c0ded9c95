// Handler for the CSV download of a report.
use super::DashboardReport;
use crate::error::EngineError;
use crate::export::{export_table, export_with_indicators};

pub fn handle_export_csv(report: &DashboardReport, include_indicators: bool, delimiter: u8) -> Result<Vec<u8>, EngineError> {
    let bytes = if include_indicators {
        export_with_indicators(&report.table, &report.indicators, delimiter)?
    } else {
        export_table(&report.table, delimiter)?
    };
    tracing::debug!(bytes = bytes.len(), rows = report.table.row_count(), include_indicators, "Exported report as CSV");
    Ok(bytes)
}
