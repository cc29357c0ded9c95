// Handler for recent headlines per symbol.
use chrono::NaiveDateTime;
use shared::models::Symbol;

use crate::data::news::{collect_headlines, HeadlineBatch, NewsSource};

pub fn handle_headlines(symbols: &[Symbol], source: &dyn NewsSource, cutoff: NaiveDateTime) -> HeadlineBatch {
    let batch = collect_headlines(symbols, source, cutoff);
    if batch.headlines.values().all(Vec::is_empty) {
        tracing::info!(%cutoff, "No recent headlines for any symbol");
    }
    batch
}
