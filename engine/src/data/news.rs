// Per-symbol headlines. Filtering by age is a display concern; the engine
// only offers the helper and keeps one symbol's failure away from the others.
use crate::error::FetchFailure;
use chrono::NaiveDateTime;
use shared::models::{NewsItem, Symbol};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub trait NewsSource: Send + Sync {
    fn headlines(&self, symbol: &Symbol) -> Result<Vec<NewsItem>, FetchFailure>;
}

/// Reads `<dir>/<SYMBOL>.json`, a JSON array of news items.
///
/// Entries that do not deserialize are skipped; only an unreadable file or a
/// top level that is not an array fails the symbol.
pub struct JsonNewsSource {
    dir: PathBuf,
}

impl JsonNewsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonNewsSource { dir: dir.into() }
    }
}

impl NewsSource for JsonNewsSource {
    fn headlines(&self, symbol: &Symbol) -> Result<Vec<NewsItem>, FetchFailure> {
        let path = self.dir.join(format!("{}.json", symbol));
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FetchFailure::UnknownSymbol(symbol.clone())
            } else {
                FetchFailure::Source(format!("Failed to read '{}': {}", path.display(), e))
            }
        })?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| FetchFailure::Source(format!("Invalid news JSON in '{}': {}", path.display(), e)))?;

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<NewsItem>(entry) {
                Ok(item) => items.push(item),
                Err(e) => tracing::debug!(%symbol, index, error_detail = %e, "Skipping malformed news entry"),
            }
        }
        Ok(items)
    }
}

/// Items published at or after `cutoff`, newest first.
pub fn recent_headlines(items: Vec<NewsItem>, cutoff: NaiveDateTime) -> Vec<NewsItem> {
    let mut recent: Vec<NewsItem> = items.into_iter().filter(|item| item.published >= cutoff).collect();
    recent.sort_by(|a, b| b.published.cmp(&a.published));
    recent
}

pub struct HeadlineBatch {
    pub headlines: BTreeMap<Symbol, Vec<NewsItem>>,
    pub failures: BTreeMap<Symbol, FetchFailure>,
}

pub fn collect_headlines<S: NewsSource + ?Sized>(symbols: &[Symbol], source: &S, cutoff: NaiveDateTime) -> HeadlineBatch {
    let mut batch = HeadlineBatch {
        headlines: BTreeMap::new(),
        failures: BTreeMap::new(),
    };
    for symbol in symbols {
        match source.headlines(symbol) {
            Ok(items) => {
                let recent = recent_headlines(items, cutoff);
                tracing::debug!(%symbol, count = recent.len(), "Collected recent headlines");
                batch.headlines.insert(symbol.clone(), recent);
            }
            Err(reason) => {
                tracing::warn!(%symbol, error = %reason, "Could not load news");
                batch.failures.insert(symbol.clone(), reason);
            }
        }
    }
    batch
}
