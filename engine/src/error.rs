use chrono::NaiveDate;
use shared::models::Symbol;
use thiserror::Error;

/// Why a collaborator could not produce data for one symbol.
///
/// These are values, not aborts: a batch collects them keyed by symbol and
/// keeps going with the remaining symbols.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(Symbol),

    #[error("no observations for '{symbol}' between {start} and {end}")]
    EmptyRange {
        symbol: Symbol,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("data source error: {0}")]
    Source(String),

    #[error("rejected series: {0}")]
    InvalidSeries(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseFailure {
    #[error("no observations to rebase against")]
    NoData,

    #[error("first observation is zero")]
    ZeroFirstValue,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Fetch failed for '{symbol}': {reason}")]
    FetchFailure { symbol: Symbol, reason: FetchFailure },

    #[error("Rebase failed for '{symbol}': {reason}")]
    RebaseFailure { symbol: Symbol, reason: RebaseFailure },

    #[error("Invalid indicator window {0}: must be at least 1")]
    InvalidWindow(usize),

    #[error("Series for '{symbol}' is not strictly ascending by date: {detail}")]
    UnsortedOrDuplicateInput { symbol: Symbol, detail: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Internal processing error: {0}")]
    ProcessingError(String),
}

impl EngineError {
    /// Folds a per-series problem into the failure kind a batch report carries.
    pub fn into_fetch_failure(self) -> FetchFailure {
        match self {
            EngineError::FetchFailure { reason, .. } => reason,
            other => FetchFailure::InvalidSeries(other.to_string()),
        }
    }
}
