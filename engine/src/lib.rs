// Engine library root: series aggregation, indicators and the data
// collaborators behind the stock comparison dashboard.

pub mod aggregator;
pub mod alerts;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod indicators;
pub mod services;

pub use aggregator::{align, batch_fetch_and_align, rebase, AlignedTable};
pub use error::{EngineError, FetchFailure, RebaseFailure};
