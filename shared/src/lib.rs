pub mod models;
pub mod utils;

pub use models::{IndicatorSpec, NewsItem, PricePoint, PriceSeries, Symbol};
