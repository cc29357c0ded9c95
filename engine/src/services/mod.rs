// Entry points the presentation layer calls into.
pub mod dashboard_service;

pub use dashboard_service::{DashboardReport, DashboardRequest, DashboardService};
