// End-to-end: price CSV directory -> dashboard service -> CSV export.
use chrono::NaiveDate;
use engine::data::csv_parser::CsvDirectoryFetcher;
use engine::data::news::JsonNewsSource;
use engine::error::FetchFailure;
use engine::services::{DashboardRequest, DashboardService};
use shared::models::{IndicatorSpec, Symbol};
use shared::utils::parse_symbol_list;
use std::sync::Arc;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn write_fixtures(dir: &TempDir) {
    std::fs::write(
        dir.path().join("AAPL.csv"),
        "Date,Open,High,Low,Close,Volume\n\
         2024-01-02,187.15,188.44,183.89,185.64,82488700\n\
         2024-01-03,184.22,185.88,183.43,184.25,58414500\n\
         2024-01-04,182.15,183.09,180.88,181.91,71983600\n\
         2024-01-05,181.99,182.76,180.17,181.18,62303300\n",
    )
    .unwrap();
    // Listed abroad: trades on a day AAPL does not and misses one AAPL day.
    std::fs::write(
        dir.path().join("XV2.F.csv"),
        "Date,Close\n2024-01-02,0.50\n2024-01-04,0.55\n2024-01-06,0.60\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("BROKEN.csv"), "Date,Close\n2024-01-02,abc\n").unwrap();
}

#[tokio::test]
async fn report_and_export_from_csv_directory() {
    let dir = TempDir::new().unwrap();
    write_fixtures(&dir);

    let fetcher = Arc::new(CsvDirectoryFetcher::new(dir.path(), b','));
    let service = DashboardService::new(fetcher, 2).with_news(Arc::new(JsonNewsSource::new(dir.path())));

    let request = DashboardRequest {
        symbols: parse_symbol_list("aapl, xv2.f, broken, nflx"),
        start: date("2024-01-01"),
        end: date("2024-01-31"),
        normalize: true,
        indicators: vec![IndicatorSpec::Sma { window: 2 }],
        alerts: Vec::new(),
    };
    let report = service.build_report(request).await.unwrap();

    // Outer join: five distinct dates across both surviving symbols.
    assert_eq!(report.table.column_count(), 2);
    assert_eq!(report.table.row_count(), 5);
    assert_eq!(report.fetch_failures.len(), 2);
    assert!(matches!(report.fetch_failures[&Symbol::new("BROKEN")], FetchFailure::Source(_)));
    assert_eq!(
        report.fetch_failures[&Symbol::new("NFLX")],
        FetchFailure::UnknownSymbol(Symbol::new("NFLX"))
    );

    let xv2 = Symbol::new("XV2.F");
    let last = report.table.value(date("2024-01-06"), &xv2).unwrap();
    assert!((last - 120.0).abs() < 1e-9);
    assert_eq!(report.table.value(date("2024-01-03"), &xv2), None);

    let bytes = service.export_csv(&report, true, b',').unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "timestamp,AAPL,XV2.F,AAPL_SMA(2),XV2.F_SMA(2)");
    assert_eq!(lines.len(), 6);
    assert!(lines[2].starts_with("2024-01-03,"));
    assert!(lines[2].ends_with(','), "XV2.F absent on 2024-01-03: {}", lines[2]);
    assert!(lines[5].starts_with("2024-01-06,,"));
}

#[tokio::test]
async fn news_failures_do_not_affect_other_symbols() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("MSFT.json"),
        r#"[
            {"title":"Old story","published":"2020-01-01T08:00:00","link":"https://news.example/old"},
            {"title":"Fresh story","published":"2024-01-05T08:00:00","summary":"Cloud.","link":"https://news.example/new"}
        ]"#,
    )
    .unwrap();

    let fetcher = Arc::new(CsvDirectoryFetcher::new(dir.path(), b','));
    let service = DashboardService::new(fetcher, 1).with_news(Arc::new(JsonNewsSource::new(dir.path())));
    let symbols = vec![Symbol::new("MSFT"), Symbol::new("TSLA")];
    let cutoff = date("2024-01-01").and_hms_opt(0, 0, 0).unwrap();

    let batch = service.headlines(&symbols, cutoff).unwrap();
    let msft = &batch.headlines[&Symbol::new("MSFT")];
    assert_eq!(msft.len(), 1);
    assert_eq!(msft[0].title, "Fresh story");
    assert!(batch.failures.contains_key(&Symbol::new("TSLA")));
}
