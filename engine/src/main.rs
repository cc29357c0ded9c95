// Engine main entry point: build one comparison report from local price files.
use anyhow::{bail, Context};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use engine::alerts::PriceAlert;
use engine::config::settings::EngineSettings;
use engine::data::csv_parser::CsvDirectoryFetcher;
use engine::data::news::JsonNewsSource;
use engine::data::PriceFetcher;
use engine::services::{DashboardReport, DashboardRequest, DashboardService};
use shared::utils::parse_symbol_list;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "engine", about = "Compare daily closes of several tickers side by side")]
struct Cli {
    /// Settings file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated tickers, e.g. AAPL,MSFT,XV2.F
    #[arg(long)]
    symbols: String,

    /// Lookback in days, ending at --end
    #[arg(long)]
    days: Option<u32>,

    /// Last day of the range (YYYY-MM-DD); today when omitted
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Keep raw closes instead of rebasing every symbol to 100
    #[arg(long)]
    no_normalize: bool,

    /// SMA window; repeat for several
    #[arg(long = "sma")]
    sma_windows: Vec<usize>,

    #[arg(long)]
    rsi: Option<usize>,

    /// Write the aligned table as CSV to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Append indicator columns to the CSV export
    #[arg(long)]
    with_indicators: bool,

    /// Show recent headlines for every symbol
    #[arg(long)]
    news: bool,

    /// SYMBOL:above|below:PRICE; repeat for several
    #[arg(long = "alert")]
    alerts: Vec<PriceAlert>,
}

fn apply_overrides(mut settings: EngineSettings, cli: &Cli) -> EngineSettings {
    if let Some(days) = cli.days {
        settings.lookback_days = days;
    }
    if cli.no_normalize {
        settings.normalize = false;
    }
    if !cli.sma_windows.is_empty() {
        settings.sma_windows = cli.sma_windows.clone();
    }
    if cli.rsi.is_some() {
        settings.rsi_window = cli.rsi;
    }
    settings
}

fn print_report(report: &DashboardReport) {
    for warning in report.warnings() {
        println!("warning: {}", warning);
    }
    for failure in &report.indicators.failures {
        println!("warning: {} skipped: {}", failure.spec.label(), failure.reason);
    }
    if report.table.column_count() == 0 {
        println!("No valid price data found.");
        return;
    }

    let symbols: Vec<String> = report.table.symbols().map(|s| s.to_string()).collect();
    println!("{:<10} {}", "date", symbols.iter().map(|s| format!("{:>10}", s)).collect::<String>());
    for (date, values) in report.table.rows() {
        let cells: String = values
            .iter()
            .map(|v| match v {
                Some(v) => format!("{:>10.2}", v),
                None => format!("{:>10}", "-"),
            })
            .collect();
        println!("{} {}", date, cells);
    }

    for (symbol, vol) in &report.volatility {
        match vol {
            Some(v) => println!("Volatility of {}: {:.2}%", symbol, v * 100.0),
            None => println!("Volatility of {}: not enough data", symbol),
        }
    }
    for hit in &report.triggered_alerts {
        println!("ALERT: {}", hit);
    }
    for skipped in &report.skipped_alerts {
        println!("warning: {}", skipped);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };
    let settings = apply_overrides(settings, &cli);
    settings.validate()?;
    let delimiter = settings.delimiter()?;

    let symbols = parse_symbol_list(&cli.symbols);
    if symbols.is_empty() {
        bail!("Please pass at least one ticker with --symbols");
    }
    info!(symbols = ?symbols, data_dir = %settings.data_dir.display(), "Starting dashboard engine");

    let fetcher: Arc<dyn PriceFetcher> = Arc::new(CsvDirectoryFetcher::new(settings.data_dir.clone(), delimiter));
    let service = DashboardService::new(fetcher, settings.max_concurrent_fetches)
        .with_news(Arc::new(JsonNewsSource::new(settings.news_dir.clone())));

    let end = cli.end.unwrap_or_else(|| Local::now().date_naive());
    let mut request = DashboardRequest::for_lookback(symbols.clone(), end, settings.lookback_days);
    request.normalize = settings.normalize;
    request.indicators = settings.indicator_specs();
    request.alerts = cli.alerts.clone();

    let report = service.build_report(request).await?;
    print_report(&report);

    if let Some(path) = &cli.output {
        let bytes = service.export_csv(&report, cli.with_indicators, delimiter)?;
        std::fs::write(path, bytes).with_context(|| format!("Failed to write CSV to '{}'", path.display()))?;
        info!(path = %path.display(), "CSV export written");
    }

    if cli.news {
        let cutoff = Local::now()
            .naive_local()
            .checked_sub_days(Days::new(u64::from(settings.news_days)))
            .context("News cutoff out of range")?;
        let batch = service.headlines(&symbols, cutoff)?;
        for symbol in &symbols {
            println!();
            println!("News for {}", symbol);
            if let Some(reason) = batch.failures.get(symbol) {
                println!("  no news found: {}", reason);
                continue;
            }
            let items = batch.headlines.get(symbol).map(Vec::as_slice).unwrap_or(&[]);
            if items.is_empty() {
                println!("  no headlines in the last {} days", settings.news_days);
            }
            for item in items {
                println!("  {}  {}", item.published.format("%Y-%m-%d %H:%M"), item.title);
                if !item.summary.is_empty() {
                    println!("    {}", item.summary);
                }
                println!("    {}", item.link);
            }
        }
    }

    Ok(())
}
