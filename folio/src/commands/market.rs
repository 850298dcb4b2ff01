use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::Args;
use schwab_api::endpoints::market_data::{FrequencyType, PeriodType, PriceHistory, QuotesResponse};
use schwab_api::{Client, Request};

use crate::output::{self, money, OutputFormat};

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Ticker symbol, e.g. AAPL
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Ticker symbol, e.g. AAPL
    pub symbol: String,

    /// day, month, year or ytd
    #[arg(long)]
    pub period_type: Option<PeriodType>,

    /// Number of periods
    #[arg(long)]
    pub period: Option<u32>,

    /// minute, daily, weekly or monthly
    #[arg(long)]
    pub frequency_type: Option<FrequencyType>,

    #[arg(long)]
    pub frequency: Option<u32>,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Include pre- and post-market candles
    #[arg(long)]
    pub extended_hours: bool,

    /// Number of returns used for the volatility figure
    #[arg(long, default_value_t = 20)]
    pub volatility_window: usize,
}

pub async fn quote(args: &QuoteArgs, api: &Client, format: OutputFormat) -> Result<()> {
    let symbol = args.symbol.to_uppercase();
    let quotes = api.send(Request::market_data().quotes(symbol.as_str())).await?;

    if quotes.is_empty() {
        return Err(anyhow!("No quote returned for {}", symbol));
    }

    output::print(&quotes, format, print_quotes)
}

pub async fn history(args: &HistoryArgs, api: &Client, format: OutputFormat) -> Result<()> {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        if start > end {
            return Err(anyhow!("--start {} is after --end {}", start, end));
        }
    }

    let mut request = Request::market_data().price_history(args.symbol.to_uppercase());
    if let Some(period_type) = args.period_type {
        request = request.period_type(period_type);
    }
    if let Some(period) = args.period {
        request = request.period(period);
    }
    if let Some(frequency_type) = args.frequency_type {
        request = request.frequency_type(frequency_type);
    }
    if let Some(frequency) = args.frequency {
        request = request.frequency(frequency);
    }
    if let Some(start) = args.start {
        request = request.start_date(start);
    }
    if let Some(end) = args.end {
        request = request.end_date(end);
    }
    if args.extended_hours {
        request = request.need_extended_hours_data(true);
    }

    let history = api.send(request).await?;
    tracing::info!(symbol = %history.symbol, candles = history.candles.len(), "Loaded price history");

    output::print(&history, format, |history| {
        print_history(history, args.volatility_window)
    })
}

fn print_quotes(quotes: &QuotesResponse) {
    let mut symbols: Vec<_> = quotes.keys().collect();
    symbols.sort();

    for symbol in symbols {
        let entry = &quotes[symbol];
        let quote = entry.quote.clone().unwrap_or_default();
        let description = entry
            .reference
            .as_ref()
            .and_then(|r| r.description.as_deref())
            .unwrap_or("");

        println!("{} {}", entry.symbol, description);
        println!(
            "  last {}  bid {}  ask {}  change {} ({}%)",
            money(quote.last_price),
            money(quote.bid_price),
            money(quote.ask_price),
            money(quote.net_change),
            money(quote.net_percent_change),
        );
        println!(
            "  52w range {} - {}  volume {}",
            money(quote.low_52_week),
            money(quote.high_52_week),
            quote
                .total_volume
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        );
        if let Some(time) = quote.quote_time {
            println!("  as of {} UTC", time);
        }
    }
}

fn print_history(history: &PriceHistory, volatility_window: usize) {
    if history.empty || history.candles.is_empty() {
        println!("No price history for {}.", history.symbol);
        return;
    }

    println!(
        "{:<17} {:>10} {:>10} {:>10} {:>10} {:>12}",
        "DATE (UTC)", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"
    );
    for candle in &history.candles {
        println!(
            "{:<17} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}",
            candle.datetime.to_string(),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume,
        );
    }

    match history.annualized_volatility(volatility_window) {
        Some(volatility) => println!(
            "\nAnnualized volatility ({} returns): {:.2}%",
            volatility_window,
            volatility * 100.0
        ),
        None => println!(
            "\nNot enough candles for a {}-return volatility figure.",
            volatility_window
        ),
    }
}

