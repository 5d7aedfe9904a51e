//! Sentitrade CLI: decision cycles, backtests, lookups and the HTTP API.
//!
//! Commands:
//! - `cycle`: run decision cycles for one symbol against the configured broker
//! - `backtest`: monthly-momentum backtest for one or more symbols
//! - `quote`, `sentiment`, `options`: one-off market lookups
//! - `trades`: recent journaled trades
//! - `serve`: JSON HTTP API driving the bot

mod handlers;
mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use sentitrade_core::broker::EnvCredentials;
use sentitrade_core::domain::{normalize_symbol, TradeDecision};
use sentitrade_runner::export::{backtest_trades_csv, batch_summary_csv, trade_records_csv};
use sentitrade_runner::{
    BacktestJob, BacktestOutcome, BacktestReport, BacktestRequest, BacktestSimulator, BatchRunner,
    BotController, Gateways, JsonlStore, NullStore, SentitradeConfig, TradeStore,
};

use crate::server::ApiServer;

#[derive(Parser)]
#[command(
    name = "sentitrade",
    about = "Sentitrade CLI, news-sentiment trading bot and backtester"
)]
struct Cli {
    /// Path to a TOML config file. Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: demo prices, synthetic history, simulated broker.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run decision cycles for one symbol.
    Cycle {
        /// Symbol to trade. Defaults to the configured one.
        #[arg(long)]
        symbol: Option<String>,

        /// Fraction of available cash per buy, in [0, 1].
        #[arg(long)]
        position_size: Option<f64>,

        /// Number of cycles to run back to back.
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Backtest one or more symbols over a date range.
    Backtest {
        /// Symbols to backtest (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Starting capital. Defaults to the configured one.
        #[arg(long)]
        capital: Option<f64>,

        /// Write the sampled trades of a single-symbol run as CSV.
        #[arg(long)]
        trades_csv: Option<PathBuf>,

        /// Run batch jobs one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Current price for a symbol.
    Quote { symbol: String },
    /// Sentiment estimate for a symbol.
    Sentiment { symbol: String },
    /// Option chain around the current price.
    Options { symbol: String },
    /// Recent journaled trades, newest first.
    Trades {
        #[arg(long, default_value_t = sentitrade_runner::DEFAULT_HISTORY_LIMIT)]
        limit: usize,

        /// Print CSV instead of a table.
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Serve the JSON HTTP API.
    Serve {
        /// Listen address. Defaults to the configured one.
        #[arg(long)]
        addr: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref(), cli.offline)?;
    let bot = build_controller(config)?;

    match cli.command {
        Commands::Cycle {
            symbol,
            position_size,
            count,
        } => run_cycles(&bot, symbol.as_deref(), position_size, count),
        Commands::Backtest {
            symbols,
            start,
            end,
            capital,
            trades_csv,
            sequential,
        } => run_backtest_cmd(&bot, &symbols, &start, &end, capital, trades_csv, sequential),
        Commands::Quote { symbol } => {
            let q = bot.quote(&symbol)?;
            println!("{} {:.2} ({:?}, {})", q.symbol, q.price, q.source, q.timestamp);
            Ok(())
        }
        Commands::Sentiment { symbol } => {
            let symbol = normalize_symbol(&symbol);
            if symbol.is_empty() {
                bail!("symbol is required");
            }
            let (result, source) = bot.session().sentiment(&symbol);
            println!(
                "{symbol}: {} ({}) probability {:.3} from {source:?}",
                result.label,
                result.label.as_external(),
                result.probability
            );
            Ok(())
        }
        Commands::Options { symbol } => run_options(&bot, &symbol),
        Commands::Trades { limit, csv } => run_trades(&bot, limit, csv),
        Commands::Serve { addr } => run_serve(bot, addr),
    }
}

fn load_config(path: Option<&Path>, offline: bool) -> Result<SentitradeConfig> {
    let mut config = match path {
        Some(p) => SentitradeConfig::from_file(p)?,
        None => SentitradeConfig::default(),
    };
    if offline {
        config.data.offline = true;
    }
    Ok(config)
}

fn build_controller(config: SentitradeConfig) -> Result<BotController> {
    let gateways = Gateways::from_config(&config, &EnvCredentials::alpaca())?;
    let store: Arc<dyn TradeStore> = if config.storage.enabled {
        Arc::new(JsonlStore::new(&config.storage.dir))
    } else {
        Arc::new(NullStore)
    };
    Ok(BotController::new(config, gateways, store))
}

fn run_cycles(
    bot: &BotController,
    symbol: Option<&str>,
    position_size: Option<f64>,
    count: u32,
) -> Result<()> {
    let message = bot.start(symbol, position_size)?;
    println!("{message}");
    for _ in 0..count {
        let decision = bot.run_cycle()?;
        print_decision(&decision);
    }
    bot.stop()?;
    Ok(())
}

fn print_decision(d: &TradeDecision) {
    println!();
    println!("=== Cycle {} ===", d.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("Symbol:      {}", d.symbol);
    match d.price {
        Some(p) => println!("Price:       {p:.2}"),
        None => println!("Price:       unavailable"),
    }
    println!(
        "Sentiment:   {} {:.3} ({:?})",
        d.sentiment, d.probability, d.sentiment_source
    );
    println!("Action:      {}", d.action);
    println!("Quantity:    {}", d.quantity);
    println!("Cost:        {:.2}", d.cost);
    println!("Reason:      {}", d.reason);
    if let Some(order) = &d.order {
        println!("Order:       {} ({:?})", order.id, order.status);
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn run_backtest_cmd(
    bot: &BotController,
    symbols: &[String],
    start: &str,
    end: &str,
    capital: Option<f64>,
    trades_csv: Option<PathBuf>,
    sequential: bool,
) -> Result<()> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;

    if let [symbol] = symbols {
        let response = bot.backtest(&BacktestRequest {
            symbol: symbol.clone(),
            start_date,
            end_date,
            initial_capital: capital,
            position_size: None,
        })?;
        match (&response.outcome, &response.estimate) {
            (BacktestOutcome::Completed(report), _) => {
                print_summary(report);
                if let Some(path) = trades_csv {
                    std::fs::write(&path, backtest_trades_csv(&report.trades)?)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Trades saved to: {}", path.display());
                }
            }
            (BacktestOutcome::Failed { error, .. }, Some(estimate)) => {
                println!("Backtest failed: {error}");
                println!("{}", serde_json::to_string_pretty(estimate)?);
            }
            (BacktestOutcome::Failed { error, .. }, None) => bail!("backtest failed: {error}"),
        }
        return Ok(());
    }

    let capital = capital.unwrap_or(bot.config().backtest.initial_capital);
    let jobs: Vec<BacktestJob> = symbols
        .iter()
        .map(|s| BacktestJob {
            symbol: normalize_symbol(s),
            start_date,
            end_date,
            initial_capital: capital,
        })
        .collect();
    let simulator = BacktestSimulator::new(bot.config().backtest_params());
    let market = bot.session().market();
    let outcomes = BatchRunner::new(simulator, market.as_ref())
        .with_parallelism(!sequential)
        .run(&jobs);
    print!("{}", batch_summary_csv(&outcomes)?);
    Ok(())
}

fn print_summary(r: &BacktestReport) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", r.symbol);
    println!("Period:         {} to {}", r.start_date, r.end_date);
    println!("Bars:           {}", r.bar_count);
    println!("Trades:         {}", r.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", r.initial_capital);
    println!("Final:          {:.2}", r.final_value);
    println!("Strategy:       {:.2}%", r.strategy_return_pct);
    println!("Market:         {:.2}%", r.market_return_pct);
    println!("Outperformance: {:.2}%", r.outperformance_pct);
    println!("Volatility:     {:.2}%", r.volatility_pct);
    println!("Max Drawdown:   {:.2}%", r.max_drawdown_pct);
    println!("Dataset:        {}", r.dataset_hash);
    println!();
}

fn run_options(bot: &BotController, symbol: &str) -> Result<()> {
    let chain = bot.option_chain(symbol)?;
    println!(
        "{} at {:.2} ({})",
        chain.symbol, chain.current_price, chain.data_source
    );
    println!(
        "{:>10} {:>8} {:>8} {:>8} {:>8}",
        "Strike", "Call bid", "Call ask", "Put bid", "Put ask"
    );
    println!("{}", "-".repeat(46));
    for row in &chain.strikes {
        println!(
            "{:>10.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            row.strike, row.call.bid, row.call.ask, row.put.bid, row.put.ask
        );
    }
    if let Some(note) = &chain.note {
        println!("Note: {note}");
    }
    Ok(())
}

fn run_trades(bot: &BotController, limit: usize, csv: bool) -> Result<()> {
    let trades = bot.trade_history(limit)?;
    if csv {
        print!("{}", trade_records_csv(&trades)?);
        return Ok(());
    }
    if trades.is_empty() {
        println!("No trades recorded.");
        return Ok(());
    }
    println!(
        "{:<20} {:<8} {:<5} {:>8} {:>10} {:>12} {:<7}",
        "Time", "Symbol", "Side", "Qty", "Price", "Value", "Source"
    );
    println!("{}", "-".repeat(76));
    for t in &trades {
        println!(
            "{:<20} {:<8} {:<5} {:>8} {:>10.2} {:>12.2} {:<7}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            t.symbol,
            t.side.as_str(),
            t.quantity,
            t.price,
            t.total_value,
            t.strategy
        );
    }
    Ok(())
}

fn run_serve(bot: BotController, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| bot.config().server.addr.clone());
    let bot = Arc::new(bot);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(ApiServer::new(bot.clone()).serve(&addr))?;
    // The runtime goes first: blocking HTTP clients inside the controller
    // must not be dropped on an async worker.
    drop(runtime);
    drop(bot);
    Ok(())
}
