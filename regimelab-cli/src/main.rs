//! RegimeLab CLI: scheduled regime alerts and single-ticker analysis.
//!
//! Commands:
//! - `alert`: one scheduled pass over the ticker universe
//!   (exit 0 completed, 3 skipped or not due, 1 failed)
//! - `runs`: the latest lines of the alert run log
//! - `analyze`: regime, latest pattern, fused signal and Kelly sizing for one ticker
//! - `kelly`: size a position from manually supplied win statistics
//! - `sharpe`: Sharpe ratio of a weighted portfolio, or of manual inputs

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use regimelab_alert::{
    AlertConfig, AlertSink, AlertStateMachine, LogSink, RunLog, RunOptions, RunPhase, RunReport,
    WebhookSink,
};
use regimelab_core::data::{CsvProvider, DataProvider, Universe, YahooProvider};
use regimelab_core::kelly::{
    KellyEngine, KellyResult, MarketSnapshot, SizingRequest, TransitionState,
};
use regimelab_core::regime::FitMethod;
use regimelab_core::sharpe::{
    manual_sharpe, SharpeCalculator, SharpeConfig, SharpeRating, SharpeReport,
};
use regimelab_core::{Analysis, Analyzer};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_SKIPPED: u8 = 3;

#[derive(Parser)]
#[command(
    name = "regimelab",
    about = "RegimeLab CLI: market regime alerts and regime-aware position sizing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the ticker universe, diff against the baseline and send alerts.
    Alert {
        /// Send an alert even if no regime changed.
        #[arg(long, default_value_t = false)]
        force_alert: bool,

        /// Universe file (overrides the config).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Run now, ignoring run windows and the rest day.
        #[arg(long, default_value_t = false)]
        skip_schedule_check: bool,

        /// TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read `{TICKER}.csv` bars from this directory instead of Yahoo Finance.
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Print the most recent alert run-log lines.
    Runs {
        /// TOML config file naming the run log. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Full decision for one ticker: regime, pattern, signal, Kelly sizing.
    Analyze {
        ticker: String,

        #[arg(long, default_value_t = 100_000.0)]
        portfolio: f64,

        /// Stop-loss as a fraction of price (0.05 = 5%).
        #[arg(long, default_value_t = 0.05)]
        stop_loss: f64,

        /// Fractional Kelly multiplier in (0, 1].
        #[arg(long, default_value_t = 0.5)]
        fraction: f64,

        #[arg(long, default_value_t = 5)]
        holding_days: u32,

        /// Calendar days of history to fetch.
        #[arg(long, default_value_t = 270)]
        lookback_days: u32,

        /// Read bars from this directory instead of Yahoo Finance.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Print the full analysis as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Kelly sizing from user-supplied win probability and average win/loss.
    Kelly {
        /// Probability of a winning trade, in [0, 1].
        #[arg(long)]
        win_prob: f64,

        /// Average winning return (0.02 = 2%).
        #[arg(long)]
        avg_win: f64,

        /// Average losing return magnitude (0.015 = 1.5%).
        #[arg(long)]
        avg_loss: f64,

        #[arg(long)]
        price: f64,

        #[arg(long, value_enum, default_value_t = Stability::Stable)]
        transition: Stability,

        /// Average (high - low) / close, used for the spread estimate.
        #[arg(long, default_value_t = 0.02)]
        avg_range: f64,

        #[arg(long, default_value_t = 1_000_000.0)]
        avg_volume: f64,

        #[arg(long, default_value_t = 100_000.0)]
        portfolio: f64,

        #[arg(long, default_value_t = 0.05)]
        stop_loss: f64,

        #[arg(long, default_value_t = 0.5)]
        fraction: f64,

        #[arg(long, default_value_t = 5)]
        holding_days: u32,
    },
    /// Sharpe ratio of a weighted portfolio over recent history, or of a
    /// manually supplied annual return and volatility.
    Sharpe {
        /// Comma-separated portfolio tickers.
        #[arg(long, value_delimiter = ',', required_unless_present = "annual_return")]
        tickers: Vec<String>,

        /// Comma-separated weights, one per ticker. Equal weights when omitted.
        #[arg(long, value_delimiter = ',')]
        weights: Vec<f64>,

        /// Annual risk-free rate (0.045 = 4.5%).
        #[arg(long, default_value_t = 0.045)]
        risk_free: f64,

        /// Calendar days of history to fetch.
        #[arg(long, default_value_t = 365)]
        lookback_days: u32,

        /// Annual portfolio return for a manual calculation (0.12 = 12%).
        #[arg(long, requires = "annual_volatility", conflicts_with = "tickers")]
        annual_return: Option<f64>,

        /// Annual portfolio volatility for a manual calculation.
        #[arg(long, requires = "annual_return")]
        annual_volatility: Option<f64>,

        /// Read bars from this directory instead of Yahoo Finance.
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Stability {
    Stable,
    Uncertain,
    Transitioning,
}

impl From<Stability> for TransitionState {
    fn from(s: Stability) -> Self {
        match s {
            Stability::Stable => TransitionState::Stable,
            Stability::Uncertain => TransitionState::Uncertain,
            Stability::Transitioning => TransitionState::Transitioning,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Alert {
            force_alert,
            universe,
            skip_schedule_check,
            config,
            csv_dir,
        } => run_alert(
            config,
            universe,
            csv_dir,
            RunOptions {
                force_alert,
                skip_schedule_check,
            },
        ),
        Commands::Runs { config, count } => run_history(config, count).map(|_| ExitCode::SUCCESS),
        Commands::Analyze {
            ticker,
            portfolio,
            stop_loss,
            fraction,
            holding_days,
            lookback_days,
            csv_dir,
            json,
        } => {
            let request = SizingRequest {
                portfolio_value: portfolio,
                stop_loss,
                fraction,
                holding_days,
            };
            run_analyze(&ticker, request, lookback_days, csv_dir, json).map(|_| ExitCode::SUCCESS)
        }
        Commands::Kelly {
            win_prob,
            avg_win,
            avg_loss,
            price,
            transition,
            avg_range,
            avg_volume,
            portfolio,
            stop_loss,
            fraction,
            holding_days,
        } => {
            let market = MarketSnapshot {
                price,
                avg_relative_range: avg_range,
                avg_volume,
            };
            let request = SizingRequest {
                portfolio_value: portfolio,
                stop_loss,
                fraction,
                holding_days,
            };
            run_kelly(
                win_prob,
                avg_win,
                avg_loss,
                transition.into(),
                &market,
                &request,
            )
            .map(|_| ExitCode::SUCCESS)
        }
        Commands::Sharpe {
            tickers,
            weights,
            risk_free,
            lookback_days,
            annual_return,
            annual_volatility,
            csv_dir,
            json,
        } => {
            let result = match (annual_return, annual_volatility) {
                (Some(ret), Some(vol)) => run_manual_sharpe(ret, vol, risk_free),
                _ => {
                    let config = SharpeConfig {
                        risk_free_rate: risk_free,
                        ..SharpeConfig::default()
                    };
                    run_sharpe(&tickers, weights, config, lookback_days, csv_dir, json)
                }
            };
            result.map(|_| ExitCode::SUCCESS)
        }
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regimelab=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn provider(
    csv_dir: Option<PathBuf>,
    timeout: std::time::Duration,
) -> Result<Box<dyn DataProvider>> {
    Ok(match csv_dir {
        Some(dir) => Box::new(CsvProvider::new(dir)),
        None => {
            let yahoo = YahooProvider::new(timeout).context("failed to build Yahoo client")?;
            Box::new(yahoo)
        }
    })
}

fn run_alert(
    config_path: Option<PathBuf>,
    universe_path: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    options: RunOptions,
) -> Result<ExitCode> {
    let mut config = AlertConfig::load(config_path.as_deref())?.with_env();
    if let Some(path) = universe_path {
        config.universe_path = path;
    }
    debug!(?config, "alert configuration");
    let universe = Universe::from_file(&config.universe_path)
        .with_context(|| format!("cannot load universe {}", config.universe_path.display()))?;

    let sink: Box<dyn AlertSink> = match &config.webhook_url {
        Some(url) => Box::new(WebhookSink::new(url.clone(), config.webhook_timeout())?),
        None => Box::new(LogSink),
    };
    let provider = provider(csv_dir, config.fetch_timeout())?;
    let mut machine = AlertStateMachine::new(config, provider, sink)?;

    let report = machine.run(&universe, options)?;
    match report.phase {
        RunPhase::Completed => {
            print_run_summary(&report);
            Ok(ExitCode::SUCCESS)
        }
        RunPhase::Skipped => {
            if let Some(reason) = report.skip_reason {
                println!("{reason}");
            }
            Ok(ExitCode::from(EXIT_SKIPPED))
        }
        _ => {
            println!("Not inside a scheduled run window");
            Ok(ExitCode::from(EXIT_SKIPPED))
        }
    }
}

fn run_history(config_path: Option<PathBuf>, count: usize) -> Result<()> {
    let config = AlertConfig::load(config_path.as_deref())?.with_env();
    let log = RunLog::new(&config.run_log_path);
    let lines = log.recent(count)?;
    if lines.is_empty() {
        println!("No runs logged in {}", log.path().display());
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn print_run_summary(report: &RunReport) {
    if let Some(path) = &report.today_path {
        println!("Wrote {} regimes to {}", report.results.len(), path.display());
    }
    if let Some(path) = &report.changes_path {
        println!("Wrote {} changes to {}", report.changes.len(), path.display());
    }
    for failure in &report.failures {
        println!("Error processing {}: {}", failure.ticker, failure.error);
    }
    if report.results.is_empty() {
        println!("No regimes detected");
        return;
    }
    let counts = report.counts();
    let rule = "=".repeat(50);
    println!("\n{rule}");
    println!("REGIME SUMMARY");
    println!("{rule}");
    println!("Total symbols: {}", report.results.len());
    println!(
        "Bull: {} | Sideways: {} | Bear: {}",
        counts.bull, counts.sideways, counts.bear
    );
    println!("Changes detected: {}", report.changes.len());
    println!("{rule}\n");
    println!("Completed in {:.2} seconds", report.runtime.as_secs_f64());
}

fn run_analyze(
    ticker: &str,
    request: SizingRequest,
    lookback_days: u32,
    csv_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let end: NaiveDate = Local::now().date_naive();
    let start = end - Duration::days(i64::from(lookback_days));
    let provider = provider(csv_dir, std::time::Duration::from_secs(30))?;
    let ticker = ticker.to_ascii_uppercase();
    let bars = provider
        .fetch(&ticker, start, end)
        .with_context(|| format!("failed to fetch {ticker}"))?;

    let analysis = Analyzer::default()
        .analyze(&ticker, &bars, &request)
        .with_context(|| format!("analysis of {ticker} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

fn print_analysis(a: &Analysis) {
    println!("=== {} as of {} (close {:.2}) ===", a.ticker, a.as_of, a.price);
    println!();
    println!(
        "Regime:     {} ({:.1}% confidence)",
        a.regime.regime,
        a.regime.confidence * 100.0
    );
    match &a.method {
        FitMethod::Mixture {
            iterations,
            converged,
            ..
        } => println!(
            "Model:      gaussian mixture ({iterations} iterations{})",
            if *converged { "" } else { ", not converged" }
        ),
        FitMethod::MovingAverage { reason } => {
            println!("Model:      moving-average fallback ({reason})")
        }
    }
    for s in a.stats.iter() {
        println!(
            "  {:<9} days {:>4}  occupancy {:>5.1}%  mean {:>+7.3}%  vol {:>6.3}%  win {:>5.1}%  sharpe {:>+5.2}",
            s.regime.to_string(),
            s.days,
            s.occupancy * 100.0,
            s.avg_return * 100.0,
            s.volatility * 100.0,
            s.win_rate * 100.0,
            s.sharpe,
        );
    }

    println!();
    match &a.pattern {
        Some(p) => println!(
            "Pattern:    {} ({}) on {}, trigger {:.2}",
            p.kind, p.direction, p.date, p.trigger
        ),
        None => println!("Pattern:    none on the last bar"),
    }
    if let Some(summary) = &a.pattern_summary {
        println!(
            "            last {} bars: {} patterns ({} bullish, {} bearish, {:.1}% of bars)",
            summary.window, summary.total, summary.bullish, summary.bearish, summary.frequency_pct
        );
    }

    println!();
    println!(
        "Signal:     {} (strength {}/10) - {}",
        a.signal.category, a.signal.strength, a.signal.reasoning
    );
    if let Some(p) = &a.performance {
        println!();
        print_sharpe(p);
    }
    println!();
    print_sizing(&a.sizing);
}

fn run_kelly(
    win_prob: f64,
    avg_win: f64,
    avg_loss: f64,
    transition: TransitionState,
    market: &MarketSnapshot,
    request: &SizingRequest,
) -> Result<()> {
    let result = KellyEngine::default()
        .size_manual(win_prob, avg_win, avg_loss, transition, market, request)
        .context("invalid sizing inputs")?;
    print_sizing(&result);
    Ok(())
}

fn print_sizing(k: &KellyResult) {
    println!("Kelly sizing");
    println!("  Win probability:   {:.1}%", k.win_probability * 100.0);
    match k.win_loss_ratio {
        Some(b) => println!("  Win/loss ratio:    {b:.2}"),
        None => println!("  Win/loss ratio:    undefined"),
    }
    println!("  Full Kelly:        {:.2}%", k.full_fraction * 100.0);
    println!(
        "  Transition:        {} (x{:.2})",
        k.transition, k.transition_multiplier
    );
    println!("  Gross edge:        {:.4}%", k.gross_edge * 100.0);
    println!("  Decayed edge:      {:.4}%", k.decayed_edge * 100.0);
    println!("  Costs:             {:.4}%", k.costs.total * 100.0);
    println!("  Net edge:          {:.4}%", k.net_edge * 100.0);
    println!("  Applied fraction:  {:.2}%", k.applied_fraction * 100.0);
    println!(
        "  Position:          ${:.2} ({} shares, stop {:.2})",
        k.position_value, k.shares, k.stop_price
    );
    println!("  Risk level:        {} - {}", k.risk_level, k.risk_level.description());
    println!("  Recommendation:    {}", k.recommendation.text());
    if !k.tradeable {
        println!("  NOT TRADEABLE: no edge after decay and costs");
    }
}

fn run_sharpe(
    tickers: &[String],
    weights: Vec<f64>,
    config: SharpeConfig,
    lookback_days: u32,
    csv_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let weights = if weights.is_empty() {
        vec![1.0 / tickers.len() as f64; tickers.len()]
    } else {
        weights
    };
    let end: NaiveDate = Local::now().date_naive();
    let start = end - Duration::days(i64::from(lookback_days));
    let provider = provider(csv_dir, std::time::Duration::from_secs(30))?;

    let mut members = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let ticker = ticker.to_ascii_uppercase();
        let bars = provider
            .fetch(&ticker, start, end)
            .with_context(|| format!("failed to fetch {ticker}"))?;
        members.push(bars);
    }
    let report = SharpeCalculator::new(config)
        .portfolio_from_bars(&members, &weights)
        .context("Sharpe calculation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_sharpe(&report);
    }
    Ok(())
}

fn run_manual_sharpe(annual_return: f64, annual_volatility: f64, risk_free: f64) -> Result<()> {
    let ratio = manual_sharpe(annual_return, annual_volatility, risk_free)
        .context("invalid Sharpe inputs")?;
    let rating = SharpeRating::from_ratio(ratio);
    println!("Sharpe ratio:      {ratio:.2} ({rating})");
    println!("  {}", rating.benchmark());
    Ok(())
}

fn print_sharpe(p: &SharpeReport) {
    println!("Sharpe ratio:      {:.2} ({})", p.sharpe_ratio, p.rating);
    println!("  {}", p.rating.benchmark());
    println!("  Annual return:     {:+.2}%", p.annual_return * 100.0);
    println!("  Annual volatility: {:.2}%", p.annual_volatility * 100.0);
    println!("  Risk-free rate:    {:.2}%", p.risk_free_rate * 100.0);
    println!("  Max drawdown:      {:.2}%", p.max_drawdown * 100.0);
    println!("  Win rate:          {:.1}%", p.win_rate * 100.0);
    println!("  Total return:      {:+.2}%", p.total_return * 100.0);
    println!("  Observations:      {}", p.observations);
}
