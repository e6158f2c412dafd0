use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use signalbot::api::CoinGeckoClient;
use signalbot::execution::{
    ControllerConfig, HistoryLog, OkxFeed, PriceFeed, RefreshController, SyntheticFeed,
};
use signalbot::models::{PublishedAnalysis, TradeAction};
use signalbot::notifier::SignalNotifier;
use signalbot::settings::{load_settings, Settings};
use signalbot::strategy::{estimate_profit, ProfitEstimate};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "signalbot", version, about = "RSI momentum signals and trade levels for one pair")]
struct Cli {
    /// Use the offline random-walk feed instead of OKX
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one analysis and print the trade plan
    Analyze {
        /// Coin or pair, e.g. ETH or BTC-USDC
        symbol: Option<String>,

        /// Capital in VND for the profit estimate
        #[arg(long)]
        capital: Option<f64>,

        /// USDT/VND rate; fetched from CoinGecko when omitted
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Re-analyze on a fixed interval until Ctrl+C
    Watch {
        /// Coin or pair, e.g. ETH or BTC-USDC
        symbol: Option<String>,

        /// Seconds between cycles
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Print the USDT/VND reference rate
    Rate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut settings = load_settings().context("Failed to load settings")?;

    match cli.command {
        Command::Analyze {
            symbol,
            capital,
            rate,
        } => {
            if let Some(symbol) = symbol {
                settings.symbol = symbol;
            }
            settings.validate()?;
            run_analyze(&settings, cli.offline, capital, rate).await
        }
        Command::Watch { symbol, interval } => {
            if let Some(symbol) = symbol {
                settings.symbol = symbol;
            }
            if let Some(interval) = interval {
                settings.refresh_interval_secs = interval;
            }
            settings.validate()?;
            run_watch(&settings, cli.offline).await
        }
        Command::Rate => {
            let rate = fetch_rate(&settings).await?;
            println!("1 USDT = {:.0} VND", rate);
            Ok(())
        }
    }
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signalbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_controller(settings: &Settings, offline: bool) -> anyhow::Result<RefreshController> {
    let feed: Arc<dyn PriceFeed> = if offline {
        let seed = Utc::now().timestamp().unsigned_abs();
        tracing::info!(seed, "Using offline synthetic feed");
        Arc::new(SyntheticFeed::new(seed, 100.0, settings.candle_limit))
    } else {
        Arc::new(OkxFeed::from_settings(settings).context("Failed to build OKX client")?)
    };

    Ok(RefreshController::new(
        feed,
        ControllerConfig::from_settings(settings),
    ))
}

async fn fetch_rate(settings: &Settings) -> anyhow::Result<f64> {
    let client = CoinGeckoClient::new(&settings.coingecko_base_url, settings.request_timeout())
        .context("Failed to build CoinGecko client")?;
    Ok(client.usdt_vnd_rate_or(settings.fallback_usdt_rate).await)
}

// ============================================================================
// Commands
// ============================================================================

async fn run_analyze(
    settings: &Settings,
    offline: bool,
    capital: Option<f64>,
    rate: Option<f64>,
) -> anyhow::Result<()> {
    let controller = build_controller(settings, offline)?;

    let published = match controller.trigger().await {
        Ok(published) => published,
        Err(e) => {
            eprintln!("❌ Could not analyze {}: {}", controller.pair(), e);
            return Err(e.into());
        }
    };

    print_analysis(&published);

    if let Some(capital) = capital {
        let rate = match rate {
            Some(rate) => rate,
            None if offline => settings.fallback_usdt_rate,
            None => fetch_rate(settings).await?,
        };

        match estimate_profit(
            capital,
            rate,
            published.result.entry,
            published.result.take_profit,
        ) {
            Some(estimate) => print_profit(capital, rate, &estimate),
            None => eprintln!("⚠️  Profit estimate needs positive capital and rate"),
        }
    }

    Ok(())
}

async fn run_watch(settings: &Settings, offline: bool) -> anyhow::Result<()> {
    let controller = build_controller(settings, offline)?;
    let mut updates = controller.subscribe();
    let mut notifier = SignalNotifier::new();

    println!(
        "⚡ Watching {} every {}s. Press Ctrl+C to stop.\n",
        controller.pair(),
        settings.refresh_interval_secs
    );

    let handle = controller.start_auto().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down...");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = updates.borrow_and_update().clone();
                if let Some(published) = latest {
                    print_analysis(&published);
                    if notifier.observe(&published.result) {
                        println!(
                            "🔔 New signal for {}: {} at {:.4}\n",
                            published.symbol, published.result.action, published.result.entry
                        );
                    }
                }
            }
        }
    }

    handle.stop().await;
    print_history(&controller.history().await);

    Ok(())
}

// ============================================================================
// Rendering
// ============================================================================

fn action_banner(action: TradeAction) -> &'static str {
    match action {
        TradeAction::Buy => "🟢 BUY (buy the dip)",
        TradeAction::Sell => "🔴 SELL (take profit)",
        TradeAction::Watch => "⚪ WATCH",
    }
}

fn print_analysis(published: &PublishedAnalysis) {
    let result = &published.result;

    println!("═══════════════════════════════════════════════════════");
    println!(
        " {}  @ {}",
        published.symbol,
        published.timestamp.format("%H:%M:%S")
    );
    println!("═══════════════════════════════════════════════════════");
    println!(
        " Price: {:<14} RSI 15m: {:<8.1} RSI 4H: {:.1}",
        published.snapshot.last, published.fast_rsi, published.slow_rsi
    );
    println!(
        " 24h range: {:.4} - {:.4}",
        published.snapshot.low_24h, published.snapshot.high_24h
    );
    println!("\n {}", action_banner(result.action));
    println!(" 💡 {}\n", result.reason);

    println!(" {:<22} {:>14.4}", "Entry", result.entry);
    println!(" {:<22} {:>14.4}", "Stop loss", result.stop_loss);
    println!(" {:<22} {:>14.4}", "Take profit", result.take_profit);
    println!(" {:<22} {:>14.4}", "Limit buy", result.limit_buy);
    println!(" {:<22} {:>14.4}", "Limit sell", result.limit_sell);
    println!(
        " {:<22} {:>14.4}",
        "Trailing activation", result.trailing_activation
    );
    println!(
        " {:<22} {:>13.1}%",
        "Trailing callback", result.trailing_callback_pct
    );
    println!();
}

fn print_profit(capital: f64, rate: f64, estimate: &ProfitEstimate) {
    println!("📊 Profit estimate (entry → take profit, 0.1% fee per side)");
    println!("   Capital:   {:>16.0} VND @ {:.0} VND/USDT", capital, rate);
    println!("   Coins:     {:>16.6}", estimate.coin_amount);
    println!("   Proceeds:  {:>16.0} VND", estimate.proceeds_vnd);
    println!("   P&L:       {:>+16.0} VND ({:+.2}%)", estimate.pnl_vnd, estimate.pnl_pct);
    println!();
}

fn print_history(history: &HistoryLog) {
    if history.is_empty() {
        println!("No analyses recorded.");
        return;
    }

    println!("\n📜 History ({} of {} max)", history.len(), history.capacity());
    println!(
        "{:<10} {:>14} {:>8} {:<6} {}",
        "Time", "Price", "RSI 15m", "Action", "Reason"
    );
    println!("{}", "─".repeat(70));

    for entry in history.entries() {
        println!(
            "{:<10} {:>14} {:>8.2} {:<6} {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.price,
            entry.fast_rsi,
            entry.action.to_string(),
            entry.reason
        );
    }
    println!();
}
