use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote currency appended to bare symbols ("ETH" -> "ETH-USDT")
pub const DEFAULT_QUOTE: &str = "USDT";

/// Normalize operator input into an exchange pair id
///
/// Input that already names a pair ("BTC-USDC") is kept as is.
pub fn normalize_pair(symbol: &str, quote: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    if symbol.contains('-') {
        symbol
    } else {
        format!("{}-{}", symbol, quote.trim().to_uppercase())
    }
}

/// OHLCV candlestick data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// 24h ticker for a pair
///
/// `low_24h <= last <= high_24h` usually holds, but the feed does not promise it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub last: f64,
    pub low_24h: f64,
    pub high_24h: f64,
    pub timestamp: DateTime<Utc>,
}

/// Candle bar sizes used for the two RSI readings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Timeframe {
    FifteenMinutes,
    FourHours,
}

impl Timeframe {
    /// Bar code as the exchange expects it
    pub fn bar(&self) -> &'static str {
        match self {
            Timeframe::FifteenMinutes => "15m",
            Timeframe::FourHours => "4H",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bar())
    }
}

/// Trade decision derived from the fast RSI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Buy,
    Sell,
    Watch,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Watch => "WATCH",
        };
        f.write_str(label)
    }
}

/// Full trade proposal produced by the signal analyzer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub action: TradeAction,
    pub reason: String,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub limit_buy: f64,
    pub limit_sell: f64,
    pub trailing_activation: f64,
    pub trailing_callback_pct: f64,
}

/// Contents of the current-result slot: one analysis plus the data it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedAnalysis {
    pub symbol: String,
    pub snapshot: PriceSnapshot,
    pub fast_rsi: f64,
    pub slow_rsi: f64,
    pub result: AnalysisResult,
    pub timestamp: DateTime<Utc>,
}

/// One row of the analysis history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub fast_rsi: f64,
    pub action: TradeAction,
    pub reason: String,
}

impl LogEntry {
    /// Build a log row; the RSI is kept to two decimals
    pub fn new(
        timestamp: DateTime<Utc>,
        price: f64,
        fast_rsi: f64,
        action: TradeAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            price,
            fast_rsi: (fast_rsi * 100.0).round() / 100.0,
            action,
            reason: reason.into(),
        }
    }
}

impl From<&PublishedAnalysis> for LogEntry {
    fn from(published: &PublishedAnalysis) -> Self {
        LogEntry::new(
            published.timestamp,
            published.snapshot.last,
            published.fast_rsi,
            published.result.action,
            published.result.reason.clone(),
        )
    }
}
