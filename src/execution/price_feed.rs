use crate::api::OkxClient;
use crate::error::FeedError;
use crate::models::{Candle, PriceSnapshot, Timeframe};
use crate::settings::Settings;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

/// Everything one analysis cycle needs from the market
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub snapshot: PriceSnapshot,
    /// Fast time frame, newest first
    pub fast_candles: Vec<Candle>,
    /// Slow time frame, newest first
    pub slow_candles: Vec<Candle>,
}

/// Source of market data for the refresh controller
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Fetch the ticker and both candle series for a pair
    async fn fetch_market_data(&self, pair: &str) -> Result<MarketData, FeedError>;

    /// Feed name for logs
    fn name(&self) -> &str;
}

/// Live feed backed by the OKX public API
pub struct OkxFeed {
    client: OkxClient,
    fast_bar: String,
    slow_bar: String,
    candle_limit: usize,
}

impl OkxFeed {
    pub fn new(
        client: OkxClient,
        fast_bar: impl Into<String>,
        slow_bar: impl Into<String>,
        candle_limit: usize,
    ) -> Self {
        Self {
            client,
            fast_bar: fast_bar.into(),
            slow_bar: slow_bar.into(),
            candle_limit,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FeedError> {
        let client = OkxClient::new(&settings.okx_base_url, settings.request_timeout())?;
        Ok(Self::new(
            client,
            &settings.fast_bar,
            &settings.slow_bar,
            settings.candle_limit,
        ))
    }
}

#[async_trait]
impl PriceFeed for OkxFeed {
    async fn fetch_market_data(&self, pair: &str) -> Result<MarketData, FeedError> {
        // Sequential on purpose: one request in flight per cycle
        let snapshot = self.client.get_ticker(pair).await?;
        let fast_candles = self
            .client
            .get_candles(pair, &self.fast_bar, self.candle_limit)
            .await?;
        let slow_candles = self
            .client
            .get_candles(pair, &self.slow_bar, self.candle_limit)
            .await?;

        tracing::info!(
            pair,
            price = %snapshot.last,
            low_24h = %snapshot.low_24h,
            high_24h = %snapshot.high_24h,
            "Fetched market data"
        );

        Ok(MarketData {
            snapshot,
            fast_candles,
            slow_candles,
        })
    }

    fn name(&self) -> &str {
        "okx"
    }
}

struct WalkState {
    rng: StdRng,
    price: f64,
}

/// Offline feed producing a seeded random walk
///
/// Each fetch moves the price one step, so repeated cycles see a market
/// that drifts like a live one. Same seed, same sequence.
pub struct SyntheticFeed {
    state: Mutex<WalkState>,
    candle_limit: usize,
}

impl SyntheticFeed {
    pub fn new(seed: u64, start_price: f64, candle_limit: usize) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng: StdRng::seed_from_u64(seed),
                price: start_price.max(0.01),
            }),
            candle_limit: candle_limit.max(1),
        }
    }

    /// Build a newest-first candle series ending at `last`
    fn series(
        rng: &mut StdRng,
        last: f64,
        count: usize,
        timeframe: Timeframe,
        volatility: f64,
    ) -> Vec<Candle> {
        let bar_minutes = match timeframe {
            Timeframe::FifteenMinutes => 15,
            Timeframe::FourHours => 240,
        };
        let now = Utc::now();

        let mut candles = Vec::with_capacity(count);
        let mut close = last;

        for i in 0..count {
            let open = (close * (1.0 + rng.gen_range(-volatility..volatility))).max(0.01);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..volatility));
            let low = (open.min(close) * (1.0 - rng.gen_range(0.0..volatility))).max(0.01);

            candles.push(Candle {
                timestamp: now - Duration::minutes(i as i64 * bar_minutes),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(1_000.0..50_000.0),
            });

            // Walk backwards in time: the previous bar closed where this one opened
            close = open;
        }

        candles
    }
}

#[async_trait]
impl PriceFeed for SyntheticFeed {
    async fn fetch_market_data(&self, pair: &str) -> Result<MarketData, FeedError> {
        let mut state = self.state.lock().await;

        let step = state.rng.gen_range(-0.01..0.01);
        state.price = (state.price * (1.0 + step)).max(0.01);
        let last = state.price;

        let fast_candles = Self::series(
            &mut state.rng,
            last,
            self.candle_limit,
            Timeframe::FifteenMinutes,
            0.006,
        );
        let slow_candles = Self::series(
            &mut state.rng,
            last,
            self.candle_limit,
            Timeframe::FourHours,
            0.02,
        );

        // Stand-in for the 24h range: extremes of the fast series
        let (low, high) = fast_candles
            .iter()
            .fold((last, last), |(lo, hi), c| (lo.min(c.low), hi.max(c.high)));

        Ok(MarketData {
            snapshot: PriceSnapshot {
                symbol: pair.to_string(),
                last,
                low_24h: low,
                high_24h: high,
                timestamp: Utc::now(),
            },
            fast_candles,
            slow_candles,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
