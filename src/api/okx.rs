use crate::error::FeedError;
use crate::models::{Candle, PriceSnapshot};
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub const OKX_API_BASE: &str = "https://www.okx.com";
const RATE_LIMIT_PER_SEC: u32 = 10; // Public market endpoints: 20 requests / 2s

type OkxRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for the OKX v5 public market API
///
/// Cloneable; all clones share one rate limiter.
#[derive(Clone)]
pub struct OkxClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<OkxRateLimiter>,
}

// ============== Response Types ==============

/// Every v5 endpoint wraps its payload the same way
#[derive(Debug, Deserialize)]
struct OkxResponse<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerRaw {
    inst_id: String,
    last: String,
    #[serde(rename = "low24h")]
    low_24h: String,
    #[serde(rename = "high24h")]
    high_24h: String,
}

/// `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, all strings
type CandleRow = Vec<String>;

// ============== Implementation ==============

impl OkxClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;

        let per_sec = NonZeroU32::new(RATE_LIMIT_PER_SEC).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_sec)));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Rate-limited GET that unwraps the v5 envelope
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, FeedError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, ?query, "OKX request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: OkxResponse<T> =
            serde_json::from_str(&body).map_err(|e| FeedError::Malformed(e.to_string()))?;

        if envelope.code != "0" {
            return Err(FeedError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        Ok(envelope.data)
    }

    /// Current 24h ticker for a pair
    /// Endpoint: GET /api/v5/market/ticker?instId={pair}
    pub async fn get_ticker(&self, pair: &str) -> Result<PriceSnapshot, FeedError> {
        let data: Vec<TickerRaw> = self
            .get("/api/v5/market/ticker", &[("instId", pair)])
            .await?;

        let raw = data.into_iter().next().ok_or(FeedError::EmptyData("ticker"))?;

        Ok(PriceSnapshot {
            symbol: raw.inst_id,
            last: parse_price("last", &raw.last)?,
            low_24h: parse_price("low24h", &raw.low_24h)?,
            high_24h: parse_price("high24h", &raw.high_24h)?,
            timestamp: Utc::now(),
        })
    }

    /// Recent candles for a pair, newest first (the exchange's order)
    /// Endpoint: GET /api/v5/market/candles?instId={pair}&bar={bar}&limit={limit}
    pub async fn get_candles(
        &self,
        pair: &str,
        bar: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, FeedError> {
        let limit = limit.to_string();
        let rows: Vec<CandleRow> = self
            .get(
                "/api/v5/market/candles",
                &[("instId", pair), ("bar", bar), ("limit", limit.as_str())],
            )
            .await?;

        if rows.is_empty() {
            return Err(FeedError::EmptyData("candles"));
        }

        let candles = rows
            .iter()
            .map(|row| parse_candle(row))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(pair, bar, count = candles.len(), "Fetched candles");

        Ok(candles)
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64, FeedError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| FeedError::Malformed(format!("{} is not a number: {:?}", field, value)))?;

    if !parsed.is_finite() {
        return Err(FeedError::Malformed(format!("{} is not finite", field)));
    }

    Ok(parsed)
}

/// Prices must be strictly positive to be usable downstream
fn parse_price(field: &str, value: &str) -> Result<f64, FeedError> {
    let price = parse_number(field, value)?;
    if price <= 0.0 {
        return Err(FeedError::Malformed(format!(
            "{} must be positive, got {}",
            field, price
        )));
    }
    Ok(price)
}

fn parse_candle(row: &[String]) -> Result<Candle, FeedError> {
    if row.len() < 6 {
        return Err(FeedError::Malformed(format!(
            "candle row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let millis: i64 = row[0]
        .parse()
        .map_err(|_| FeedError::Malformed(format!("bad candle timestamp {:?}", row[0])))?;
    let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| FeedError::Malformed(format!("candle timestamp out of range: {}", millis)))?;

    Ok(Candle {
        timestamp,
        open: parse_number("open", &row[1])?,
        high: parse_number("high", &row[2])?,
        low: parse_number("low", &row[3])?,
        close: parse_price("close", &row[4])?,
        volume: parse_number("volume", &row[5])?,
    })
}
