use crate::models::Candle;

/// Lookback used for both RSI readings
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Score returned when there is not enough history to say anything
pub const NEUTRAL_RSI: f64 = 50.0;

/// Calculate Relative Strength Index (RSI) with Wilder smoothing
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// `prices` must be ordered oldest first. Fewer than `period + 1` prices
/// yields [`NEUTRAL_RSI`]; a window with no losses yields 100.
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let mut gains = Vec::with_capacity(prices.len() - 1);
    let mut losses = Vec::with_capacity(prices.len() - 1);

    // Calculate price changes
    for window in prices.windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let n = period as f64;

    // Seed with a simple average, then smooth the rest
    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / n;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / n;

    for (gain, loss) in gains[period..].iter().zip(&losses[period..]) {
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Closing prices in chronological order from a newest-first candle series
pub fn closes_oldest_first(candles: &[Candle]) -> Vec<f64> {
    candles.iter().rev().map(|c| c.close).collect()
}
