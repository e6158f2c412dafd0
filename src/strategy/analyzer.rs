use crate::error::{Error, Result};
use crate::models::{AnalysisResult, PriceSnapshot, TradeAction};

/// Thresholds and multipliers used to turn an RSI reading into order levels
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub watch_entry_discount: f64, // Entry multiplier while waiting
    pub stop_loss_buffer: f64,     // Multiple of the 24h low
    /// Multiple of entry when the low is unusable; must be in (0, 1)
    pub fallback_stop_ratio: f64,
    pub reward_ratio: f64,         // Take-profit distance as a multiple of risk
    pub limit_buy_offset: f64,     // Multiple of the 24h low
    pub limit_sell_offset: f64,    // Multiple of the 24h high
    pub trailing_activation_ratio: f64,
    pub trailing_callback_pct: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            watch_entry_discount: 0.99,
            stop_loss_buffer: 0.99,
            fallback_stop_ratio: 0.95,
            reward_ratio: 1.5, // 1:1.5 risk/reward
            limit_buy_offset: 1.005,
            limit_sell_offset: 0.995,
            trailing_activation_ratio: 1.01,
            trailing_callback_pct: 2.0,
        }
    }
}

impl AnalyzerConfig {
    /// Reject configs that would break the level guarantees of [`SignalAnalyzer::analyze`]
    pub fn validate(&self) -> Result<()> {
        if self.rsi_oversold >= self.rsi_overbought {
            return Err(Error::InvalidConfig(format!(
                "oversold ({}) must be below overbought ({})",
                self.rsi_oversold, self.rsi_overbought
            )));
        }
        if !(self.fallback_stop_ratio > 0.0 && self.fallback_stop_ratio < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "fallback_stop_ratio must be in (0, 1), got {}",
                self.fallback_stop_ratio
            )));
        }
        if self.reward_ratio.is_nan() || self.reward_ratio < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "reward_ratio must be >= 0, got {}",
                self.reward_ratio
            )));
        }
        Ok(())
    }
}

/// Maps a ticker plus two RSI readings to a trade proposal
///
/// Only the fast reading drives the decision. The slow reading is accepted
/// so callers can pass both, but it never changes the outcome.
#[derive(Debug, Clone, Default)]
pub struct SignalAnalyzer {
    config: AnalyzerConfig,
}

impl SignalAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Decide the action for a fast RSI reading
    pub fn decide(&self, fast_rsi: f64) -> (TradeAction, String) {
        if fast_rsi < self.config.rsi_oversold {
            (
                TradeAction::Buy,
                format!("Fast RSI low ({:.1}). Price is oversold.", fast_rsi),
            )
        } else if fast_rsi > self.config.rsi_overbought {
            (
                TradeAction::Sell,
                format!("Fast RSI high ({:.1}). Price is overbought.", fast_rsi),
            )
        } else {
            (TradeAction::Watch, "Sideways market.".to_string())
        }
    }

    /// Build the full proposal
    ///
    /// Guarantees `stop_loss < entry` and `take_profit <= high_24h` for any
    /// finite positive input, given a config that passes
    /// [`AnalyzerConfig::validate`].
    pub fn analyze(
        &self,
        price: f64,
        low_24h: f64,
        high_24h: f64,
        fast_rsi: f64,
        _slow_rsi: f64,
    ) -> AnalysisResult {
        let cfg = &self.config;
        let (action, reason) = self.decide(fast_rsi);

        let entry = match action {
            TradeAction::Watch => price * cfg.watch_entry_discount,
            TradeAction::Buy | TradeAction::Sell => price,
        };

        let mut stop_loss = low_24h * cfg.stop_loss_buffer;
        if stop_loss >= entry {
            stop_loss = entry * cfg.fallback_stop_ratio;
        }

        let take_profit = (entry + (entry - stop_loss) * cfg.reward_ratio).min(high_24h);

        AnalysisResult {
            action,
            reason,
            entry,
            stop_loss,
            take_profit,
            limit_buy: low_24h * cfg.limit_buy_offset,
            limit_sell: high_24h * cfg.limit_sell_offset,
            trailing_activation: price * cfg.trailing_activation_ratio,
            trailing_callback_pct: cfg.trailing_callback_pct,
        }
    }

    /// Same as [`analyze`](Self::analyze), reading prices from a ticker
    pub fn analyze_snapshot(
        &self,
        snapshot: &PriceSnapshot,
        fast_rsi: f64,
        slow_rsi: f64,
    ) -> AnalysisResult {
        self.analyze(
            snapshot.last,
            snapshot.low_24h,
            snapshot.high_24h,
            fast_rsi,
            slow_rsi,
        )
    }
}

/// Analyze with the default thresholds
pub fn analyze_market(
    price: f64,
    low_24h: f64,
    high_24h: f64,
    fast_rsi: f64,
    slow_rsi: f64,
) -> AnalysisResult {
    SignalAnalyzer::default().analyze(price, low_24h, high_24h, fast_rsi, slow_rsi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_action_thresholds() {
        assert_eq!(analyze_market(100.0, 90.0, 110.0, 25.0, 50.0).action, TradeAction::Buy);
        assert_eq!(analyze_market(100.0, 90.0, 110.0, 75.0, 50.0).action, TradeAction::Sell);
        assert_eq!(analyze_market(100.0, 90.0, 110.0, 50.0, 50.0).action, TradeAction::Watch);

        // Boundaries are not strict enough to trigger
        assert_eq!(analyze_market(100.0, 90.0, 110.0, 30.0, 50.0).action, TradeAction::Watch);
        assert_eq!(analyze_market(100.0, 90.0, 110.0, 70.0, 50.0).action, TradeAction::Watch);
    }

    #[test]
    fn test_reason_cites_score() {
        let buy = analyze_market(100.0, 90.0, 110.0, 25.04, 50.0);
        assert!(buy.reason.contains("25.0"), "reason was {}", buy.reason);
        assert!(buy.reason.contains("oversold"));

        let sell = analyze_market(100.0, 90.0, 110.0, 81.26, 50.0);
        assert!(sell.reason.contains("81.3"), "reason was {}", sell.reason);
        assert!(sell.reason.contains("overbought"));

        let watch = analyze_market(100.0, 90.0, 110.0, 50.0, 50.0);
        assert_eq!(watch.reason, "Sideways market.");
    }

    #[test]
    fn test_buy_levels_with_take_profit_clamp() {
        let result = analyze_market(100.0, 90.0, 110.0, 25.0, 50.0);

        assert!(approx(result.entry, 100.0));
        assert!(approx(result.stop_loss, 89.1));
        // 100 + 10.9 * 1.5 = 116.35, capped at the 24h high
        assert!(approx(result.take_profit, 110.0));
        assert!(approx(result.limit_buy, 90.45));
        assert!(approx(result.limit_sell, 109.45));
        assert!(approx(result.trailing_activation, 101.0));
        assert_eq!(result.trailing_callback_pct, 2.0);
    }

    #[test]
    fn test_take_profit_below_high_is_kept() {
        let result = analyze_market(100.0, 99.6, 110.0, 25.0, 50.0);

        assert!(approx(result.stop_loss, 98.604));
        assert!(approx(result.take_profit, 100.0 + (100.0 - 98.604) * 1.5));
        assert!(result.take_profit < 110.0);
    }

    #[test]
    fn test_stop_loss_fallback_when_low_above_entry() {
        // WATCH discounts entry to 99.0, while low * 0.99 = 99.99
        let result = analyze_market(100.0, 101.0, 110.0, 50.0, 50.0);

        assert_eq!(result.action, TradeAction::Watch);
        assert!(approx(result.entry, 99.0));
        assert!(approx(result.stop_loss, 99.0 * 0.95));
        assert!(result.stop_loss < result.entry);
    }

    #[test]
    fn test_watch_discounts_entry() {
        let result = analyze_market(200.0, 150.0, 250.0, 55.0, 50.0);
        assert!(approx(result.entry, 198.0));
        // Trailing activation is always from the raw price
        assert!(approx(result.trailing_activation, 202.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(AnalyzerConfig::default().validate().is_ok());

        for ratio in [1.0, 1.2, 0.0, f64::NAN] {
            let config = AnalyzerConfig {
                fallback_stop_ratio: ratio,
                ..AnalyzerConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "ratio {} accepted",
                ratio
            );
        }

        let inverted = AnalyzerConfig {
            rsi_oversold: 80.0,
            ..AnalyzerConfig::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_slow_rsi_does_not_affect_result() {
        let a = analyze_market(100.0, 90.0, 110.0, 45.0, 5.0);
        let b = analyze_market(100.0, 90.0, 110.0, 45.0, 95.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_inverted_range_is_tolerated() {
        // Feed glitch: high below last price
        let result = analyze_market(100.0, 90.0, 95.0, 25.0, 50.0);
        assert!(result.stop_loss < result.entry);
        assert!(result.take_profit <= 95.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let analyzer = SignalAnalyzer::new(AnalyzerConfig {
            rsi_oversold: 20.0,
            rsi_overbought: 80.0,
            ..AnalyzerConfig::default()
        });

        assert_eq!(analyzer.decide(25.0).0, TradeAction::Watch);
        assert_eq!(analyzer.decide(19.0).0, TradeAction::Buy);
        assert_eq!(analyzer.decide(85.0).0, TradeAction::Sell);
    }

    #[quickcheck]
    fn prop_levels_respect_invariants(price: u32, low: u32, high: u32, fast: u8) -> bool {
        let price = price as f64 / 100.0 + 0.01;
        let low = low as f64 / 100.0 + 0.01;
        let high = high as f64 / 100.0 + 0.01;
        let fast = (fast % 101) as f64;

        let result = analyze_market(price, low, high, fast, 50.0);
        result.stop_loss < result.entry && result.take_profit <= high
    }
}
