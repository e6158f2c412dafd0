use crate::api::coingecko::COINGECKO_API_BASE;
use crate::api::okx::OKX_API_BASE;
use crate::error::{Error, Result};
use crate::execution::DEFAULT_HISTORY_CAPACITY;
use crate::models::{normalize_pair, Timeframe, DEFAULT_QUOTE};
use crate::strategy::AnalyzerConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const FALLBACK_USDT_RATE: f64 = 26_700.0;

/// Runtime settings for one operator session
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub symbol: String,
    pub quote: String,
    pub okx_base_url: String,
    pub coingecko_base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub fast_bar: String,
    pub slow_bar: String,
    pub candle_limit: usize,
    pub rsi_period: usize,
    pub history_capacity: usize,
    pub fallback_usdt_rate: f64,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "ETH".to_string(),
            quote: DEFAULT_QUOTE.to_string(),
            okx_base_url: OKX_API_BASE.to_string(),
            coingecko_base_url: COINGECKO_API_BASE.to_string(),
            request_timeout_secs: 5,
            refresh_interval_secs: 30,
            fast_bar: Timeframe::FifteenMinutes.bar().to_string(),
            slow_bar: Timeframe::FourHours.bar().to_string(),
            candle_limit: 25,
            rsi_period: 14,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            fallback_usdt_rate: FALLBACK_USDT_RATE,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl Settings {
    /// Exchange pair id for the configured symbol
    pub fn pair(&self) -> String {
        normalize_pair(&self.symbol, &self.quote)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            rsi_oversold: self.oversold,
            rsi_overbought: self.overbought,
            ..AnalyzerConfig::default()
        }
    }

    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::InvalidConfig("symbol must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidConfig("request_timeout_secs must be > 0".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig("refresh_interval_secs must be > 0".into()));
        }
        if self.rsi_period == 0 {
            return Err(Error::InvalidConfig("rsi_period must be > 0".into()));
        }
        if self.candle_limit == 0 {
            return Err(Error::InvalidConfig("candle_limit must be > 0".into()));
        }
        if self.history_capacity == 0 || self.history_capacity > DEFAULT_HISTORY_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "history_capacity must be between 1 and {}, got {}",
                DEFAULT_HISTORY_CAPACITY, self.history_capacity
            )));
        }
        if self.fallback_usdt_rate.is_nan() || self.fallback_usdt_rate <= 0.0 {
            return Err(Error::InvalidConfig("fallback_usdt_rate must be > 0".into()));
        }
        self.analyzer_config().validate()
    }
}

/// Builder pre-loaded with the defaults above
fn defaults_builder() -> Result<ConfigBuilder<DefaultState>> {
    let d = Settings::default();

    let builder = Config::builder()
        .set_default("symbol", d.symbol)?
        .set_default("quote", d.quote)?
        .set_default("okx_base_url", d.okx_base_url)?
        .set_default("coingecko_base_url", d.coingecko_base_url)?
        .set_default("request_timeout_secs", d.request_timeout_secs as i64)?
        .set_default("refresh_interval_secs", d.refresh_interval_secs as i64)?
        .set_default("fast_bar", d.fast_bar)?
        .set_default("slow_bar", d.slow_bar)?
        .set_default("candle_limit", d.candle_limit as i64)?
        .set_default("rsi_period", d.rsi_period as i64)?
        .set_default("history_capacity", d.history_capacity as i64)?
        .set_default("fallback_usdt_rate", d.fallback_usdt_rate)?
        .set_default("oversold", d.oversold)?
        .set_default("overbought", d.overbought)?;

    Ok(builder)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings in layers
///
/// 1. Built-in defaults.
/// 2. `signalbot.toml` or `config/signalbot.toml`, if present.
/// 3. Environment variables such as `SIGNALBOT__SYMBOL=BTC`.
pub fn load_settings() -> Result<Settings> {
    let builder = defaults_builder()?
        .add_source(File::with_name("signalbot").required(false))
        .add_source(File::with_name("config/signalbot").required(false))
        .add_source(
            Environment::with_prefix("SIGNALBOT")
                .separator("__")
                .try_parsing(true),
        );

    finish(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.pair(), "ETH-USDT");
        assert_eq!(settings.refresh_interval(), Duration::from_secs(30));
        assert_eq!(settings.history_capacity, 50);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let toml = r#"
            symbol = "sol"
            refresh_interval_secs = 10
            overbought = 80.0
        "#;

        let builder = defaults_builder()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml));
        let settings = finish(builder).unwrap();

        assert_eq!(settings.pair(), "SOL-USDT");
        assert_eq!(settings.refresh_interval_secs, 10);
        assert_eq!(settings.overbought, 80.0);
        // Untouched keys keep their defaults
        assert_eq!(settings.candle_limit, 25);
        assert_eq!(settings.fast_bar, "15m");
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let settings = Settings {
            oversold: 75.0,
            overbought: 70.0,
            ..Settings::default()
        };

        let err = settings.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let settings = Settings {
            refresh_interval_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_history_capacity_bounds() {
        for history_capacity in [0, DEFAULT_HISTORY_CAPACITY + 1, usize::MAX] {
            let settings = Settings {
                history_capacity,
                ..Settings::default()
            };
            assert!(
                matches!(settings.validate(), Err(Error::InvalidConfig(_))),
                "capacity {} accepted",
                history_capacity
            );
        }

        let settings = Settings {
            history_capacity: 10,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_history_capacity_from_env_style_override() {
        let builder = defaults_builder()
            .unwrap()
            .set_override("history_capacity", "18446744073709551615")
            .unwrap();
        assert!(finish(builder).is_err());
    }

    #[test]
    fn test_analyzer_config_uses_thresholds() {
        let settings = Settings {
            oversold: 25.0,
            overbought: 75.0,
            ..Settings::default()
        };

        let cfg = settings.analyzer_config();
        assert_eq!(cfg.rsi_oversold, 25.0);
        assert_eq!(cfg.rsi_overbought, 75.0);
        assert_eq!(cfg.reward_ratio, 1.5);
    }
}
