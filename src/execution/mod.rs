// Data collection and the analysis refresh loop
pub mod controller;
pub mod history;
pub mod price_feed;

pub use controller::{AutoHandle, ControllerConfig, RefreshController, RefreshMode, SessionSnapshot};
pub use history::{HistoryLog, DEFAULT_HISTORY_CAPACITY};
pub use price_feed::{MarketData, OkxFeed, PriceFeed, SyntheticFeed};
