// Technical indicators module
pub mod rsi;

pub use rsi::{calculate_rsi, closes_oldest_first, DEFAULT_RSI_PERIOD, NEUTRAL_RSI};
