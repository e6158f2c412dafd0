// Signal analysis and trade planning
pub mod analyzer;
pub mod profit;

pub use analyzer::{analyze_market, AnalyzerConfig, SignalAnalyzer};
pub use profit::{estimate_profit, ProfitEstimate};
