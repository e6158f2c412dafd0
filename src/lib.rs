// Core modules
pub mod api;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod notifier;
pub mod settings;
pub mod strategy;

// Re-export commonly used types
pub use error::{Error, FeedError, Result};
pub use execution::{RefreshController, RefreshMode};
pub use models::*;
pub use strategy::{analyze_market, SignalAnalyzer};
