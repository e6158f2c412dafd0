use super::history::HistoryLog;
use super::price_feed::PriceFeed;
use crate::error::Result;
use crate::indicators::{calculate_rsi, closes_oldest_first};
use crate::models::{LogEntry, PublishedAnalysis};
use crate::settings::Settings;
use crate::strategy::SignalAnalyzer;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How the session refreshes its analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshMode {
    /// One cycle per explicit trigger
    Manual,
    /// A cycle every refresh interval until stopped
    Auto,
}

/// Per-session controller parameters
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub pair: String,
    pub rsi_period: usize,
    pub refresh_interval: Duration,
    pub history_capacity: usize,
    pub analyzer: SignalAnalyzer,
}

impl ControllerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pair: settings.pair(),
            rsi_period: settings.rsi_period,
            refresh_interval: settings.refresh_interval(),
            history_capacity: settings.history_capacity,
            analyzer: SignalAnalyzer::new(settings.analyzer_config()),
        }
    }
}

/// Read-only copy of the session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub current: Option<PublishedAnalysis>,
    pub history: HistoryLog,
    pub mode: RefreshMode,
}

/// Slot and log, always updated together under one lock
#[derive(Debug)]
struct SessionState {
    current: Option<PublishedAnalysis>,
    history: HistoryLog,
}

struct Inner {
    feed: Arc<dyn PriceFeed>,
    config: ControllerConfig,
    state: RwLock<SessionState>,
    // Serializes cycles so a manual trigger never overlaps an auto tick
    cycle_lock: Mutex<()>,
    auto_token: Mutex<Option<CancellationToken>>,
    publish_tx: watch::Sender<Option<PublishedAnalysis>>,
}

/// Drives fetch → RSI → analyze → publish cycles for one pair
///
/// Owns the current-result slot and the history log. Cloning is cheap and
/// every clone controls the same session.
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<Inner>,
}

impl RefreshController {
    pub fn new(feed: Arc<dyn PriceFeed>, config: ControllerConfig) -> Self {
        let (publish_tx, _) = watch::channel(None);
        let history = HistoryLog::new(config.history_capacity);

        Self {
            inner: Arc::new(Inner {
                feed,
                config,
                state: RwLock::new(SessionState {
                    current: None,
                    history,
                }),
                cycle_lock: Mutex::new(()),
                auto_token: Mutex::new(None),
                publish_tx,
            }),
        }
    }

    pub fn pair(&self) -> &str {
        &self.inner.config.pair
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.config.refresh_interval
    }

    /// Run one full cycle
    ///
    /// On a feed failure nothing is published and the session is unchanged.
    pub async fn run_cycle(&self) -> Result<PublishedAnalysis> {
        let _cycle = self.inner.cycle_lock.lock().await;
        self.run_cycle_locked().await
    }

    /// Auto-mode cycle; skipped if `token` was cancelled while waiting for the lock
    async fn run_auto_cycle(&self, token: &CancellationToken) -> Option<Result<PublishedAnalysis>> {
        let _cycle = self.inner.cycle_lock.lock().await;
        if token.is_cancelled() {
            tracing::debug!(pair = %self.pair(), "Auto cycle skipped after stop");
            return None;
        }
        Some(self.run_cycle_locked().await)
    }

    /// Cycle body; caller must hold `cycle_lock`
    async fn run_cycle_locked(&self) -> Result<PublishedAnalysis> {
        let config = &self.inner.config;

        let data = match self.inner.feed.fetch_market_data(&config.pair).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    pair = %config.pair,
                    feed = self.inner.feed.name(),
                    "Analysis cycle aborted: {}",
                    e
                );
                return Err(e.into());
            }
        };

        let fast_rsi = calculate_rsi(&closes_oldest_first(&data.fast_candles), config.rsi_period);
        let slow_rsi = calculate_rsi(&closes_oldest_first(&data.slow_candles), config.rsi_period);

        let result = config
            .analyzer
            .analyze_snapshot(&data.snapshot, fast_rsi, slow_rsi);

        let published = PublishedAnalysis {
            symbol: config.pair.clone(),
            snapshot: data.snapshot,
            fast_rsi,
            slow_rsi,
            result,
            timestamp: Utc::now(),
        };

        tracing::info!(
            pair = %config.pair,
            price = %published.snapshot.last,
            fast_rsi = %format!("{:.2}", fast_rsi),
            slow_rsi = %format!("{:.2}", slow_rsi),
            action = %published.result.action,
            "Published analysis"
        );

        self.publish(published.clone()).await;
        Ok(published)
    }

    /// Replace the slot and append to the log in a single write
    async fn publish(&self, published: PublishedAnalysis) {
        {
            let mut state = self.inner.state.write().await;
            state.history.record(LogEntry::from(&published));
            state.current = Some(published.clone());
        }
        self.inner.publish_tx.send_replace(Some(published));
    }

    /// Manual mode: one cycle on demand
    pub async fn trigger(&self) -> Result<PublishedAnalysis> {
        tracing::debug!(pair = %self.pair(), "Manual analysis triggered");
        self.run_cycle().await
    }

    /// Switch to auto mode
    ///
    /// Runs a cycle right away if nothing has been published yet, then one
    /// every refresh interval. Replaces any loop already running.
    pub async fn start_auto(&self) -> AutoHandle {
        let token = CancellationToken::new();

        {
            let mut slot = self.inner.auto_token.lock().await;
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }

        tracing::info!(
            pair = %self.pair(),
            interval_secs = self.refresh_interval().as_secs(),
            "Auto refresh started"
        );

        let controller = self.clone();
        let loop_token = token.clone();
        let task = tokio::spawn(async move {
            controller.auto_loop(loop_token).await;
        });

        AutoHandle { token, task }
    }

    /// Leave auto mode
    ///
    /// No new cycle starts afterwards; a cycle already running still publishes.
    pub async fn stop_auto(&self) {
        if let Some(token) = self.inner.auto_token.lock().await.take() {
            token.cancel();
            tracing::info!(pair = %self.pair(), "Auto refresh stopped");
        }
    }

    async fn auto_loop(&self, token: CancellationToken) {
        if self.current().await.is_none() && self.run_auto_cycle(&token).await.is_none() {
            return;
        }

        let interval = self.refresh_interval();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            // Errors are logged inside; the loop keeps going
            if self.run_auto_cycle(&token).await.is_none() {
                break;
            }
        }

        tracing::debug!(pair = %self.pair(), "Auto refresh loop exited");
    }

    pub async fn is_auto(&self) -> bool {
        matches!(
            self.inner.auto_token.lock().await.as_ref(),
            Some(token) if !token.is_cancelled()
        )
    }

    pub async fn mode(&self) -> RefreshMode {
        if self.is_auto().await {
            RefreshMode::Auto
        } else {
            RefreshMode::Manual
        }
    }

    /// Latest published analysis, if any
    pub async fn current(&self) -> Option<PublishedAnalysis> {
        self.inner.state.read().await.current.clone()
    }

    pub async fn history(&self) -> HistoryLog {
        self.inner.state.read().await.history.clone()
    }

    pub async fn clear_history(&self) {
        self.inner.state.write().await.history.clear();
        tracing::info!(pair = %self.pair(), "History cleared");
    }

    /// Consistent copy of slot, log and mode
    pub async fn session(&self) -> SessionSnapshot {
        let mode = self.mode().await;
        let state = self.inner.state.read().await;

        SessionSnapshot {
            current: state.current.clone(),
            history: state.history.clone(),
            mode,
        }
    }

    /// Receiver that sees every publish
    pub fn subscribe(&self) -> watch::Receiver<Option<PublishedAnalysis>> {
        self.inner.publish_tx.subscribe()
    }
}

/// Handle to a running auto-refresh loop
pub struct AutoHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl AutoHandle {
    /// Request the loop to stop without waiting for it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for any in-flight cycle to publish
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Auto refresh task failed: {}", e);
        }
    }
}
