use crate::models::{AnalysisResult, TradeAction};

/// Price levels are compared at this precision (1e-4)
const LEVEL_SCALE: f64 = 10_000.0;

/// What makes two signals "the same" for notification purposes
#[derive(Debug, Clone, PartialEq, Eq)]
struct SignalFingerprint {
    action: TradeAction,
    reason: String,
    levels: [i64; 7],
}

impl SignalFingerprint {
    fn of(result: &AnalysisResult) -> Self {
        let scale = |v: f64| (v * LEVEL_SCALE).round() as i64;
        Self {
            action: result.action,
            reason: result.reason.clone(),
            levels: [
                scale(result.entry),
                scale(result.stop_loss),
                scale(result.take_profit),
                scale(result.limit_buy),
                scale(result.limit_sell),
                scale(result.trailing_activation),
                scale(result.trailing_callback_pct),
            ],
        }
    }
}

/// Caller-side memory of the last signal the operator was told about
///
/// The refresh controller publishes every cycle; this decides which
/// publishes are worth an alert.
#[derive(Debug, Default)]
pub struct SignalNotifier {
    last_seen: Option<SignalFingerprint>,
}

impl SignalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `result` differs from the previously observed signal
    pub fn observe(&mut self, result: &AnalysisResult) -> bool {
        let fingerprint = SignalFingerprint::of(result);
        if self.last_seen.as_ref() == Some(&fingerprint) {
            return false;
        }
        self.last_seen = Some(fingerprint);
        true
    }

    /// Forget the last signal so the next one always notifies
    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::analyze_market;

    #[test]
    fn test_first_signal_notifies() {
        let mut notifier = SignalNotifier::new();
        let result = analyze_market(100.0, 90.0, 110.0, 25.0, 50.0);
        assert!(notifier.observe(&result));
    }

    #[test]
    fn test_repeat_signal_is_suppressed() {
        let mut notifier = SignalNotifier::new();
        let result = analyze_market(100.0, 90.0, 110.0, 25.0, 50.0);

        assert!(notifier.observe(&result));
        assert!(!notifier.observe(&result.clone()));
        assert!(!notifier.observe(&result));
    }

    #[test]
    fn test_changed_levels_notify() {
        let mut notifier = SignalNotifier::new();

        assert!(notifier.observe(&analyze_market(100.0, 90.0, 110.0, 25.0, 50.0)));
        // Same action, new price
        assert!(notifier.observe(&analyze_market(101.0, 90.0, 110.0, 25.0, 50.0)));
    }

    #[test]
    fn test_changed_action_notifies() {
        let mut notifier = SignalNotifier::new();

        assert!(notifier.observe(&analyze_market(100.0, 90.0, 110.0, 50.0, 50.0)));
        assert!(notifier.observe(&analyze_market(100.0, 90.0, 110.0, 75.0, 50.0)));
    }

    #[test]
    fn test_reset() {
        let mut notifier = SignalNotifier::new();
        let result = analyze_market(100.0, 90.0, 110.0, 50.0, 50.0);

        notifier.observe(&result);
        notifier.reset();
        assert!(notifier.observe(&result));
    }
}
