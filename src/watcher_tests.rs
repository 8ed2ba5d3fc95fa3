//! Scenario tests for the polling loop

#[cfg(test)]
mod tests {
    use super::super::client::PriceSource;
    use super::super::config::{AlertConfig, Config};
    use super::super::error::{BotError, Result};
    use super::super::notify::Notifier;
    use super::super::types::{DailyClose, SymbolStatus};
    use super::super::watcher::Watcher;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rand::Rng;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Price source that replays scripted per-cycle results.
    struct ScriptedSource {
        script: Mutex<Vec<Result<HashMap<String, DailyClose>>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<HashMap<String, DailyClose>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PriceSource for Arc<ScriptedSource> {
        async fn latest_closes(
            &self,
            _symbols: &[String],
        ) -> Result<HashMap<String, DailyClose>> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(HashMap::new())
            } else {
                script.remove(0)
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Notifier that records every delivery attempt.
    struct CapturingNotifier {
        sent: Mutex<Vec<String>>,
        attempts: Mutex<usize>,
        fail: bool,
    }

    impl CapturingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                attempts: Mutex::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                attempts: Mutex::new(0),
                fail: true,
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl Notifier for Arc<CapturingNotifier> {
        async fn send_text(&self, body: &str) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;
            if self.fail {
                return Err(BotError::Notify("simulated outage".to_string()));
            }
            self.sent.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn test_config(entries: &[(&str, &str, Option<f64>, Option<f64>)]) -> Config {
        Config {
            alerts: entries
                .iter()
                .map(|(symbol, name, lower, upper)| {
                    (
                        (*symbol).to_string(),
                        AlertConfig {
                            name: (*name).to_string(),
                            lower_trigger: *lower,
                            upper_trigger: *upper,
                        },
                    )
                })
                .collect(),
            min_sleep_time_s: 60.0,
            random_extra_sleep_time_s: 120.0,
        }
    }

    fn abc_config() -> Config {
        test_config(&[("ABC", "ABC Corp", Some(10.0), Some(20.0))])
    }

    fn closes(entries: &[(&str, f64)]) -> Result<HashMap<String, DailyClose>> {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        Ok(entries
            .iter()
            .map(|(symbol, close)| {
                (
                    (*symbol).to_string(),
                    DailyClose {
                        date,
                        close: *close,
                    },
                )
            })
            .collect())
    }

    #[tokio::test]
    async fn test_first_cycle_reports_unclassified_transition() {
        let source = ScriptedSource::new(vec![closes(&[("ABC", 9.5)])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            "**ABC Corp**\nNone -> BELOW_RANGE\nV: 9.500 -- [10.000,20.000]"
        );
        assert_eq!(watcher.status_of("ABC"), Some(SymbolStatus::BelowRange));
    }

    #[tokio::test]
    async fn test_no_message_when_status_unchanged() {
        let source = ScriptedSource::new(vec![closes(&[("ABC", 15.0)]), closes(&[("ABC", 15.0)])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;
        watcher.run_cycle().await;

        // first cycle reports the initial classification, second is silent
        assert_eq!(notifier.attempts(), 1);
        assert_eq!(watcher.status_of("ABC"), Some(SymbolStatus::WithinRange));
    }

    #[tokio::test]
    async fn test_transition_sequence_below_then_within() {
        let source = ScriptedSource::new(vec![
            closes(&[("ABC", 9.5)]),
            closes(&[("ABC", 15.0)]),
            closes(&[("ABC", 15.0)]),
        ]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;
        watcher.run_cycle().await;
        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("None -> BELOW_RANGE"));
        assert!(sent[1].contains("BELOW_RANGE -> WITHIN_RANGE"));
    }

    #[tokio::test]
    async fn test_within_to_above_digest_format() {
        let source = ScriptedSource::new(vec![closes(&[("ABC", 15.0)]), closes(&[("ABC", 25.0)])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;
        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(
            sent[1],
            "**ABC Corp**\nWITHIN_RANGE -> ABOVE_RANGE\nV: 25.000 -- [10.000,20.000]"
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_sends_single_line_report() {
        let source = ScriptedSource::new(vec![Err(BotError::Fetch(
            "connection reset by upstream".to_string(),
        ))]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0],
            "Failed to get data! fetch error: connection reset by upstream"
        );
        assert!(!sent[0].contains('\n'));
        // remembered status is untouched by a failed cycle
        assert_eq!(watcher.status_of("ABC"), Some(SymbolStatus::Unclassified));
    }

    #[tokio::test]
    async fn test_fetch_failure_preserves_statuses() {
        let source = ScriptedSource::new(vec![
            Err(BotError::Fetch("timeout".to_string())),
            closes(&[("ABC", 15.0)]),
        ]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;
        watcher.run_cycle().await;

        // recovery cycle still reports from the start state
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].contains("None -> WITHIN_RANGE"));
    }

    #[tokio::test]
    async fn test_multi_symbol_digest_order_and_separator() {
        let config = test_config(&[
            ("XYZ", "XYZ Inc", Some(10.0), Some(20.0)),
            ("ABC", "ABC Corp", Some(10.0), Some(20.0)),
        ]);
        let source = ScriptedSource::new(vec![closes(&[("ABC", 25.0), ("XYZ", 5.0)])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&config, source, notifier.clone());

        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        // blocks come out in symbol order, blank line separated
        assert_eq!(
            sent[0],
            "**ABC Corp**\nNone -> ABOVE_RANGE\nV: 25.000 -- [10.000,20.000]\n\n\
             **XYZ Inc**\nNone -> BELOW_RANGE\nV: 5.000 -- [10.000,20.000]"
        );
    }

    #[tokio::test]
    async fn test_symbol_missing_from_update_is_skipped() {
        let config = test_config(&[
            ("ABC", "ABC Corp", Some(10.0), Some(20.0)),
            ("XYZ", "XYZ Inc", Some(10.0), Some(20.0)),
        ]);
        let source = ScriptedSource::new(vec![closes(&[("ABC", 15.0)])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&config, source, notifier.clone());

        watcher.run_cycle().await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("ABC Corp"));
        assert!(!sent[0].contains("XYZ"));
        assert_eq!(watcher.status_of("XYZ"), Some(SymbolStatus::Unclassified));
    }

    #[tokio::test]
    async fn test_send_failure_still_advances_status() {
        let source = ScriptedSource::new(vec![closes(&[("ABC", 9.5)]), closes(&[("ABC", 9.5)])]);
        let notifier = CapturingNotifier::failing();
        let mut watcher = Watcher::new(&abc_config(), source, notifier.clone());

        watcher.run_cycle().await;
        assert_eq!(watcher.status_of("ABC"), Some(SymbolStatus::BelowRange));

        // the lost digest is not retried on the next unchanged cycle
        watcher.run_cycle().await;
        assert_eq!(notifier.attempts(), 1);
    }

    #[tokio::test]
    async fn test_empty_alerts_sends_nothing() {
        let source = ScriptedSource::new(vec![closes(&[])]);
        let notifier = CapturingNotifier::new();
        let mut watcher = Watcher::new(&test_config(&[]), source, notifier.clone());

        watcher.run_cycle().await;

        assert_eq!(notifier.attempts(), 0);
    }

    #[test]
    fn test_sleep_duration_within_bounds() {
        let source = ScriptedSource::new(vec![]);
        let notifier = CapturingNotifier::new();
        let watcher = Watcher::new(&abc_config(), source, notifier);

        for roll in [0.0, 0.25, 0.5, 0.9999] {
            let sleep = watcher.sleep_duration(roll);
            assert!(sleep >= Duration::from_secs(60), "roll {roll}: {sleep:?}");
            assert!(sleep < Duration::from_secs(180), "roll {roll}: {sleep:?}");
        }

        let mut rng = rand::rng();
        for _ in 0..1000 {
            let sleep = watcher.sleep_duration(rng.random());
            assert!(sleep >= Duration::from_secs(60) && sleep < Duration::from_secs(180));
        }
    }

    #[test]
    fn test_sleep_duration_without_jitter_is_exact() {
        let mut config = abc_config();
        config.random_extra_sleep_time_s = 0.0;
        let source = ScriptedSource::new(vec![]);
        let notifier = CapturingNotifier::new();
        let watcher = Watcher::new(&config, source, notifier);

        assert_eq!(watcher.sleep_duration(0.0), Duration::from_secs(60));
        assert_eq!(watcher.sleep_duration(0.9999), Duration::from_secs(60));
    }

    #[test]
    fn test_sleep_duration_saturates_on_huge_values() {
        let mut config = abc_config();
        config.min_sleep_time_s = f64::MAX;
        let source = ScriptedSource::new(vec![]);
        let notifier = CapturingNotifier::new();
        let watcher = Watcher::new(&config, source, notifier);

        assert_eq!(watcher.sleep_duration(0.5), Duration::MAX);
    }

    #[tokio::test]
    async fn test_run_completes_cycle_before_shutdown() {
        let source = ScriptedSource::new(vec![closes(&[("ABC", 15.0)])]);
        let notifier = CapturingNotifier::new();
        let watcher = Watcher::new(&abc_config(), source.clone(), notifier.clone());

        // shutdown is already resolved; the cycle still runs once and the
        // sleep is skipped
        watcher.run(async {}).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(notifier.sent().len(), 1);
    }
}
