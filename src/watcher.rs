//! Polling loop: fetch closes, classify against bands, notify on change
//!
//! One `Watcher` owns every tracked symbol and is the only writer of their
//! remembered statuses. A cycle is all-or-nothing on the fetch side: a
//! failed batch produces a single failure report and leaves every
//! remembered status untouched, so the next successful cycle still reports
//! the transition the outage hid.

use crate::client::PriceSource;
use crate::config::Config;
use crate::notify::Notifier;
use crate::types::{DailyClose, SymbolStatus, TrackedSymbol};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Polling loop state: tracked symbols plus the two gateways.
pub struct Watcher<S, N> {
    symbols: BTreeMap<String, TrackedSymbol>,
    min_sleep_time_s: f64,
    random_extra_sleep_time_s: f64,
    source: S,
    notifier: N,
}

impl<S: PriceSource, N: Notifier> Watcher<S, N> {
    /// Build a watcher from validated configuration. Every symbol starts
    /// unclassified so the first cycle always reports.
    pub fn new(config: &Config, source: S, notifier: N) -> Self {
        let symbols = config
            .alerts
            .iter()
            .map(|(symbol, alert)| {
                (
                    symbol.clone(),
                    TrackedSymbol::new(alert.name.clone(), alert.band()),
                )
            })
            .collect();

        Self {
            symbols,
            min_sleep_time_s: config.min_sleep_time_s,
            random_extra_sleep_time_s: config.random_extra_sleep_time_s,
            source,
            notifier,
        }
    }

    /// Remembered classification for one symbol.
    pub fn status_of(&self, symbol: &str) -> Option<SymbolStatus> {
        self.symbols.get(symbol).map(|tracked| tracked.last_status)
    }

    /// Apply one fetched update: classify every tracked symbol, record
    /// changed statuses, and return one digest block per change in map
    /// order. Symbols missing from the update are skipped untouched.
    fn diff_update(&mut self, update: &HashMap<String, DailyClose>) -> Vec<String> {
        let mut blocks = Vec::new();
        for (symbol, tracked) in self.symbols.iter_mut() {
            let Some(observed) = update.get(symbol) else {
                debug!("{}: missing from update, skipping", symbol);
                continue;
            };

            let status = tracked.band.classify(observed.close);
            if status == tracked.last_status {
                continue;
            }

            info!(
                "{}: {} -> {} at {:.3} ({})",
                symbol, tracked.last_status, status, observed.close, observed.date
            );
            blocks.push(format!(
                "**{}**\n{} -> {}\nV: {:.3} -- {}",
                tracked.name, tracked.last_status, status, observed.close, tracked.band
            ));
            tracked.last_status = status;
        }
        blocks
    }

    /// One fetch, classify, notify pass.
    pub async fn run_cycle(&mut self) {
        let symbols: Vec<String> = self.symbols.keys().cloned().collect();
        let text = match self.source.latest_closes(&symbols).await {
            Ok(update) => {
                debug!(
                    "fetched {} closes from {}",
                    update.len(),
                    self.source.name()
                );
                self.diff_update(&update).join("\n\n")
            }
            Err(e) => {
                warn!("fetch failed: {}", e);
                format!("Failed to get data! {e}")
            }
        };

        if text.is_empty() {
            debug!("no status changes this cycle");
            return;
        }

        // Delivery failures are logged and swallowed; statuses were already
        // advanced, so a lost digest is not resent.
        match self.notifier.send_text(&text).await {
            Ok(()) => info!("sent update message:\n{}", text),
            Err(e) => error!("failed to deliver update: {}", e),
        }
    }

    /// Sleep duration for one cycle given a uniform `[0, 1)` roll. Cadences
    /// beyond what `Duration` can represent saturate at `Duration::MAX`.
    pub(crate) fn sleep_duration(&self, roll: f64) -> Duration {
        let secs = self.min_sleep_time_s + roll * self.random_extra_sleep_time_s;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Poll until `shutdown` resolves. The in-flight cycle always finishes;
    /// the signal is only honored in place of the sleep.
    pub async fn run<F: Future<Output = ()>>(mut self, shutdown: F) {
        info!("watching {} symbols", self.symbols.len());
        tokio::pin!(shutdown);

        loop {
            self.run_cycle().await;

            let sleep = self.sleep_duration(rand::rng().random());
            info!("sleeping for {:.1}h", sleep.as_secs_f64() / 3600.0);
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping watcher");
                    break;
                }
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }
}
