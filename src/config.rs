//! Configuration loading and validation
//!
//! Two TOML files: the main config (alerts plus polling cadence) and a
//! separate secrets file with the Telegram credentials, so the main config
//! can be shared or committed without leaking the bot token.

use crate::error::{BotError, Result};
use crate::types::Band;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration: tracked symbols and polling cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Symbol -> alert definition. Sorted map so digest blocks and log
    /// lines come out in a stable order.
    pub alerts: BTreeMap<String, AlertConfig>,
    /// Minimum seconds slept between polling cycles.
    pub min_sleep_time_s: f64,
    /// Upper bound on the uniform random extra sleep, in seconds.
    pub random_extra_sleep_time_s: f64,
}

/// One `[alerts.<symbol>]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// Display name used in notification text.
    pub name: String,
    /// Lower band bound; unbounded below when omitted.
    pub lower_trigger: Option<f64>,
    /// Upper band bound; unbounded above when omitted.
    pub upper_trigger: Option<f64>,
}

impl AlertConfig {
    pub fn band(&self) -> Band {
        Band::new(self.lower_trigger, self.upper_trigger)
    }
}

/// Telegram credentials, kept out of the main config file.
#[derive(Debug, Clone, Deserialize)]
pub struct Secrets {
    pub bot_token: String,
    pub chat_id: String,
}

impl Config {
    /// Load and validate the main configuration file.
    pub fn load(path: &str) -> Result<Self> {
        let config: Config = read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // NaN passes every ordered comparison, so `< 0.0` alone is not enough.
        if !self.min_sleep_time_s.is_finite() || self.min_sleep_time_s < 0.0 {
            return Err(BotError::Config(format!(
                "min_sleep_time_s must be finite and non-negative, got {}",
                self.min_sleep_time_s
            )));
        }
        if !self.random_extra_sleep_time_s.is_finite() || self.random_extra_sleep_time_s < 0.0 {
            return Err(BotError::Config(format!(
                "random_extra_sleep_time_s must be finite and non-negative, got {}",
                self.random_extra_sleep_time_s
            )));
        }
        for (symbol, alert) in &self.alerts {
            let band = alert.band();
            if !(band.lower < band.upper) {
                return Err(BotError::Config(format!(
                    "alert {symbol}: lower_trigger {} must be strictly below upper_trigger {}",
                    band.lower, band.upper
                )));
            }
        }
        Ok(())
    }
}

impl Secrets {
    /// Load the secrets file (bot token and chat id).
    pub fn load(path: &str) -> Result<Self> {
        read_toml(path)
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let path = shellexpand::tilde(path);
    let settings = config::Config::builder()
        .add_source(config::File::new(path.as_ref(), config::FileFormat::Toml))
        .build()
        .map_err(|e| BotError::Config(format!("{path}: {e}")))?;
    settings
        .try_deserialize()
        .map_err(|e| BotError::Config(format!("{path}: {e}")))
}
