//! Price Band Alert Bot
//!
//! Polls end-of-day closing prices for a configured set of symbols,
//! classifies each close against a per-symbol price band, and sends a
//! Telegram digest whenever any classification changes.
//!
//! ## Architecture
//!
//! ```text
//! PriceSource (Yahoo) → Watcher (classify vs band, diff vs last status) → Notifier (Telegram)
//!                          ↑
//!               Config (alerts, cadence) + Secrets (bot token, chat id)
//! ```
//!
//! State lives entirely in memory; a restart reclassifies everything and
//! resends the current picture.

pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod types;
pub mod watcher;

#[cfg(test)]
mod watcher_tests;
