//! Market data access
//!
//! The watcher only ever needs "last completed session per symbol";
//! `PriceSource` is that seam and `YahooClient` the shipped implementation.

mod yahoo;


pub use yahoo::YahooClient;

use crate::error::Result;
use crate::types::DailyClose;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of end-of-day closes.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the last completed trading session for every symbol.
    ///
    /// All-or-nothing: any per-symbol failure fails the whole batch, and the
    /// caller treats the cycle as failed.
    async fn latest_closes(&self, symbols: &[String]) -> Result<HashMap<String, DailyClose>>;

    /// Source name for logging.
    fn name(&self) -> &str;
}
