//! Core domain types: price bands, classification states, daily closes

use chrono::NaiveDate;
use std::fmt;

/// Classification of a closing price against a target band.
///
/// `Unclassified` is the start state for every tracked symbol and is never
/// produced by classification; it exists so the first real classification
/// always registers as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStatus {
    Unclassified,
    BelowRange,
    WithinRange,
    AboveRange,
}

impl SymbolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            // rendered placeholder for "no prior observation"
            SymbolStatus::Unclassified => "None",
            SymbolStatus::BelowRange => "BELOW_RANGE",
            SymbolStatus::WithinRange => "WITHIN_RANGE",
            SymbolStatus::AboveRange => "ABOVE_RANGE",
        }
    }
}

impl fmt::Display for SymbolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Price band for one symbol. Either side may be unbounded, in which case
/// it is stored as the corresponding infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self {
            lower: lower.unwrap_or(f64::NEG_INFINITY),
            upper: upper.unwrap_or(f64::INFINITY),
        }
    }

    /// Classify a close against this band.
    ///
    /// The lower bound is inclusive (a close exactly on `lower` counts as
    /// within) while the upper bound belongs to the region above. Total for
    /// every f64: NaN fails both comparisons and lands above.
    pub fn classify(&self, price: f64) -> SymbolStatus {
        if price < self.lower {
            SymbolStatus::BelowRange
        } else if price < self.upper {
            SymbolStatus::WithinRange
        } else {
            SymbolStatus::AboveRange
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3},{:.3}]", self.lower, self.upper)
    }
}

/// Last completed trading session for one symbol. Produced fresh each cycle
/// and discarded after classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyClose {
    /// UTC date of the session the close belongs to.
    pub date: NaiveDate,
    pub close: f64,
}

/// A watched symbol: display name, target band, and the classification
/// remembered from the previous cycle.
#[derive(Debug, Clone)]
pub struct TrackedSymbol {
    pub name: String,
    pub band: Band,
    pub last_status: SymbolStatus,
}

impl TrackedSymbol {
    pub fn new(name: impl Into<String>, band: Band) -> Self {
        Self {
            name: name.into(),
            band,
            last_status: SymbolStatus::Unclassified,
        }
    }
}
