//! Presenter view models.
//!
//! Pure functions over fetched payloads. Front ends render these and never
//! look at raw fetch state directly.

use crate::api::Prediction;
use crate::fetch::FetchState;

/// What a screen's data area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRegion<T> {
    Idle,
    Loading,
    Error(String),
    Ready(T),
}

impl<T> DataRegion<T> {
    /// Project a slot state through `pick`. A success whose payload does not
    /// belong to this region renders as idle.
    pub fn from_state<'a, P>(state: &'a FetchState<P>, pick: impl FnOnce(&'a P) -> Option<T>) -> Self {
        match state {
            FetchState::Idle => DataRegion::Idle,
            FetchState::Pending(_) => DataRegion::Loading,
            FetchState::Failure { error, .. } => DataRegion::Error(error.user_message()),
            FetchState::Success { value, .. } => match pick(value) {
                Some(v) => DataRegion::Ready(v),
                None => DataRegion::Idle,
            },
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DataRegion::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            DataRegion::Ready(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl Signal {
    /// `strong_buy` counts as buy and `strong_sell` as sell.
    pub fn classify(raw: &str) -> Signal {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" | "strong_buy" => Signal::Buy,
            "sell" | "strong_sell" => Signal::Sell,
            _ => Signal::Hold,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Hold => "HOLD",
            Signal::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Up => "↑",
            Trend::Down => "↓",
            Trend::Sideways => "→",
        }
    }
}

/// Buy/hold/sell counts across a set of predictions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalDistribution {
    pub buy: usize,
    pub hold: usize,
    pub sell: usize,
}

impl SignalDistribution {
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let mut dist = Self::default();
        for p in predictions {
            match Signal::classify(&p.signal) {
                Signal::Buy => dist.buy += 1,
                Signal::Hold => dist.hold += 1,
                Signal::Sell => dist.sell += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.buy + self.hold + self.sell
    }

    /// Share of `count` in percent; 0 when there are no predictions.
    pub fn percent(&self, count: usize) -> f64 {
        match self.total() {
            0 => 0.0,
            n => count as f64 * 100.0 / n as f64,
        }
    }

    pub fn trend(&self) -> Trend {
        use std::cmp::Ordering;
        match self.buy.cmp(&self.sell) {
            Ordering::Greater => Trend::Up,
            Ordering::Less => Trend::Down,
            Ordering::Equal => Trend::Sideways,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetaBand {
    Negative,
    Low,
    Moderate,
    Market,
    Elevated,
    High,
    Extreme,
    Unknown,
}

impl BetaBand {
    pub fn classify(beta: Option<f64>) -> BetaBand {
        let Some(b) = beta.filter(|b| b.is_finite()) else {
            return BetaBand::Unknown;
        };
        if b < 0.0 {
            BetaBand::Negative
        } else if b < 0.5 {
            BetaBand::Low
        } else if b < 1.0 {
            BetaBand::Moderate
        } else if b == 1.0 {
            BetaBand::Market
        } else if b < 1.5 {
            BetaBand::Elevated
        } else if b < 2.0 {
            BetaBand::High
        } else {
            BetaBand::Extreme
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BetaBand::Negative => "Negative",
            BetaBand::Low => "Low",
            BetaBand::Moderate => "Moderate",
            BetaBand::Market => "Market",
            BetaBand::Elevated => "Elevated",
            BetaBand::High => "High",
            BetaBand::Extreme => "Extreme",
            BetaBand::Unknown => "N/A",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BetaBand::Negative => "Moves against the market",
            BetaBand::Low => "Much less volatile than the market",
            BetaBand::Moderate => "Less volatile than the market",
            BetaBand::Market => "Moves with the market",
            BetaBand::Elevated => "More volatile than the market",
            BetaBand::High => "Much more volatile than the market",
            BetaBand::Extreme => "Extremely volatile relative to the market",
            BetaBand::Unknown => "Beta not available",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// `confidence` is a fraction in [0, 1].
    pub fn classify(confidence: f64) -> ConfidenceBand {
        if confidence >= 0.8 {
            ConfidenceBand::VeryHigh
        } else if confidence >= 0.6 {
            ConfidenceBand::High
        } else if confidence >= 0.4 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::VeryHigh => "Very high",
            ConfidenceBand::High => "High",
            ConfidenceBand::Medium => "Medium",
            ConfidenceBand::Low => "Low",
        }
    }
}

pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence.filter(|c| c.is_finite()) {
        Some(c) => format!("{:.1}%", c * 100.0),
        None => "N/A".to_string(),
    }
}

pub fn format_beta(beta: Option<f64>) -> String {
    match beta.filter(|b| b.is_finite()) {
        Some(b) => format!("{b:.3}"),
        None => "N/A".to_string(),
    }
}
