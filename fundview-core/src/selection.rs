//! Dependent selection store.
//!
//! Holds the current market code, ticker and analysis parameters together with
//! the option sets they are chosen from. The market code is upstream of the
//! ticker: changing it clears the ticker and invalidates the ticker options,
//! and the caller is told which ticker set to fetch next. Reads are always
//! synchronous and reflect the latest committed selection, whatever is in flight.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FetchError;

pub const DAYS_TO_PREDICT: &str = "days_to_predict";
pub const USE_BETA: &str = "use_beta";

/// An analysis parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// One-letter tag naming the value's type.
    pub fn type_tag(&self) -> char {
        match self {
            ParamValue::Bool(_) => 'b',
            ParamValue::Int(_) => 'i',
            ParamValue::Float(_) => 'f',
            ParamValue::Text(_) => 's',
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// What the user has picked. An empty string means "nothing selected".
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub market_code: String,
    pub ticker: String,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl Selection {
    pub fn with_defaults(days_to_predict: u32, use_beta: bool) -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            DAYS_TO_PREDICT.to_string(),
            ParamValue::Int(days_to_predict.max(1) as i64),
        );
        parameters.insert(USE_BETA.to_string(), ParamValue::Bool(use_beta));
        Self {
            market_code: String::new(),
            ticker: String::new(),
            parameters,
        }
    }

    pub fn has_ticker(&self) -> bool {
        !self.ticker.is_empty()
    }

    pub fn days_to_predict(&self) -> u32 {
        match self.parameters.get(DAYS_TO_PREDICT) {
            Some(ParamValue::Int(n)) if *n >= 1 => u32::try_from(*n).unwrap_or(u32::MAX),
            _ => 5,
        }
    }

    pub fn use_beta(&self) -> bool {
        !matches!(self.parameters.get(USE_BETA), Some(ParamValue::Bool(false)))
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::with_defaults(5, true)
    }
}

/// An unordered set of choices (market codes or tickers).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionSet {
    items: BTreeSet<String>,
}

impl OptionSet {
    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for OptionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Which tickers a ticker option set was loaded for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickerScope {
    Unscoped,
    Market(String),
}

impl TickerScope {
    pub fn for_market(code: &str) -> Self {
        if code.is_empty() {
            TickerScope::Unscoped
        } else {
            TickerScope::Market(code.to_string())
        }
    }

    /// The market code to query with, `None` for every ticker.
    pub fn market(&self) -> Option<&str> {
        match self {
            TickerScope::Unscoped => None,
            TickerScope::Market(code) => Some(code),
        }
    }
}

/// What an empty market code does to the ticker list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyMarketPolicy {
    /// Load every known ticker.
    #[default]
    AllTickers,
    /// Show no tickers until a market is chosen.
    NoTickers,
}

impl EmptyMarketPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "all_tickers" | "all" => Some(EmptyMarketPolicy::AllTickers),
            "no_tickers" | "none" => Some(EmptyMarketPolicy::NoTickers),
            _ => None,
        }
    }
}

/// What the caller must do after a market code change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickerRefresh {
    /// Fetch the ticker set for this scope.
    Fetch(TickerScope),
    /// The ticker set is already settled (empty); nothing to fetch.
    Settled,
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    selection: Selection,
    defaults: Selection,
    policy: EmptyMarketPolicy,
    market_codes: Option<OptionSet>,
    /// `None` while invalidated and not yet reloaded.
    tickers: Option<OptionSet>,
}

impl SelectionStore {
    pub fn new(policy: EmptyMarketPolicy, defaults: Selection) -> Self {
        Self {
            selection: defaults.clone(),
            defaults,
            policy,
            market_codes: None,
            tickers: None,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn policy(&self) -> EmptyMarketPolicy {
        self.policy
    }

    /// The selection a fresh session starts from.
    pub fn defaults(&self) -> &Selection {
        &self.defaults
    }

    pub fn market_codes(&self) -> Option<&OptionSet> {
        self.market_codes.as_ref()
    }

    pub fn tickers(&self) -> Option<&OptionSet> {
        self.tickers.as_ref()
    }

    pub fn ticker_scope(&self) -> TickerScope {
        TickerScope::for_market(&self.selection.market_code)
    }

    pub fn apply_market_codes(&mut self, codes: Vec<String>) {
        self.market_codes = Some(codes.into_iter().collect());
    }

    /// Commit a market code. The ticker is cleared and the ticker options are
    /// dropped; the returned value says which ticker set to load next.
    pub fn set_market_code(&mut self, code: &str) -> TickerRefresh {
        let code = code.trim();
        debug!(market_code = code, "market code selected");
        self.selection.market_code = code.to_string();
        self.selection.ticker.clear();
        self.tickers = None;

        if code.is_empty() && self.policy == EmptyMarketPolicy::NoTickers {
            self.tickers = Some(OptionSet::default());
            return TickerRefresh::Settled;
        }
        TickerRefresh::Fetch(self.ticker_scope())
    }

    /// Install a loaded ticker set. Ignored unless `scope` is still current.
    pub fn apply_tickers(&mut self, scope: &TickerScope, tickers: Vec<String>) -> bool {
        if *scope != self.ticker_scope() {
            debug!(?scope, "ticker set for a previous market ignored");
            return false;
        }
        self.tickers = Some(tickers.into_iter().collect());
        true
    }

    /// Commit a ticker. An empty ticker clears the selection. With a market
    /// chosen, the ticker must be one of that market's loaded tickers.
    pub fn set_ticker(&mut self, ticker: &str) -> Result<(), FetchError> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            self.selection.ticker.clear();
            return Ok(());
        }
        let market = &self.selection.market_code;
        if !market.is_empty() {
            match &self.tickers {
                None => {
                    return Err(FetchError::validation(format!(
                        "Tickers for {market} are still loading"
                    )))
                }
                Some(set) if !set.contains(ticker) => {
                    return Err(FetchError::validation(format!(
                        "{ticker} is not listed on {market}"
                    )))
                }
                Some(_) => {}
            }
        }
        self.selection.ticker = ticker.to_string();
        Ok(())
    }

    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), FetchError> {
        match (name, &value) {
            (DAYS_TO_PREDICT, ParamValue::Int(n)) if *n >= 1 => {}
            (DAYS_TO_PREDICT, _) => {
                return Err(FetchError::validation(
                    "Days to predict must be a whole number of at least 1",
                ))
            }
            (USE_BETA, ParamValue::Bool(_)) => {}
            (USE_BETA, _) => return Err(FetchError::validation("Use beta must be true or false")),
            _ => {}
        }
        self.selection.parameters.insert(name.to_string(), value);
        Ok(())
    }

    /// Drop the loaded option sets and the market/ticker chosen from them.
    /// Analysis parameters are kept.
    pub fn clear_options(&mut self) {
        self.selection.market_code.clear();
        self.selection.ticker.clear();
        self.market_codes = None;
        self.tickers = None;
    }

    /// Back to defaults with no options loaded.
    pub fn reset(&mut self) {
        self.selection = self.defaults.clone();
        self.market_codes = None;
        self.tickers = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(policy: EmptyMarketPolicy) -> SelectionStore {
        SelectionStore::new(policy, Selection::default())
    }

    #[test]
    fn defaults_carry_analysis_parameters() {
        let sel = Selection::default();
        assert_eq!(sel.days_to_predict(), 5);
        assert!(sel.use_beta());
        assert!(!sel.has_ticker());
    }

    #[test]
    fn market_change_clears_ticker_and_asks_for_scoped_fetch() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.set_market_code("HOSE");
        assert!(s.apply_tickers(&TickerScope::for_market("HOSE"), vec!["VNM".into(), "FPT".into()]));
        s.set_ticker("FPT").unwrap();

        let refresh = s.set_market_code("HNX");
        assert_eq!(refresh, TickerRefresh::Fetch(TickerScope::Market("HNX".into())));
        assert_eq!(s.selection().ticker, "");
        assert_eq!(s.selection().market_code, "HNX");
        assert!(s.tickers().is_none());
    }

    #[test]
    fn empty_market_with_all_tickers_fetches_unscoped() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        assert_eq!(s.set_market_code(""), TickerRefresh::Fetch(TickerScope::Unscoped));
        assert!(s.tickers().is_none());
    }

    #[test]
    fn empty_market_with_no_tickers_settles_empty() {
        let mut s = store(EmptyMarketPolicy::NoTickers);
        assert_eq!(s.set_market_code(""), TickerRefresh::Settled);
        assert_eq!(s.tickers().map(OptionSet::len), Some(0));
    }

    #[test]
    fn stale_ticker_set_is_not_applied() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.set_market_code("HOSE");
        s.set_market_code("HNX");
        assert!(!s.apply_tickers(&TickerScope::for_market("HOSE"), vec!["VNM".into()]));
        assert!(s.tickers().is_none());
    }

    #[test]
    fn ticker_must_belong_to_chosen_market() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.set_market_code("HOSE");
        assert!(matches!(s.set_ticker("VNM"), Err(FetchError::ValidationFailure(_))));

        s.apply_tickers(&TickerScope::for_market("HOSE"), vec!["VNM".into()]);
        assert!(s.set_ticker("SHS").is_err());
        s.set_ticker("VNM").unwrap();
        assert_eq!(s.selection().ticker, "VNM");
        assert_eq!(s.selection().market_code, "HOSE");
    }

    #[test]
    fn unfiltered_market_leaves_ticker_unconstrained() {
        let mut s = store(EmptyMarketPolicy::NoTickers);
        s.set_ticker("ANY").unwrap();
        assert_eq!(s.selection().ticker, "ANY");
        s.set_ticker("").unwrap();
        assert!(!s.selection().has_ticker());
    }

    #[test]
    fn parameter_validation() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        assert!(s.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(0)).is_err());
        assert!(s.set_parameter(DAYS_TO_PREDICT, ParamValue::Float(3.0)).is_err());
        assert!(s.set_parameter(USE_BETA, ParamValue::Int(1)).is_err());
        s.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(10)).unwrap();
        s.set_parameter(USE_BETA, ParamValue::Bool(false)).unwrap();
        s.set_parameter("window", ParamValue::Text("1y".into())).unwrap();
        assert_eq!(s.selection().days_to_predict(), 10);
        assert!(!s.selection().use_beta());
    }

    #[test]
    fn setting_ticker_keeps_market() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.set_market_code("HOSE");
        s.apply_tickers(&TickerScope::for_market("HOSE"), vec!["FPT".into()]);
        s.set_ticker("FPT").unwrap();
        s.set_ticker("").unwrap();
        assert_eq!(s.selection().market_code, "HOSE");
    }

    #[test]
    fn clearing_options_keeps_parameters() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.apply_market_codes(vec!["HOSE".into()]);
        s.set_market_code("HOSE");
        s.apply_tickers(&TickerScope::for_market("HOSE"), vec!["FPT".into()]);
        s.set_ticker("FPT").unwrap();
        s.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(9)).unwrap();

        s.clear_options();
        assert!(s.market_codes().is_none());
        assert!(s.tickers().is_none());
        assert!(!s.selection().has_ticker());
        assert!(s.selection().market_code.is_empty());
        assert_eq!(s.selection().days_to_predict(), 9);
        assert_eq!(s.defaults().days_to_predict(), 5);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = store(EmptyMarketPolicy::AllTickers);
        s.apply_market_codes(vec!["HOSE".into()]);
        s.set_market_code("HOSE");
        s.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(9)).unwrap();
        s.reset();
        assert_eq!(s.selection(), &Selection::default());
        assert!(s.market_codes().is_none());
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!(EmptyMarketPolicy::parse("all-tickers"), Some(EmptyMarketPolicy::AllTickers));
        assert_eq!(EmptyMarketPolicy::parse("NO_TICKERS"), Some(EmptyMarketPolicy::NoTickers));
        assert_eq!(EmptyMarketPolicy::parse("maybe"), None);
    }
}
