//! Property tests for the session core.
//!
//! Uses proptest to verify:
//! 1. Supersession: the ticker list always matches the last market code chosen,
//!    whatever order the ticker fetches finish in
//! 2. Ticker clearing: choosing a market code clears the ticker at once
//! 3. Cache overwrite: put then get returns the last value put, no merge
//! 4. Key determinism: parameter order never changes the cache key
//! 5. Navigation: navigate then close returns to where you were

use proptest::prelude::*;
use std::collections::BTreeMap;

use fundview_core::api::{Backend, Department, ScriptedBackend};
use fundview_core::cache::{AnalysisCache, CacheKey};
use fundview_core::executor::ManualExecutor;
use fundview_core::fetch::{FetchController, Resolution, Slot};
use fundview_core::router::{Router, RouterConfig, Screen, Transition};
use fundview_core::selection::{
    EmptyMarketPolicy, OptionSet, ParamValue, Selection, SelectionStore, TickerScope,
};
use fundview_core::{Payload, Session, Settings};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_market() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("HOSE".to_string()),
        Just("HNX".to_string()),
        Just("UPCOM".to_string()),
        Just("NYSE".to_string()),
        Just(String::new()),
    ]
}

/// Market codes in call order, plus an arbitrary completion order.
fn arb_market_run() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
    prop::collection::vec(arb_market(), 1..8).prop_flat_map(|codes| {
        let order: Vec<usize> = (0..codes.len()).collect();
        (Just(codes), Just(order).prop_shuffle())
    })
}

fn arb_policy() -> impl Strategy<Value = EmptyMarketPolicy> {
    prop_oneof![
        Just(EmptyMarketPolicy::AllTickers),
        Just(EmptyMarketPolicy::NoTickers),
    ]
}

fn arb_param_value() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        any::<bool>().prop_map(ParamValue::Bool),
        (-1000i64..1000).prop_map(ParamValue::Int),
        "[a-z0-9]{0,6}".prop_map(ParamValue::Text),
    ]
}

fn arb_screen() -> impl Strategy<Value = Screen> {
    (0..Screen::ALL.len()).prop_map(|i| Screen::ALL[i])
}

fn expected_tickers(code: &str, policy: EmptyMarketPolicy) -> OptionSet {
    if code.is_empty() && policy == EmptyMarketPolicy::NoTickers {
        return OptionSet::default();
    }
    let scope = TickerScope::for_market(code);
    ScriptedBackend::demo()
        .tickers(Department::Fund, scope.market())
        .unwrap()
        .into_iter()
        .collect()
}

fn manual_session(policy: EmptyMarketPolicy) -> (Session<ScriptedBackend>, ManualExecutor<Payload>) {
    let settings = Settings {
        empty_market_policy: policy,
        ..Settings::default()
    };
    let exec = ManualExecutor::new();
    let session = Session::new(ScriptedBackend::demo(), &settings, Box::new(exec.clone()));
    (session, exec)
}

// ── 1. Supersession ──────────────────────────────────────────────────

proptest! {
    /// After every fetch settles, the ticker set belongs to the last market code.
    #[test]
    fn ticker_set_follows_last_market_code(
        (codes, order) in arb_market_run(),
        policy in arb_policy(),
    ) {
        let (mut session, exec) = manual_session(policy);
        let mut tickets = Vec::new();
        for code in &codes {
            tickets.push(session.set_market_code(code));
        }

        let held = exec.held();
        for i in order {
            if let Some(Some(ticket)) = tickets.get(i) {
                prop_assert!(held.contains(ticket));
                exec.complete(*ticket);
                session.pump();
            }
        }

        let last = codes.last().unwrap();
        prop_assert_eq!(session.selection().market_code.as_str(), last.as_str());
        prop_assert_eq!(session.store().tickers(), Some(&expected_tickers(last, policy)));
        prop_assert!(!session.is_pending(Slot::TickerList));
    }

    /// Only the newest request of a slot is ever applied.
    #[test]
    fn only_newest_request_applies(n in 1usize..10, order in Just((0..10).collect::<Vec<usize>>()).prop_shuffle()) {
        let mut ctl = FetchController::new();
        let tickets: Vec<_> = (0..n).map(|_| ctl.begin(Slot::SvmAnalysis)).collect();

        let mut applied = Vec::new();
        for i in order.into_iter().filter(|&i| i < n) {
            if ctl.resolve(tickets[i], Ok(i)) == Resolution::Applied {
                applied.push(i);
            }
        }
        prop_assert_eq!(applied, vec![n - 1]);
        prop_assert_eq!(ctl.state(Slot::SvmAnalysis).value(), Some(&(n - 1)));
    }
}

// ── 2. Ticker Clearing ───────────────────────────────────────────────

proptest! {
    /// The ticker is empty synchronously after any market code change.
    #[test]
    fn market_change_clears_ticker_immediately(codes in prop::collection::vec(arb_market(), 1..6)) {
        let (mut session, exec) = manual_session(EmptyMarketPolicy::AllTickers);
        session.set_market_code("HOSE");
        exec.complete_all();
        session.pump();
        session.set_ticker("FPT").unwrap();

        for code in &codes {
            session.set_market_code(code);
            prop_assert_eq!(session.selection().ticker.as_str(), "");
            if let Ok(tickers) = ScriptedBackend::demo().tickers(Department::Fund, TickerScope::for_market(code).market()) {
                if let Some(first) = tickers.first() {
                    exec.complete_all();
                    session.pump();
                    session.set_ticker(first).unwrap();
                }
            }
        }
    }
}

// ── 3. Cache Overwrite ───────────────────────────────────────────────

proptest! {
    /// `put` replaces the entry wholesale.
    #[test]
    fn cache_put_overwrites(
        market in "[A-Z]{0,5}",
        ticker in "[A-Z|;=]{0,5}",
        v1 in prop::collection::vec(any::<u32>(), 0..5),
        v2 in prop::collection::vec(any::<u32>(), 0..5),
    ) {
        let mut cache = AnalysisCache::new();
        let key = CacheKey::derive(&market, &ticker, &BTreeMap::new());

        cache.put(key.clone(), v1.clone());
        prop_assert_eq!(cache.get(&key).map(|e| &e.value), Some(&v1));

        cache.put(key.clone(), v2.clone());
        prop_assert_eq!(cache.get(&key).map(|e| &e.value), Some(&v2));
        prop_assert_eq!(cache.len(), 1);
    }
}

// ── 4. Key Determinism ───────────────────────────────────────────────

proptest! {
    /// The order parameters are set in never changes the key.
    #[test]
    fn key_ignores_parameter_order(
        params in prop::collection::btree_map("[a-z]{1,8}", arb_param_value(), 0..6),
        order in Just((0..6).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let entries: Vec<(String, ParamValue)> = params.into_iter().collect();

        let mut forward = SelectionStore::new(EmptyMarketPolicy::AllTickers, Selection::default());
        for (name, value) in &entries {
            forward.set_parameter(name, value.clone()).unwrap();
        }

        let mut shuffled = SelectionStore::new(EmptyMarketPolicy::AllTickers, Selection::default());
        for i in order.into_iter().filter(|&i| i < entries.len()) {
            let (name, value) = &entries[i];
            shuffled.set_parameter(name, value.clone()).unwrap();
        }

        prop_assert_eq!(
            CacheKey::for_selection(forward.selection()),
            CacheKey::for_selection(shuffled.selection())
        );
    }
}

// ── 5. Navigation ────────────────────────────────────────────────────

proptest! {
    /// `navigate(S); close()` lands back on the screen active before, and a
    /// refused navigation changes nothing.
    #[test]
    fn navigate_then_close_returns(
        walk in prop::collection::vec(arb_screen(), 0..12),
        target in arb_screen(),
        enabled in prop::collection::btree_set(arb_screen(), 0..13),
    ) {
        let mut router = Router::new(RouterConfig::with_screens(enabled));
        for s in walk {
            router.navigate(s);
        }

        let before = router.current();
        let before_prev = router.previous();
        match router.navigate(target) {
            Transition::Moved { from, to } => {
                prop_assert_eq!(from, before);
                prop_assert_eq!(to, target);
                let back = router.close();
                prop_assert_eq!(back, Transition::Moved { from: target, to: before });
                prop_assert_eq!(router.current(), before);
            }
            Transition::Ignored => {
                prop_assert_eq!(router.current(), before);
                prop_assert_eq!(router.previous(), before_prev);
            }
            Transition::Exit => prop_assert!(false, "navigate never exits"),
        }
    }
}
