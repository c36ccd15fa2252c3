//! One user session: the state every screen reads and the actions it triggers.
//!
//! `Session` owns the selection store, the analysis cache, the router and the
//! fetch controller. Nothing else mutates them. Requests go to the executor and
//! come back through [`Session::pump`], which the event loop calls every tick;
//! that is the only place fetched data enters the session.
//!
//! The fund and research screens talk to different servers with different
//! market and ticker lists. Entering a screen of the other department drops
//! the loaded option sets, the market/ticker chosen from them and the cached
//! analyses before that screen loads.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::api::{
    ActionReceipt, AnalysisFilter, Backend, BetaRequest, BetaResult, Department, ImportTarget,
    LatestAnalysis, PortfolioBeta, PortfolioBetaRequest, Row, StockDataKind, StockRow,
    SvmAnalysis, SvmRequest,
};
use crate::cache::{AnalysisCache, CacheEntry, CacheKey};
use crate::config::{LeavePolicy, Settings};
use crate::error::FetchError;
use crate::executor::{Completion, Executor, PoolExecutor};
use crate::fetch::{FetchController, FetchState, Resolution, Slot, Ticket};
use crate::router::{Router, Screen, ScreenGroup, Transition};
use crate::selection::{ParamValue, Selection, SelectionStore, TickerRefresh, TickerScope};
use crate::view::DataRegion;

/// A successful fetch result, tagged with what was asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    MarketCodes(Vec<String>),
    Tickers {
        scope: TickerScope,
        tickers: Vec<String>,
    },
    StockRows {
        kind: StockDataKind,
        rows: Vec<StockRow>,
    },
    Betas(Vec<BetaResult>),
    PortfolioBeta(PortfolioBeta),
    Analysis {
        key: CacheKey,
        request: SvmRequest,
        analysis: SvmAnalysis,
    },
    Latest(Option<LatestAnalysis>),
    MarketIndex(Vec<Row>),
    Receipt(ActionReceipt),
}

impl Payload {
    fn summary(&self) -> String {
        match self {
            Payload::MarketCodes(codes) => format!("{} market codes", codes.len()),
            Payload::Tickers { scope, tickers } => match scope.market() {
                Some(m) => format!("{} tickers on {m}", tickers.len()),
                None => format!("{} tickers", tickers.len()),
            },
            Payload::StockRows { rows, .. } => format!("{} rows", rows.len()),
            Payload::Betas(results) => format!("{} beta results", results.len()),
            Payload::PortfolioBeta(p) => format!("portfolio beta {:.3}", p.portfolio_beta),
            Payload::Analysis { analysis, .. } => format!(
                "{} predictions, accuracy {:.1}%",
                analysis.predictions.len(),
                analysis.model_metrics.accuracy * 100.0
            ),
            Payload::Latest(Some(l)) => format!("latest analysis from {}", l.date.as_deref().unwrap_or("?")),
            Payload::Latest(None) => "no stored analysis".to_string(),
            Payload::MarketIndex(rows) => format!("{} index rows", rows.len()),
            Payload::Receipt(r) => r.message.clone().unwrap_or_else(|| "done".to_string()),
        }
    }
}

/// Something `pump` applied. Superseded results produce no event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Completed { slot: Slot, summary: String },
    Failed { slot: Slot, error: FetchError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DisplayMode {
    #[default]
    Table,
    Chart,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Table => DisplayMode::Chart,
            DisplayMode::Chart => DisplayMode::Table,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Table => "Table",
            DisplayMode::Chart => "Chart",
        }
    }
}

/// Slots that feed the shared selection store. They outlive the screen that
/// issued them, so leaving a screen never cancels them.
fn survives_navigation(slot: Slot) -> bool {
    matches!(slot, Slot::MarketCodes | Slot::TickerList)
}

/// Slots whose data belongs to one department's server.
const DEPARTMENT_SLOTS: [Slot; 4] = [
    Slot::MarketCodes,
    Slot::TickerList,
    Slot::SvmAnalysis,
    Slot::LatestAnalysis,
];

fn department_of(screen: Screen) -> Option<Department> {
    match screen.group() {
        ScreenGroup::Entry => None,
        ScreenGroup::Fund => Some(Department::Fund),
        ScreenGroup::Research => Some(Department::Research),
    }
}

/// Screens that show the latest stored analysis for the selection.
fn shows_latest(screen: Screen) -> bool {
    matches!(screen, Screen::SvmAnalysis | Screen::SvmDataAnalysis)
}

#[derive(Debug, Clone)]
struct Banner {
    screen: Screen,
    message: String,
}

pub struct Session<B: Backend + 'static> {
    backend: Arc<B>,
    executor: Box<dyn Executor<Payload>>,
    fetches: FetchController<Payload>,
    store: SelectionStore,
    cache: AnalysisCache<SvmAnalysis>,
    router: Router,
    leave_policy: LeavePolicy,
    /// Server the loaded selection data came from.
    department: Department,
    owners: [Option<Screen>; Slot::COUNT],
    /// Key of the most recent analysis request.
    analysis_key: Option<CacheKey>,
    display_mode: DisplayMode,
    portfolio: BTreeMap<String, f64>,
    user: Option<String>,
    banner: Option<Banner>,
}

impl<B: Backend + 'static> Session<B> {
    pub fn new(backend: B, settings: &Settings, executor: Box<dyn Executor<Payload>>) -> Self {
        Self {
            backend: Arc::new(backend),
            executor,
            fetches: FetchController::new(),
            store: SelectionStore::new(settings.empty_market_policy, settings.default_selection()),
            cache: AnalysisCache::new(),
            router: Router::new(settings.router_config()),
            leave_policy: settings.leave_policy,
            department: Department::Fund,
            owners: [None; Slot::COUNT],
            analysis_key: None,
            display_mode: DisplayMode::default(),
            portfolio: BTreeMap::new(),
            user: None,
            banner: None,
        }
    }

    /// Session running requests on a private thread pool.
    pub fn with_pool(backend: B, settings: &Settings) -> Self {
        let executor = PoolExecutor::new(settings.worker_threads);
        Self::new(backend, settings, Box::new(executor))
    }

    // ── Accessors ──

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn selection(&self) -> &Selection {
        self.store.selection()
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn cache(&self) -> &AnalysisCache<SvmAnalysis> {
        &self.cache
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn screen(&self) -> Screen {
        self.router.current()
    }

    pub fn department(&self) -> Department {
        self.department
    }

    pub fn state(&self, slot: Slot) -> &FetchState<Payload> {
        self.fetches.state(slot)
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.fetches.is_pending(slot)
    }

    pub fn any_pending(&self) -> bool {
        self.fetches.any_pending()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn portfolio(&self) -> &BTreeMap<String, f64> {
        &self.portfolio
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The error message for the active screen, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner
            .as_ref()
            .filter(|b| b.screen == self.router.current())
            .map(|b| b.message.as_str())
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    // ── Request plumbing ──

    fn issue<F>(&mut self, slot: Slot, job: F) -> Ticket
    where
        F: FnOnce(&B) -> Result<Payload, FetchError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let screen = self.router.current();
        self.owners[slot.index()] = Some(screen);
        if self.banner.as_ref().is_some_and(|b| b.screen == screen) {
            self.banner = None;
        }
        self.fetches
            .issue(slot, self.executor.as_ref(), Box::new(move || job(backend.as_ref())))
    }

    /// Surface a validation failure on the active screen. No request is made.
    fn refuse<T>(&mut self, error: FetchError) -> Result<T, FetchError> {
        warn!(screen = self.router.current().label(), %error, "action refused");
        self.banner = Some(Banner {
            screen: self.router.current(),
            message: error.user_message(),
        });
        Err(error)
    }

    /// Apply every finished request without blocking.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(done) = self.executor.try_next() {
            events.extend(self.apply(done));
        }
        events
    }

    /// Block until nothing is pending or `timeout` runs out.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.pump();
        while self.fetches.any_pending() {
            let now = Instant::now();
            if now >= deadline {
                warn!(pending = ?self.fetches.pending_slots(), "gave up waiting for requests");
                break;
            }
            match self.executor.next_timeout(deadline - now) {
                Some(done) => events.extend(self.apply(done)),
                None => break,
            }
        }
        events
    }

    fn apply(&mut self, done: Completion<Payload>) -> Option<SessionEvent> {
        let slot = done.ticket.slot;
        if self.fetches.resolve(done.ticket, done.outcome) == Resolution::Superseded {
            return None;
        }
        match self.fetches.state(slot) {
            FetchState::Success { value, .. } => {
                let mut latest = None;
                match value {
                    Payload::MarketCodes(codes) => self.store.apply_market_codes(codes.clone()),
                    Payload::Tickers { scope, tickers } => {
                        self.store.apply_tickers(scope, tickers.clone());
                    }
                    Payload::Analysis {
                        key,
                        request,
                        analysis,
                    } => {
                        self.cache.put(key.clone(), analysis.clone());
                        let date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                        latest = Some(LatestAnalysis::from_run(request, analysis, date));
                    }
                    _ => {}
                }
                let summary = value.summary();
                if let Some(latest) = latest {
                    self.fetches.fill(Slot::LatestAnalysis, Payload::Latest(Some(latest)));
                }
                info!(%slot, %summary, "request completed");
                Some(SessionEvent::Completed { slot, summary })
            }
            FetchState::Failure { error, .. } => {
                let error = error.clone();
                warn!(%slot, %error, "request failed");
                if let Some(screen) = self.owners[slot.index()] {
                    self.banner = Some(Banner {
                        screen,
                        message: error.user_message(),
                    });
                }
                Some(SessionEvent::Failed { slot, error })
            }
            FetchState::Idle | FetchState::Pending(_) => None,
        }
    }

    // ── Navigation ──

    pub fn navigate(&mut self, to: Screen) -> Transition {
        let transition = self.router.navigate(to);
        self.after_transition(transition);
        transition
    }

    pub fn close(&mut self) -> Transition {
        let transition = self.router.close();
        self.after_transition(transition);
        transition
    }

    fn after_transition(&mut self, transition: Transition) {
        let Transition::Moved { from, to } = transition else {
            return;
        };
        if from != to && self.leave_policy == LeavePolicy::CancelOnLeave {
            for slot in Slot::ALL {
                if self.owners[slot.index()] == Some(from) && !survives_navigation(slot) {
                    self.fetches.cancel(slot);
                }
            }
        }
        if let Some(dept) = department_of(to) {
            self.use_department(dept);
        }
        self.load_for(to);
    }

    /// Point selection and analysis requests at `dept`'s server. Entering a
    /// screen of that department does the same.
    pub fn use_department(&mut self, dept: Department) {
        if dept != self.department {
            self.switch_department(dept);
        }
    }

    fn switch_department(&mut self, dept: Department) {
        info!(from = self.department.label(), to = dept.label(), "switching department");
        for slot in DEPARTMENT_SLOTS {
            self.fetches.reset(slot);
        }
        self.store.clear_options();
        self.cache.clear();
        self.analysis_key = None;
        self.department = dept;
    }

    /// Initial loads a screen needs when it becomes active.
    fn load_for(&mut self, screen: Screen) {
        match screen {
            Screen::Dashboard => {
                self.ensure_market_codes();
                self.load_stock_data(StockDataKind::Plain);
            }
            Screen::AssetReport => {
                self.ensure_market_codes();
                let market = Some(self.selection().market_code.clone()).filter(|m| !m.is_empty());
                self.load_stock_data(StockDataKind::Asset {
                    market_code: market,
                });
            }
            Screen::BetaCalculation => {
                self.ensure_market_codes();
                self.load_stock_data(StockDataKind::WithBeta);
            }
            Screen::SvmAnalysis | Screen::SvmDataAnalysis => {
                self.ensure_market_codes();
                self.latest_analysis();
            }
            Screen::MarketIndexView => {
                self.load_market_index();
            }
            _ => {}
        }
    }

    fn ensure_market_codes(&mut self) {
        if self.store.market_codes().is_none() && !self.fetches.is_pending(Slot::MarketCodes) {
            self.load_market_codes();
        }
    }

    // ── Auth stub ──

    pub fn login(&mut self, username: &str, password: &str) -> Result<Transition, FetchError> {
        if username.trim().is_empty() || password.is_empty() {
            return self.refuse(FetchError::validation("Please enter username and password"));
        }
        let transition = self.navigate(Screen::DepartmentSelect);
        if matches!(transition, Transition::Moved { .. }) {
            info!(user = username.trim(), "logged in");
            self.user = Some(username.trim().to_string());
        }
        Ok(transition)
    }

    pub fn research_login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<Transition, FetchError> {
        if username.trim().is_empty() || password.is_empty() {
            return self.refuse(FetchError::validation("Please enter username and password"));
        }
        Ok(self.navigate(Screen::ResearchDataImport))
    }

    /// Drop everything session-scoped and return to login.
    pub fn logout(&mut self) {
        info!(user = ?self.user, "logged out");
        for slot in Slot::ALL {
            self.fetches.reset(slot);
        }
        self.store.reset();
        self.cache.clear();
        self.portfolio.clear();
        self.owners = [None; Slot::COUNT];
        self.analysis_key = None;
        self.department = Department::Fund;
        self.user = None;
        self.banner = None;
        self.router.reset();
    }

    // ── Selection ──

    pub fn load_market_codes(&mut self) -> Ticket {
        let dept = self.department;
        self.issue(Slot::MarketCodes, move |b| b.market_codes(dept).map(Payload::MarketCodes))
    }

    /// Commit a market code. The ticker is cleared at once; the ticker list for
    /// the new market is fetched unless the empty-market policy settles it.
    pub fn set_market_code(&mut self, code: &str) -> Option<Ticket> {
        let dept = self.department;
        let ticket = match self.store.set_market_code(code) {
            TickerRefresh::Fetch(scope) => Some(self.issue(Slot::TickerList, move |b| {
                let tickers = b.tickers(dept, scope.market())?;
                Ok(Payload::Tickers { scope, tickers })
            })),
            TickerRefresh::Settled => {
                self.fetches.reset(Slot::TickerList);
                None
            }
        };
        if self.router.current() == Screen::AssetReport {
            let market = Some(self.selection().market_code.clone()).filter(|m| !m.is_empty());
            self.load_stock_data(StockDataKind::Asset {
                market_code: market,
            });
        }
        self.refresh_latest();
        ticket
    }

    pub fn set_ticker(&mut self, ticker: &str) -> Result<(), FetchError> {
        match self.store.set_ticker(ticker) {
            Ok(()) => {
                self.refresh_latest();
                Ok(())
            }
            Err(e) => self.refuse(e),
        }
    }

    /// Reload the latest analysis after a selection change on a screen that
    /// shows it. An empty selection keeps what is shown.
    fn refresh_latest(&mut self) {
        let sel = self.selection();
        if shows_latest(self.router.current()) && (!sel.market_code.is_empty() || sel.has_ticker()) {
            self.latest_analysis();
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), FetchError> {
        match self.store.set_parameter(name, value) {
            Ok(()) => Ok(()),
            Err(e) => self.refuse(e),
        }
    }

    // ── Analysis ──

    /// Run the SVM analysis for the current selection. Requires a ticker.
    pub fn analyze(&mut self) -> Result<Ticket, FetchError> {
        let selection = self.selection().clone();
        if !selection.has_ticker() {
            return self.refuse(FetchError::validation("Please select a ticker"));
        }
        let key = CacheKey::for_selection(&selection);
        let req = SvmRequest {
            days_to_predict: selection.days_to_predict(),
            use_beta: selection.use_beta(),
            market_code: selection.market_code.clone(),
            ticker: selection.ticker.clone(),
        };
        info!(key = %key.digest(), ticker = %req.ticker, "analysis requested");
        self.analysis_key = Some(key.clone());
        let dept = self.department;
        Ok(self.issue(Slot::SvmAnalysis, move |b| {
            let analysis = b.svm_analysis(dept, &req)?;
            Ok(Payload::Analysis {
                key,
                request: req,
                analysis,
            })
        }))
    }

    /// The last analysis stored server-side, filtered by the current selection.
    /// A finished run replaces it locally without another request.
    pub fn latest_analysis(&mut self) -> Ticket {
        let sel = self.selection();
        let filter = AnalysisFilter {
            market_code: Some(sel.market_code.clone()).filter(|m| !m.is_empty()),
            ticker: Some(sel.ticker.clone()).filter(|t| !t.is_empty()),
        };
        let dept = self.department;
        self.issue(Slot::LatestAnalysis, move |b| {
            b.latest_analysis(dept, &filter).map(Payload::Latest)
        })
    }

    /// Switch between table and chart. Redraws from the cache entry of the
    /// current selection only; never issues a request.
    pub fn toggle_display_mode(&mut self) -> Option<&CacheEntry<SvmAnalysis>> {
        self.display_mode = self.display_mode.toggled();
        self.cache.get(&CacheKey::for_selection(self.store.selection()))
    }

    /// What the analysis area shows for the current selection. An entry cached
    /// under another key is never shown.
    pub fn analysis_view(&self) -> DataRegion<&SvmAnalysis> {
        let key = CacheKey::for_selection(self.store.selection());
        let state = self.fetches.state(Slot::SvmAnalysis);
        if state.is_pending() {
            return DataRegion::Loading;
        }
        if let Some(error) = state.error() {
            if self.analysis_key.as_ref() == Some(&key) {
                return DataRegion::Error(error.user_message());
            }
        }
        match self.cache.get(&key) {
            Some(entry) => DataRegion::Ready(&entry.value),
            None => DataRegion::Idle,
        }
    }

    pub fn latest_view(&self) -> DataRegion<Option<&LatestAnalysis>> {
        DataRegion::from_state(self.fetches.state(Slot::LatestAnalysis), |p| match p {
            Payload::Latest(l) => Some(l.as_ref()),
            _ => None,
        })
    }

    // ── Beta ──

    /// Beta for every stock (empty request body).
    pub fn calculate_all_betas(&mut self) -> Ticket {
        self.issue(Slot::BetaCalculation, |b| {
            b.calculate_beta(&BetaRequest::default()).map(Payload::Betas)
        })
    }

    /// Beta for the selected ticker.
    pub fn calculate_beta(&mut self) -> Result<Ticket, FetchError> {
        let sel = self.selection().clone();
        if !sel.has_ticker() {
            return self.refuse(FetchError::validation("Please select a ticker"));
        }
        let req = BetaRequest {
            stock_code: None,
            market_code: Some(sel.market_code.clone()).filter(|m| !m.is_empty()),
            ticker: Some(sel.ticker.clone()),
            days_to_predict: Some(sel.days_to_predict()),
        };
        Ok(self.issue(Slot::BetaCalculation, move |b| {
            b.calculate_beta(&req).map(Payload::Betas)
        }))
    }

    pub fn beta_view(&self) -> DataRegion<&[BetaResult]> {
        DataRegion::from_state(self.fetches.state(Slot::BetaCalculation), |p| match p {
            Payload::Betas(r) => Some(r.as_slice()),
            _ => None,
        })
    }

    /// Add a stock with weight 1. Adding an existing stock keeps its weight.
    pub fn add_to_portfolio(&mut self, stock_code: &str) -> Result<(), FetchError> {
        let code = stock_code.trim();
        if code.is_empty() {
            return self.refuse(FetchError::validation("Please select a stock to add"));
        }
        self.portfolio.entry(code.to_string()).or_insert(1.0);
        Ok(())
    }

    pub fn set_weight(&mut self, stock_code: &str, weight: f64) -> Result<(), FetchError> {
        if !weight.is_finite() || weight <= 0.0 {
            return self.refuse(FetchError::validation("Weight must be a positive number"));
        }
        match self.portfolio.get_mut(stock_code) {
            Some(w) => {
                *w = weight;
                Ok(())
            }
            None => self.refuse(FetchError::validation(format!(
                "{stock_code} is not in the portfolio"
            ))),
        }
    }

    pub fn remove_from_portfolio(&mut self, stock_code: &str) -> bool {
        self.portfolio.remove(stock_code).is_some()
    }

    pub fn calculate_portfolio_beta(&mut self) -> Result<Ticket, FetchError> {
        if self.portfolio.is_empty() {
            return self.refuse(FetchError::validation(
                "Please add at least one stock to the portfolio",
            ));
        }
        let req = PortfolioBetaRequest {
            portfolio: self.portfolio.clone(),
            days_to_predict: Some(self.selection().days_to_predict()),
        };
        Ok(self.issue(Slot::PortfolioBeta, move |b| {
            b.portfolio_beta(&req).map(Payload::PortfolioBeta)
        }))
    }

    pub fn portfolio_view(&self) -> DataRegion<&PortfolioBeta> {
        DataRegion::from_state(self.fetches.state(Slot::PortfolioBeta), |p| match p {
            Payload::PortfolioBeta(r) => Some(r),
            _ => None,
        })
    }

    // ── Reports ──

    pub fn load_stock_data(&mut self, kind: StockDataKind) -> Ticket {
        let slot = match kind {
            StockDataKind::Asset { .. } => Slot::AssetReport,
            StockDataKind::Plain | StockDataKind::WithBeta => Slot::StockData,
        };
        self.issue(slot, move |b| {
            let rows = b.stock_data(&kind)?;
            Ok(Payload::StockRows { kind, rows })
        })
    }

    /// Rows of the stock-data slot (`Plain`/`WithBeta`) or the asset report slot.
    pub fn rows_view(&self, slot: Slot) -> DataRegion<&[StockRow]> {
        DataRegion::from_state(self.fetches.state(slot), |p| match p {
            Payload::StockRows { rows, .. } => Some(rows.as_slice()),
            _ => None,
        })
    }

    pub fn load_market_index(&mut self) -> Ticket {
        self.issue(Slot::MarketIndex, |b| b.market_index().map(Payload::MarketIndex))
    }

    pub fn market_index_view(&self) -> DataRegion<&[Row]> {
        DataRegion::from_state(self.fetches.state(Slot::MarketIndex), |p| match p {
            Payload::MarketIndex(rows) => Some(rows.as_slice()),
            _ => None,
        })
    }

    // ── Import and server-side jobs ──

    pub fn import_rows(&mut self, target: ImportTarget, rows: Vec<Row>) -> Result<Ticket, FetchError> {
        if rows.is_empty() {
            return self.refuse(FetchError::validation("No rows to import"));
        }
        info!(target = target.label(), rows = rows.len(), "import requested");
        Ok(self.issue(Slot::DataImport, move |b| {
            b.import_rows(target, &rows).map(Payload::Receipt)
        }))
    }

    /// Recompute betas and retrain the model server-side.
    pub fn recalculate(&mut self) -> Ticket {
        self.issue(Slot::Recalculate, |b| b.recalculate().map(Payload::Receipt))
    }

    /// Run the research department's analysis job.
    pub fn research_analyze(&mut self) -> Ticket {
        self.issue(Slot::ResearchAnalysis, |b| {
            b.research_analyze().map(Payload::Receipt)
        })
    }

    pub fn receipt_view(&self, slot: Slot) -> DataRegion<&ActionReceipt> {
        DataRegion::from_state(self.fetches.state(slot), |p| match p {
            Payload::Receipt(r) => Some(r),
            _ => None,
        })
    }
}
