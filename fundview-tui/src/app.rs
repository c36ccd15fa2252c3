//! Application state: single-owner, main-thread only.
//!
//! `AppState` wraps the core [`Session`] with the state only the terminal needs:
//! cursors, form buffers, overlays, the status line and the error history.

use std::collections::VecDeque;
use std::path::Path;

use chrono::NaiveDateTime;

use fundview_core::api::{Backend, ImportTarget, Row, parse_rows};
use fundview_core::fetch::Slot;
use fundview_core::router::{Screen, ScreenGroup, Transition};
use fundview_core::{DisplayMode, FetchError, Session, SessionEvent};

use crate::persistence::Preferences;

const HISTORY_CAP: usize = 50;

/// Status message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// An error record for the error history overlay.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    /// Short category tag, e.g. `NET` or `SRV`.
    pub tag: &'static str,
    pub message: String,
    pub context: String,
}

/// One entry of the notification center.
#[derive(Debug, Clone)]
pub struct Notification {
    pub timestamp: NaiveDateTime,
    pub slot: Slot,
    pub text: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub focus: LoginField,
}

impl LoginForm {
    pub fn active_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKind {
    Market,
    Ticker,
}

/// A pick-one list opened over the active screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    pub kind: PickerKind,
    pub options: Vec<String>,
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// New weight for a portfolio stock.
    Weight(String),
    ImportPath,
}

/// A one-line text prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

/// Which overlay (if any) is shown on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Help,
    ErrorHistory,
    Picker(Picker),
    Prompt(Prompt),
}

/// Label shown for the empty market code.
pub const ALL_MARKETS: &str = "(all markets)";

/// Top-level application state.
pub struct AppState<B: Backend + 'static> {
    pub session: Session<B>,
    pub running: bool,

    // Per-screen
    pub cursor: usize,
    pub login: LoginForm,
    pub import_path: String,
    pub import_target: ImportTarget,

    // Cross-cutting
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub notifications: VecDeque<Notification>,
    pub overlay: Overlay,

    /// Preferences as loaded at startup.
    stored: Preferences,
}

impl<B: Backend + 'static> AppState<B> {
    pub fn new(mut session: Session<B>, prefs: &Preferences) -> Self {
        if prefs.display_mode != session.display_mode() {
            session.toggle_display_mode();
        }
        Self {
            session,
            running: true,
            cursor: 0,
            login: LoginForm {
                username: prefs.last_username.clone(),
                ..LoginForm::default()
            },
            import_path: String::new(),
            import_target: ImportTarget::Fund,
            status_message: None,
            error_history: VecDeque::with_capacity(HISTORY_CAP),
            error_scroll: 0,
            notifications: VecDeque::with_capacity(HISTORY_CAP),
            overlay: Overlay::None,
            stored: prefs.clone(),
        }
    }

    /// Preferences to write back on exit. An analysis parameter is stored only
    /// when it differs from the session default; otherwise the loaded value
    /// is kept as it was.
    pub fn preferences(&self) -> Preferences {
        let sel = self.session.selection();
        let defaults = self.session.store().defaults();
        let days = sel.days_to_predict();
        let use_beta = sel.use_beta();
        Preferences {
            last_username: self
                .session
                .user()
                .map(str::to_string)
                .unwrap_or_else(|| self.login.username.clone()),
            display_mode: self.session.display_mode(),
            days_to_predict: if days != defaults.days_to_predict() {
                Some(days)
            } else {
                self.stored.days_to_predict
            },
            use_beta: if use_beta != defaults.use_beta() {
                Some(use_beta)
            } else {
                self.stored.use_beta
            },
        }
    }

    pub fn screen(&self) -> Screen {
        self.session.screen()
    }

    /// Drain finished requests into the session and the notification list.
    pub fn tick(&mut self) {
        let events = self.session.pump();
        self.absorb(events);
    }

    pub fn absorb(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::Completed { slot, summary } => {
                    self.notify(slot, summary.clone(), true);
                    self.set_status(format!("{slot}: {summary}"));
                }
                SessionEvent::Failed { slot, error } => {
                    self.notify(slot, error.user_message(), false);
                    self.push_error(error.kind().label(), error.user_message(), slot.label().into());
                }
            }
        }
    }

    fn notify(&mut self, slot: Slot, text: String, ok: bool) {
        self.notifications.push_front(Notification {
            timestamp: chrono::Local::now().naive_local(),
            slot,
            text,
            ok,
        });
        self.notifications.truncate(HISTORY_CAP);
    }

    /// Push an error to the history, capping at 50.
    pub fn push_error(&mut self, tag: &'static str, message: String, context: String) {
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            tag,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        self.error_history.truncate(HISTORY_CAP);
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    /// Record a refused action. The session has already set the banner.
    pub fn report<T>(&mut self, result: Result<T, FetchError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.push_error(e.kind().label(), e.user_message(), self.screen().label().into());
                None
            }
        }
    }

    // ── Navigation ──

    pub fn navigate(&mut self, to: Screen) {
        let transition = self.session.navigate(to);
        self.after_transition(transition, to);
    }

    pub fn close(&mut self) {
        let transition = self.session.close();
        if transition == Transition::Exit {
            self.running = false;
            return;
        }
        let to = self.screen();
        self.after_transition(transition, to);
    }

    fn after_transition(&mut self, transition: Transition, to: Screen) {
        match transition {
            Transition::Moved { from, to } if from != to => {
                self.cursor = 0;
                self.import_target = match to {
                    Screen::ResearchDataImport => ImportTarget::Research,
                    _ => ImportTarget::Fund,
                };
            }
            Transition::Moved { .. } => {}
            Transition::Ignored => self.set_warning(format!("{} is not available here", to.label())),
            Transition::Exit => self.running = false,
        }
    }

    /// Jump to entry `n` (1-based) of the current group's menu.
    pub fn jump_to_menu(&mut self, n: usize) {
        let menu: &[Screen] = match self.screen().group() {
            ScreenGroup::Fund => &Screen::FUND_MENU,
            ScreenGroup::Research => &Screen::RESEARCH_MENU,
            ScreenGroup::Entry => return,
        };
        if let Some(&screen) = n.checked_sub(1).and_then(|i| menu.get(i)) {
            self.navigate(screen);
        }
    }

    pub fn submit_login(&mut self) {
        let (user, pass) = (self.login.username.clone(), self.login.password.clone());
        let result = match self.screen() {
            Screen::ResearchLogin => self.session.research_login(&user, &pass),
            _ => self.session.login(&user, &pass),
        };
        if let Some(transition) = self.report(result) {
            self.login.password.clear();
            self.login.focus = LoginField::Username;
            let to = self.screen();
            self.after_transition(transition, to);
        }
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.login.password.clear();
        self.cursor = 0;
        self.overlay = Overlay::None;
        self.set_status("Logged out");
    }

    // ── Cursor ──

    /// Rows the cursor moves over on the active screen.
    pub fn row_count(&self) -> usize {
        let s = &self.session;
        match self.screen() {
            Screen::DepartmentSelect => 2,
            Screen::Dashboard => s.rows_view(Slot::StockData).ready().map_or(0, |r| r.len()),
            Screen::AssetReport => s.rows_view(Slot::AssetReport).ready().map_or(0, |r| r.len()),
            Screen::BetaCalculation => s.portfolio().len(),
            Screen::SvmAnalysis => s.analysis_view().ready().map_or(0, |a| a.predictions.len()),
            Screen::SvmDataAnalysis => s
                .latest_view()
                .ready()
                .and_then(|l| l.map(|l| l.predictions.len()))
                .unwrap_or(0),
            Screen::MarketIndexView => s.market_index_view().ready().map_or(0, |r| r.len()),
            Screen::NotificationCenter => self.notifications.len(),
            _ => 0,
        }
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.row_count() {
            self.cursor += 1;
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    // ── Pickers ──

    pub fn open_market_picker(&mut self) {
        let Some(codes) = self.session.store().market_codes() else {
            if !self.session.is_pending(Slot::MarketCodes) {
                self.session.load_market_codes();
            }
            self.set_warning("Market codes are still loading");
            return;
        };
        let mut options = vec![ALL_MARKETS.to_string()];
        options.extend(codes.iter().map(str::to_string));
        let current = &self.session.selection().market_code;
        let cursor = options.iter().position(|o| o == current).unwrap_or(0);
        self.overlay = Overlay::Picker(Picker {
            kind: PickerKind::Market,
            options,
            cursor,
        });
    }

    pub fn open_ticker_picker(&mut self) {
        let Some(tickers) = self.session.store().tickers() else {
            self.set_warning("Tickers are still loading; choose a market first");
            return;
        };
        if tickers.is_empty() {
            self.set_warning("No tickers for this market");
            return;
        }
        let options: Vec<String> = tickers.iter().map(str::to_string).collect();
        let current = &self.session.selection().ticker;
        let cursor = options.iter().position(|o| o == current).unwrap_or(0);
        self.overlay = Overlay::Picker(Picker {
            kind: PickerKind::Ticker,
            options,
            cursor,
        });
    }

    pub fn commit_picker(&mut self, picker: Picker) {
        let Some(choice) = picker.options.get(picker.cursor) else {
            return;
        };
        match picker.kind {
            PickerKind::Market => {
                let code = if choice == ALL_MARKETS { "" } else { choice.as_str() };
                self.session.set_market_code(code);
                self.cursor = 0;
            }
            PickerKind::Ticker => {
                let result = self.session.set_ticker(choice);
                self.report(result);
            }
        }
    }

    // ── Prompts ──

    pub fn open_weight_prompt(&mut self) {
        let Some(code) = self.session.portfolio().keys().nth(self.cursor).cloned() else {
            self.set_warning("Portfolio is empty");
            return;
        };
        let buffer = self
            .session
            .portfolio()
            .get(&code)
            .map(|w| w.to_string())
            .unwrap_or_default();
        self.overlay = Overlay::Prompt(Prompt {
            kind: PromptKind::Weight(code),
            buffer,
        });
    }

    pub fn open_import_prompt(&mut self) {
        self.overlay = Overlay::Prompt(Prompt {
            kind: PromptKind::ImportPath,
            buffer: self.import_path.clone(),
        });
    }

    pub fn commit_prompt(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Weight(code) => {
                // Unparsable input fails the positivity check.
                let weight = prompt.buffer.trim().parse::<f64>().unwrap_or(f64::NAN);
                let result = self.session.set_weight(&code, weight);
                self.report(result);
            }
            PromptKind::ImportPath => {
                self.import_path = prompt.buffer.trim().to_string();
            }
        }
    }

    // ── Screen actions ──

    pub fn remove_portfolio_entry(&mut self) {
        if let Some(code) = self.session.portfolio().keys().nth(self.cursor).cloned() {
            self.session.remove_from_portfolio(&code);
            self.cursor = self.cursor.min(self.row_count().saturating_sub(1));
        }
    }

    /// Cycle the research import target.
    pub fn cycle_import_target(&mut self) {
        self.import_target = match (self.screen(), self.import_target) {
            (Screen::ResearchDataImport, ImportTarget::Research) => ImportTarget::ResearchMarketIndex,
            (Screen::ResearchDataImport, _) => ImportTarget::Research,
            _ => ImportTarget::Fund,
        };
    }

    /// Read the row file at `import_path` and send it.
    pub fn import_from_path(&mut self) {
        if self.import_path.is_empty() {
            self.set_warning("Set a file path first (press i)");
            return;
        }
        match load_rows(Path::new(&self.import_path)) {
            Ok(rows) => {
                let result = self.session.import_rows(self.import_target, rows);
                if self.report(result).is_some() {
                    self.set_status(format!("Importing {}", self.import_path));
                }
            }
            Err(e) => self.push_error("FILE", format!("{e:#}"), self.import_path.clone()),
        }
    }

    pub fn toggle_display_mode(&mut self) {
        let cached = self.session.toggle_display_mode().is_some();
        let mode = self.session.display_mode();
        if cached || mode == DisplayMode::Table {
            self.set_status(format!("{} view", mode.label()));
        } else {
            self.set_warning(format!("{} view: no analysis for this selection yet", mode.label()));
        }
    }
}

/// Row objects from a JSON file: either an array or `{"data": [...]}`.
pub fn load_rows(path: &Path) -> anyhow::Result<Vec<Row>> {
    use anyhow::Context;

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    parse_rows(&content).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundview_core::api::ScriptedBackend;
    use fundview_core::executor::ManualExecutor;
    use fundview_core::selection::{ParamValue, USE_BETA};
    use fundview_core::{Payload, Settings};

    fn app() -> (AppState<ScriptedBackend>, ManualExecutor<Payload>) {
        let exec = ManualExecutor::new();
        let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec.clone()));
        (AppState::new(session, &Preferences::default()), exec)
    }

    fn settle(app: &mut AppState<ScriptedBackend>, exec: &ManualExecutor<Payload>) {
        exec.complete_all();
        app.tick();
    }

    fn logged_in() -> (AppState<ScriptedBackend>, ManualExecutor<Payload>) {
        let (mut app, exec) = app();
        app.login.username = "analyst".into();
        app.login.password = "pw".into();
        app.submit_login();
        (app, exec)
    }

    #[test]
    fn error_history_caps_at_50() {
        let (mut app, _exec) = app();
        for i in 0..60 {
            app.push_error("NET", format!("error {i}"), String::new());
        }
        assert_eq!(app.error_history.len(), 50);
        assert!(app.error_history[0].message.contains("59"));
        assert_eq!(app.status_message.as_ref().map(|s| s.1), Some(StatusLevel::Error));
    }

    #[test]
    fn login_clears_password_and_moves_on() {
        let (app, _exec) = logged_in();
        assert_eq!(app.screen(), Screen::DepartmentSelect);
        assert!(app.login.password.is_empty());
        assert_eq!(app.preferences().last_username, "analyst");
    }

    #[test]
    fn failed_login_is_recorded_as_validation() {
        let (mut app, _exec) = app();
        app.login.username = "analyst".into();
        app.submit_login();
        assert_eq!(app.screen(), Screen::Login);
        assert_eq!(app.error_history[0].tag, "VAL");
    }

    #[test]
    fn close_from_login_stops_the_app() {
        let (mut app, _exec) = app();
        app.close();
        assert!(!app.running);
    }

    #[test]
    fn menu_jump_follows_group() {
        let (mut app, exec) = logged_in();
        app.jump_to_menu(1);
        assert_eq!(app.screen(), Screen::Dashboard);
        app.jump_to_menu(5);
        assert_eq!(app.screen(), Screen::MarketIndexView);
        app.jump_to_menu(42);
        assert_eq!(app.screen(), Screen::MarketIndexView);
        settle(&mut app, &exec);
        assert_eq!(app.row_count(), 4);
    }

    #[test]
    fn failures_land_in_history_and_notifications() {
        let (mut app, exec) = logged_in();
        app.session
            .backend()
            .fail("/stock-data", FetchError::NetworkFailure("connection refused".into()));
        app.navigate(Screen::Dashboard);
        settle(&mut app, &exec);
        assert_eq!(app.error_history[0].tag, "NET");
        assert_eq!(app.error_history[0].context, "stock data");
        assert!(app.notifications.iter().any(|n| !n.ok));
        assert!(app.notifications.iter().any(|n| n.ok && n.slot == Slot::MarketCodes));
    }

    #[test]
    fn market_picker_offers_all_markets_first() {
        let (mut app, exec) = logged_in();
        app.open_market_picker();
        assert_eq!(app.overlay, Overlay::None, "codes not loaded yet");
        settle(&mut app, &exec);

        app.open_market_picker();
        let Overlay::Picker(mut picker) = app.overlay.clone() else {
            panic!("picker expected");
        };
        assert_eq!(picker.options[0], ALL_MARKETS);
        picker.cursor = picker.options.iter().position(|o| o == "HNX").unwrap();
        app.overlay = Overlay::None;
        app.commit_picker(picker);
        assert_eq!(app.session.selection().market_code, "HNX");
        settle(&mut app, &exec);

        app.open_ticker_picker();
        let Overlay::Picker(picker) = app.overlay.clone() else {
            panic!("picker expected");
        };
        assert_eq!(picker.options, vec!["CEO", "PVS", "SHS"]);
        app.commit_picker(picker);
        assert_eq!(app.session.selection().ticker, "CEO");
    }

    #[test]
    fn weight_prompt_rejects_garbage() {
        let (mut app, _exec) = logged_in();
        app.session.add_to_portfolio("VNM").unwrap();
        app.open_weight_prompt();
        let Overlay::Prompt(mut prompt) = app.overlay.clone() else {
            panic!("prompt expected");
        };
        assert_eq!(prompt.kind, PromptKind::Weight("VNM".into()));

        prompt.buffer = "abc".into();
        app.commit_prompt(prompt.clone());
        assert_eq!(app.error_history[0].message, "Weight must be a positive number");

        prompt.buffer = "2.5".into();
        app.commit_prompt(prompt);
        assert_eq!(app.session.portfolio().get("VNM"), Some(&2.5));
    }

    #[test]
    fn import_reads_rows_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, r#"{"data":[{"Ticker":"VNM"},{"Ticker":"FPT"}]}"#).unwrap();

        let (mut app, exec) = logged_in();
        app.import_path = path.display().to_string();
        app.import_from_path();
        settle(&mut app, &exec);
        assert_eq!(app.session.backend().calls()[0].path, "/import-data");
        assert!(matches!(app.status_message, Some((ref m, StatusLevel::Info)) if m.contains("2 rows")));
    }

    #[test]
    fn load_rows_rejects_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_rows(&path).is_err());
        assert!(load_rows(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn research_import_target_cycles() {
        let (mut app, _exec) = logged_in();
        app.navigate(Screen::ResearchLogin);
        app.login.username = "r".into();
        app.login.password = "pw".into();
        app.submit_login();
        assert_eq!(app.screen(), Screen::ResearchDataImport);
        assert_eq!(app.import_target, ImportTarget::Research);
        app.cycle_import_target();
        assert_eq!(app.import_target, ImportTarget::ResearchMarketIndex);
        app.cycle_import_target();
        assert_eq!(app.import_target, ImportTarget::Research);
    }

    #[test]
    fn stored_display_mode_is_restored() {
        let exec: ManualExecutor<Payload> = ManualExecutor::new();
        let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec));
        let prefs = Preferences {
            display_mode: DisplayMode::Chart,
            ..Preferences::default()
        };
        let app = AppState::new(session, &prefs);
        assert_eq!(app.session.display_mode(), DisplayMode::Chart);
        assert_eq!(app.preferences().display_mode, DisplayMode::Chart);
    }

    #[test]
    fn untouched_parameters_are_not_written_back() {
        let exec: ManualExecutor<Payload> = ManualExecutor::new();
        let settings = Settings {
            default_days_to_predict: 12,
            ..Settings::default()
        };
        let session = Session::new(ScriptedBackend::demo(), &settings, Box::new(exec));
        let mut app = AppState::new(session, &Preferences::default());
        assert_eq!(app.preferences().days_to_predict, None);
        assert_eq!(app.preferences().use_beta, None);

        app.session
            .set_parameter(USE_BETA, ParamValue::Bool(false))
            .unwrap();
        let prefs = app.preferences();
        assert_eq!(prefs.use_beta, Some(false));
        assert_eq!(prefs.days_to_predict, None);
    }
}
