//! Keyboard input dispatch: overlays → global keys → screen-specific handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use fundview_core::api::{Backend, StockDataKind};
use fundview_core::fetch::Slot;
use fundview_core::router::Screen;
use fundview_core::selection::{ParamValue, DAYS_TO_PREDICT, USE_BETA};

use crate::app::{AppState, Overlay};

pub fn handle_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.running = false;
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::None => {}
        Overlay::Help => {
            app.overlay = Overlay::None;
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::Picker(_) => {
            handle_picker(app, key);
            return;
        }
        Overlay::Prompt(_) => {
            handle_prompt(app, key);
            return;
        }
    }

    // 2. Login forms take free text, so they bypass the global keys.
    if matches!(app.screen(), Screen::Login | Screen::ResearchLogin) {
        handle_login_key(app, key);
        return;
    }

    // 3. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Esc => {
            app.close();
            return;
        }
        KeyCode::Char('?') => {
            app.overlay = Overlay::Help;
            return;
        }
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        KeyCode::Char('x') => {
            app.session.dismiss_banner();
            return;
        }
        KeyCode::Char('L') => {
            app.logout();
            return;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.cursor_down();
            return;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.cursor_up();
            return;
        }
        KeyCode::Char(c @ '1'..='9') => {
            app.jump_to_menu(c as usize - '0' as usize);
            return;
        }
        _ => {}
    }

    // 4. Screen-specific keys.
    match app.screen() {
        Screen::Login | Screen::ResearchLogin => {}
        Screen::DepartmentSelect => handle_department_key(app, key),
        Screen::Dashboard | Screen::AssetReport | Screen::MarketIndexView => {
            handle_report_key(app, key)
        }
        Screen::BetaCalculation => handle_beta_key(app, key),
        Screen::SvmAnalysis | Screen::SvmDataAnalysis => handle_analysis_key(app, key),
        Screen::DataImport | Screen::ResearchDataImport => handle_import_key(app, key),
        Screen::TrainingModel => handle_training_key(app, key),
        Screen::NotificationCenter => {
            if key.code == KeyCode::Char('c') {
                app.notifications.clear();
                app.cursor = 0;
            }
        }
    }
}

fn handle_error_overlay<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('e') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_picker<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    let Overlay::Picker(picker) = &mut app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Char('j') | KeyCode::Down => {
            if picker.cursor + 1 < picker.options.len() {
                picker.cursor += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            picker.cursor = picker.cursor.saturating_sub(1);
        }
        KeyCode::Enter => {
            if let Overlay::Picker(picker) = std::mem::replace(&mut app.overlay, Overlay::None) {
                app.commit_picker(picker);
            }
        }
        _ => {}
    }
}

fn handle_prompt<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    let Overlay::Prompt(prompt) = &mut app.overlay else {
        return;
    };
    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Backspace => {
            prompt.buffer.pop();
        }
        KeyCode::Char(c) => prompt.buffer.push(c),
        KeyCode::Enter => {
            if let Overlay::Prompt(prompt) = std::mem::replace(&mut app.overlay, Overlay::None) {
                app.commit_prompt(prompt);
            }
        }
        _ => {}
    }
}

fn handle_login_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.login.toggle_focus(),
        KeyCode::Enter => app.submit_login(),
        KeyCode::Backspace => {
            app.login.active_mut().pop();
        }
        KeyCode::Char(c) => app.login.active_mut().push(c),
        _ => {}
    }
}

fn handle_department_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    if matches!(key.code, KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right) {
        let to = if app.cursor == 0 {
            Screen::Dashboard
        } else {
            Screen::ResearchLogin
        };
        app.navigate(to);
    }
}

/// Market and ticker pickers, shared by every screen that filters by them.
fn handle_selection_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('m') => app.open_market_picker(),
        KeyCode::Char('t') => app.open_ticker_picker(),
        _ => return false,
    }
    true
}

fn handle_report_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    if app.screen() != Screen::MarketIndexView && handle_selection_key(app, key) {
        return;
    }
    if key.code == KeyCode::Char('r') {
        match app.screen() {
            Screen::Dashboard => {
                app.session.load_stock_data(StockDataKind::Plain);
            }
            Screen::AssetReport => {
                let market = Some(app.session.selection().market_code.clone()).filter(|m| !m.is_empty());
                app.session.load_stock_data(StockDataKind::Asset {
                    market_code: market,
                });
            }
            _ => {
                app.session.load_market_index();
            }
        }
    }
}

fn handle_beta_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    if handle_selection_key(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('b') | KeyCode::Enter => {
            let result = app.session.calculate_beta();
            app.report(result);
        }
        KeyCode::Char('B') => {
            app.session.calculate_all_betas();
        }
        KeyCode::Char('a') => {
            let ticker = app.session.selection().ticker.clone();
            let result = app.session.add_to_portfolio(&ticker);
            if app.report(result).is_some() {
                app.set_status(format!("Added {ticker} to the portfolio"));
            }
        }
        KeyCode::Char('w') => app.open_weight_prompt(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_portfolio_entry(),
        KeyCode::Char('p') => {
            let result = app.session.calculate_portfolio_beta();
            app.report(result);
        }
        KeyCode::Char('r') => {
            app.session.load_stock_data(StockDataKind::WithBeta);
        }
        _ => {}
    }
}

fn handle_analysis_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    if handle_selection_key(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('a') | KeyCode::Enter => {
            let result = app.session.analyze();
            if app.report(result).is_some() {
                app.cursor = 0;
            }
        }
        KeyCode::Char('v') => app.toggle_display_mode(),
        KeyCode::Char('r') => {
            app.session.latest_analysis();
        }
        KeyCode::Char('+') | KeyCode::Char('=') => adjust_days(app, 1),
        KeyCode::Char('-') => adjust_days(app, -1),
        KeyCode::Char('u') => {
            let value = !app.session.selection().use_beta();
            let result = app.session.set_parameter(USE_BETA, ParamValue::Bool(value));
            app.report(result);
        }
        _ => {}
    }
}

fn adjust_days<B: Backend + 'static>(app: &mut AppState<B>, delta: i64) {
    let days = (i64::from(app.session.selection().days_to_predict()) + delta).clamp(1, 60);
    let result = app.session.set_parameter(DAYS_TO_PREDICT, ParamValue::Int(days));
    app.report(result);
}

fn handle_import_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') => app.open_import_prompt(),
        KeyCode::Tab => app.cycle_import_target(),
        KeyCode::Enter => app.import_from_path(),
        _ => {}
    }
}

fn handle_training_key<B: Backend + 'static>(app: &mut AppState<B>, key: KeyEvent) {
    let slot = match key.code {
        KeyCode::Char('r') => Slot::Recalculate,
        KeyCode::Char('a') => Slot::ResearchAnalysis,
        _ => return,
    };
    if app.session.is_pending(slot) {
        app.set_warning(format!("The {} is already running", slot.label()));
        return;
    }
    if slot == Slot::Recalculate {
        app.session.recalculate();
    } else {
        app.session.research_analyze();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use fundview_core::api::ScriptedBackend;
    use fundview_core::executor::ManualExecutor;
    use fundview_core::{Payload, Session, Settings};

    use crate::persistence::Preferences;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn type_text<B: Backend + 'static>(app: &mut AppState<B>, text: &str) {
        for c in text.chars() {
            handle_key(app, press(KeyCode::Char(c)));
        }
    }

    fn app() -> (AppState<ScriptedBackend>, ManualExecutor<Payload>) {
        let exec = ManualExecutor::new();
        let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec.clone()));
        (AppState::new(session, &Preferences::default()), exec)
    }

    fn settle(app: &mut AppState<ScriptedBackend>, exec: &ManualExecutor<Payload>) {
        exec.complete_all();
        app.tick();
    }

    fn login(app: &mut AppState<ScriptedBackend>) {
        type_text(app, "quinn");
        handle_key(app, press(KeyCode::Tab));
        type_text(app, "pw");
        handle_key(app, press(KeyCode::Enter));
    }

    #[test]
    fn login_form_accepts_q_as_text() {
        let (mut app, _exec) = app();
        login(&mut app);
        assert!(app.running);
        assert_eq!(app.screen(), Screen::DepartmentSelect);
        assert_eq!(app.session.user(), Some("quinn"));
    }

    #[test]
    fn release_events_are_ignored() {
        let (mut app, _exec) = app();
        let mut key = press(KeyCode::Char('a'));
        key.kind = KeyEventKind::Release;
        handle_key(&mut app, key);
        assert!(app.login.username.is_empty());
    }

    #[test]
    fn department_cursor_picks_research() {
        let (mut app, _exec) = app();
        login(&mut app);
        handle_key(&mut app, press(KeyCode::Char('j')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.screen(), Screen::ResearchLogin);
        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.screen(), Screen::DepartmentSelect);
    }

    #[test]
    fn analyze_flow_through_keys() {
        let (mut app, exec) = app();
        login(&mut app);
        handle_key(&mut app, press(KeyCode::Enter));
        handle_key(&mut app, press(KeyCode::Char('4')));
        assert_eq!(app.screen(), Screen::SvmAnalysis);
        settle(&mut app, &exec);

        // Without a ticker the request is refused.
        handle_key(&mut app, press(KeyCode::Char('a')));
        assert_eq!(app.session.banner(), Some("Please select a ticker"));

        handle_key(&mut app, press(KeyCode::Char('m')));
        handle_key(&mut app, press(KeyCode::Char('j')));
        handle_key(&mut app, press(KeyCode::Char('j')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.session.selection().market_code, "HOSE");
        settle(&mut app, &exec);

        handle_key(&mut app, press(KeyCode::Char('t')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.session.selection().ticker, "FPT");

        handle_key(&mut app, press(KeyCode::Char('+')));
        assert_eq!(app.session.selection().days_to_predict(), 6);
        handle_key(&mut app, press(KeyCode::Char('a')));
        settle(&mut app, &exec);
        assert_eq!(app.session.cache().len(), 1);
        assert!(app.row_count() > 0);
    }

    #[test]
    fn training_jobs_run_side_by_side() {
        let (mut app, exec) = app();
        login(&mut app);
        handle_key(&mut app, press(KeyCode::Char('j')));
        handle_key(&mut app, press(KeyCode::Enter));
        login(&mut app);
        assert_eq!(app.screen(), Screen::ResearchDataImport);
        handle_key(&mut app, press(KeyCode::Char('3')));
        assert_eq!(app.screen(), Screen::TrainingModel);

        handle_key(&mut app, press(KeyCode::Char('r')));
        handle_key(&mut app, press(KeyCode::Char('a')));
        assert!(app.session.is_pending(Slot::Recalculate));
        assert!(app.session.is_pending(Slot::ResearchAnalysis));

        let spawned = exec.spawned();
        handle_key(&mut app, press(KeyCode::Char('a')));
        assert_eq!(exec.spawned(), spawned, "a running job is not started twice");

        settle(&mut app, &exec);
        assert!(app.session.receipt_view(Slot::Recalculate).ready().is_some());
        assert!(app.session.receipt_view(Slot::ResearchAnalysis).ready().is_some());
    }

    #[test]
    fn escape_from_login_quits() {
        let (mut app, _exec) = app();
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(!app.running);
    }

    #[test]
    fn prompt_collects_import_path() {
        let (mut app, _exec) = app();
        login(&mut app);
        handle_key(&mut app, press(KeyCode::Enter));
        handle_key(&mut app, press(KeyCode::Char('6')));
        assert_eq!(app.screen(), Screen::DataImport);
        handle_key(&mut app, press(KeyCode::Char('i')));
        type_text(&mut app, "rows.jsonx");
        handle_key(&mut app, press(KeyCode::Backspace));
        handle_key(&mut app, press(KeyCode::Enter));
        assert_eq!(app.import_path, "rows.json");
        assert_eq!(app.overlay, Overlay::None);
    }
}
