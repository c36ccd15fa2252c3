//! Whole-app walkthroughs driven by key presses, with requests held by a
//! manual executor so completion order is under test control.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use fundview_core::api::ScriptedBackend;
use fundview_core::executor::ManualExecutor;
use fundview_core::fetch::Slot;
use fundview_core::router::Screen;
use fundview_core::{Payload, Session, Settings};
use fundview_tui::persistence::Preferences;
use fundview_tui::{AppState, input, ui};

type App = AppState<ScriptedBackend>;

fn press(app: &mut App, code: KeyCode) {
    input::handle_key(
        app,
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        },
    );
}

fn keys(app: &mut App, text: &str) {
    for c in text.chars() {
        press(app, KeyCode::Char(c));
    }
}

fn settle(app: &mut App, exec: &ManualExecutor<Payload>) {
    exec.complete_all();
    app.tick();
}

fn render(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
    terminal.draw(|f| ui::draw(f, app)).unwrap();
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

/// Logged in to the fund department, sitting on `menu` (1-based).
fn fund_screen(menu: char) -> (App, ManualExecutor<Payload>) {
    let exec = ManualExecutor::new();
    let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec.clone()));
    let mut app = AppState::new(session, &Preferences::default());
    keys(&mut app, "quinn");
    press(&mut app, KeyCode::Tab);
    keys(&mut app, "pw");
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Enter);
    press(&mut app, KeyCode::Char(menu));
    settle(&mut app, &exec);
    (app, exec)
}

#[test]
fn quick_market_switch_keeps_the_last_ticker_list() {
    let (mut app, exec) = fund_screen('4');
    assert_eq!(app.screen(), Screen::SvmAnalysis);

    // HOSE, then HNX before the HOSE tickers arrive.
    keys(&mut app, "mjj");
    press(&mut app, KeyCode::Enter);
    keys(&mut app, "mk");
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.session.selection().market_code, "HNX");
    assert_eq!(exec.held().iter().filter(|t| t.slot == Slot::TickerList).count(), 2);

    settle(&mut app, &exec);
    let tickers: Vec<&str> = app.session.store().tickers().unwrap().iter().collect();
    assert_eq!(tickers, vec!["CEO", "PVS", "SHS"]);
    assert!(app.error_history.is_empty());
}

#[test]
fn analysis_renders_as_table_and_chart() {
    let (mut app, exec) = fund_screen('4');
    keys(&mut app, "mjj");
    press(&mut app, KeyCode::Enter);
    settle(&mut app, &exec);
    keys(&mut app, "t");
    press(&mut app, KeyCode::Enter);
    keys(&mut app, "a");
    assert!(render(&app).contains("Loading"));
    settle(&mut app, &exec);

    let table = render(&app);
    assert!(table.contains("FPT"), "{table}");

    keys(&mut app, "v");
    assert_eq!(app.session.display_mode().label(), "Chart");
    assert_eq!(exec.held().len(), 0);
    let chart = render(&app);
    assert_ne!(table, chart);
    assert_eq!(app.preferences().display_mode, app.session.display_mode());
}

#[test]
fn portfolio_beta_from_selected_ticker() {
    let (mut app, exec) = fund_screen('3');
    assert_eq!(app.screen(), Screen::BetaCalculation);

    // Nothing in the portfolio yet.
    keys(&mut app, "p");
    assert_eq!(app.error_history[0].tag, "VAL");

    keys(&mut app, "mjj");
    press(&mut app, KeyCode::Enter);
    settle(&mut app, &exec);
    keys(&mut app, "t");
    press(&mut app, KeyCode::Enter);
    keys(&mut app, "ap");
    settle(&mut app, &exec);

    let region = app.session.portfolio_view();
    let portfolio = region.ready().expect("portfolio beta ready");
    assert_eq!(portfolio.component_betas.len(), 1);
    assert_eq!(portfolio.component_betas[0].stock_code, "FPT");
    assert!(render(&app).contains("FPT"));
}

#[test]
fn leaving_a_screen_drops_its_late_result() {
    let (mut app, exec) = fund_screen('5');
    assert_eq!(app.screen(), Screen::MarketIndexView);
    keys(&mut app, "r");
    assert!(app.session.is_pending(Slot::MarketIndex));

    // Back to the dashboard the index view was opened from.
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.screen(), Screen::Dashboard);
    settle(&mut app, &exec);
    assert!(!app.session.is_pending(Slot::MarketIndex));
    assert!(app.session.market_index_view().ready().is_none());
}

#[test]
fn logout_returns_to_an_empty_login() {
    let (mut app, exec) = fund_screen('1');
    assert!(app.session.store().market_codes().is_some());
    keys(&mut app, "L");
    settle(&mut app, &exec);
    assert_eq!(app.screen(), Screen::Login);
    assert_eq!(app.session.user(), None);
    assert!(app.session.store().market_codes().is_none());
    assert!(render(&app).contains("Fund management sign-in"));
}
