//! Top-level UI layout: header, active screen, error banner, status bar.

pub mod analysis;
pub mod beta;
pub mod entry;
pub mod jobs;
pub mod overlays;
pub mod reports;
pub mod status_bar;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use fundview_core::api::Backend;
use fundview_core::router::Screen;
use fundview_core::view::DataRegion;

use crate::app::{ALL_MARKETS, AppState, Overlay};
use crate::theme;

/// Draw the entire UI.
pub fn draw<B: Backend + 'static>(f: &mut Frame, app: &AppState<B>) {
    let banner = app.session.banner();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(u16::from(banner.is_some())),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, chunks[0], app);
    draw_screen(f, chunks[1], app);
    if let Some(message) = banner {
        let line = Line::from(vec![
            Span::styled(" ! ", theme::negative().add_modifier(ratatui::style::Modifier::BOLD)),
            Span::styled(message, theme::negative()),
            Span::styled("  [x]dismiss", theme::muted()),
        ]);
        f.render_widget(Paragraph::new(line), chunks[2]);
    }
    status_bar::render(f, chunks[3], app);

    let main_area = chunks[1];
    match &app.overlay {
        Overlay::Help => overlays::render_help(f, main_area, app.screen()),
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::Picker(picker) => overlays::render_picker(f, main_area, picker),
        Overlay::Prompt(prompt) => overlays::render_prompt(f, main_area, prompt),
        Overlay::None => {}
    }
}

fn render_header<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let sel = app.session.selection();
    let mut spans = vec![Span::styled(" Fundview ", theme::accent_bold())];
    if let Some(user) = app.session.user() {
        spans.push(Span::styled(format!("| {user} "), theme::muted()));
    }
    if !matches!(
        app.screen(),
        Screen::Login | Screen::ResearchLogin | Screen::DepartmentSelect
    ) {
        let market = if sel.market_code.is_empty() {
            ALL_MARKETS
        } else {
            sel.market_code.as_str()
        };
        let ticker = if sel.ticker.is_empty() { "-" } else { sel.ticker.as_str() };
        spans.push(Span::styled("| Market ", theme::muted()));
        spans.push(Span::styled(market.to_string(), theme::accent()));
        spans.push(Span::styled("  Ticker ", theme::muted()));
        spans.push(Span::styled(ticker.to_string(), theme::accent()));
        spans.push(Span::styled(
            format!(
                "  Days {}  Beta {}",
                sel.days_to_predict(),
                if sel.use_beta() { "on" } else { "off" }
            ),
            theme::muted(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the active screen inside its border.
fn draw_screen<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let screen = app.screen();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(format!(" {} ", screen.label()))
        .title_style(theme::panel_title(true));

    let inner = block.inner(area);
    f.render_widget(block, area);

    match screen {
        Screen::Login | Screen::ResearchLogin => entry::render_login(f, inner, app),
        Screen::DepartmentSelect => entry::render_department(f, inner, app),
        Screen::Dashboard | Screen::AssetReport => reports::render_stock_rows(f, inner, app),
        Screen::MarketIndexView => reports::render_market_index(f, inner, app),
        Screen::BetaCalculation => beta::render(f, inner, app),
        Screen::SvmAnalysis => analysis::render(f, inner, app),
        Screen::SvmDataAnalysis => analysis::render_latest(f, inner, app),
        Screen::DataImport | Screen::ResearchDataImport => jobs::render_import(f, inner, app),
        Screen::TrainingModel => jobs::render_training(f, inner, app),
        Screen::NotificationCenter => jobs::render_notifications(f, inner, app),
    }
}

/// Lines for a region that has nothing to show yet. `None` when it is ready.
pub fn region_placeholder<T>(region: &DataRegion<T>, idle_hint: &str) -> Option<Vec<Line<'static>>> {
    let line = match region {
        DataRegion::Ready(_) => return None,
        DataRegion::Idle => Line::from(Span::styled(idle_hint.to_string(), theme::muted())),
        DataRegion::Loading => Line::from(Span::styled("Loading...", theme::warning())),
        DataRegion::Error(message) => Line::from(vec![
            Span::styled("Error: ", theme::negative()),
            Span::styled(message.clone(), theme::negative()),
        ]),
    };
    Some(vec![Line::from(""), line])
}

/// Window `[start, end)` of `len` rows that keeps `cursor` visible in `height`.
pub fn visible_window(len: usize, cursor: usize, height: usize) -> (usize, usize) {
    if height == 0 || len == 0 {
        return (0, 0);
    }
    let start = cursor.saturating_sub(height - 1).min(len.saturating_sub(height));
    (start, (start + height).min(len))
}

pub fn fmt_num(value: Option<f64>, decimals: usize) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(v) => format!("{v:.decimals$}"),
        None => "-".to_string(),
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use fundview_core::api::ScriptedBackend;
    use fundview_core::executor::ManualExecutor;
    use fundview_core::{Payload, Session, Settings};

    use crate::persistence::Preferences;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
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

    #[test]
    fn window_keeps_cursor_visible() {
        assert_eq!(visible_window(0, 0, 10), (0, 0));
        assert_eq!(visible_window(5, 4, 10), (0, 5));
        assert_eq!(visible_window(30, 0, 10), (0, 10));
        assert_eq!(visible_window(30, 15, 10), (6, 16));
        assert_eq!(visible_window(30, 29, 10), (20, 30));
    }

    proptest::proptest! {
        #[test]
        fn window_always_contains_cursor(len in 1usize..200, height in 1usize..50, seed in 0usize..1000) {
            let cursor = seed % len;
            let (start, end) = visible_window(len, cursor, height);
            proptest::prop_assert!(start <= cursor && cursor < end);
            proptest::prop_assert_eq!(end - start, height.min(len));
        }
    }

    #[test]
    fn placeholder_only_for_unready_regions() {
        assert!(region_placeholder(&DataRegion::Ready(1), "idle").is_none());
        assert!(region_placeholder::<u8>(&DataRegion::Loading, "idle").is_some());
    }

    #[test]
    fn every_screen_renders() {
        let exec: ManualExecutor<Payload> = ManualExecutor::new();
        let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec.clone()));
        let mut app = AppState::new(session, &Preferences::default());
        app.login.username = "analyst".into();
        app.login.password = "pw".into();
        app.submit_login();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        app.navigate(Screen::ResearchLogin);
        terminal.draw(|f| draw(f, &app)).unwrap();
        assert!(buffer_text(&terminal).contains("Research Login"));
        app.close();

        app.navigate(Screen::Dashboard);
        for screen in Screen::FUND_MENU {
            app.navigate(screen);
            exec.complete_all();
            app.tick();
            terminal.draw(|f| draw(f, &app)).unwrap();
            assert!(buffer_text(&terminal).contains(screen.label()));
        }
    }

    #[test]
    fn banner_is_drawn_for_refused_action() {
        let exec: ManualExecutor<Payload> = ManualExecutor::new();
        let session = Session::new(ScriptedBackend::demo(), &Settings::default(), Box::new(exec));
        let mut app = AppState::new(session, &Preferences::default());
        app.submit_login();

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();
        assert!(buffer_text(&terminal).contains("Please enter username and password"));
    }
}
