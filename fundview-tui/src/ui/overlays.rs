//! Overlay widgets: help, error history, pickers and prompts.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use fundview_core::api::Backend;
use fundview_core::router::{Screen, ScreenGroup};

use crate::app::{AppState, Picker, PickerKind, Prompt, PromptKind};
use crate::theme;
use crate::ui::{centered_rect, visible_window};

pub fn render_help(f: &mut Frame, area: Rect, screen: Screen) {
    let popup = centered_rect(70, 80, area);
    f.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(" Help (any key closes) ")
        .title_style(theme::accent_bold());

    let mut lines: Vec<Line> = Vec::new();
    section(&mut lines, "Global");
    key(&mut lines, "Esc", "Close screen (back)");
    key(&mut lines, "j / k", "Move cursor down / up");
    key(&mut lines, "e", "Error history");
    key(&mut lines, "x", "Dismiss error banner");
    key(&mut lines, "L", "Log out");
    key(&mut lines, "q / Ctrl+C", "Quit");
    lines.push(Line::from(""));

    let menu: &[Screen] = match screen.group() {
        ScreenGroup::Fund => &Screen::FUND_MENU,
        ScreenGroup::Research => &Screen::RESEARCH_MENU,
        ScreenGroup::Entry => &[],
    };
    if !menu.is_empty() {
        section(&mut lines, "Menu");
        for (i, s) in menu.iter().enumerate() {
            key(&mut lines, &(i + 1).to_string(), s.label());
        }
        lines.push(Line::from(""));
    }

    section(&mut lines, "Selection");
    key(&mut lines, "m / t", "Pick market code / ticker");
    key(&mut lines, "+ / -", "Days to predict");
    key(&mut lines, "u", "Toggle beta feature");
    key(&mut lines, "a", "Run SVM analysis");
    key(&mut lines, "v", "Table / chart view");

    let para = Paragraph::new(lines).block(block);
    f.render_widget(para, popup);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>12}  "), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}

/// Error history overlay.
pub fn render_error_history<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll ",
            app.error_history.len()
        ))
        .title_style(theme::negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        let text = Paragraph::new(Span::styled("No errors recorded.", theme::muted()));
        f.render_widget(text, inner);
        return;
    }

    let visible_height = inner.height as usize / 2;
    let start = app.error_scroll;
    let end = (start + visible_height.max(1)).min(app.error_history.len());

    let mut lines: Vec<Line> = Vec::new();
    for (i, err) in app.error_history.iter().enumerate().take(end).skip(start) {
        let style = if i == app.error_scroll {
            theme::negative().add_modifier(Modifier::BOLD)
        } else {
            theme::muted()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", err.timestamp.format("%H:%M:%S")), theme::muted()),
            Span::styled(format!("[{}] ", err.tag), theme::warning()),
            Span::styled(err.message.as_str(), style),
        ]));
        if !err.context.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.context.as_str(), theme::muted()),
            ]));
        }
    }
    f.render_widget(Paragraph::new(lines), inner);
}

pub fn render_picker(f: &mut Frame, area: Rect, picker: &Picker) {
    let popup = centered_rect(40, 60, area);
    f.render_widget(Clear, popup);
    let title = match picker.kind {
        PickerKind::Market => " Market code ",
        PickerKind::Ticker => " Ticker ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(title)
        .title_style(theme::accent_bold());
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let (start, end) = visible_window(picker.options.len(), picker.cursor, inner.height as usize);
    let lines: Vec<Line> = picker
        .options
        .iter()
        .enumerate()
        .take(end)
        .skip(start)
        .map(|(i, option)| {
            let style = if i == picker.cursor { theme::cursor() } else { theme::text() };
            Line::from(Span::styled(format!(" {option}"), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

pub fn render_prompt(f: &mut Frame, area: Rect, prompt: &Prompt) {
    let popup = centered_rect(60, 20, area);
    f.render_widget(Clear, popup);
    let title = match &prompt.kind {
        PromptKind::Weight(code) => format!(" Weight for {code} "),
        PromptKind::ImportPath => " Row file path ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::accent())
        .title(title)
        .title_style(theme::accent_bold());

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" > ", theme::accent()),
            Span::styled(prompt.buffer.as_str(), theme::text()),
            Span::styled("_", theme::accent()),
        ]),
        Line::from(""),
        Line::from(Span::styled(" [Enter]confirm [Esc]cancel", theme::muted())),
    ];
    f.render_widget(Paragraph::new(lines).block(block), popup);
}
