//! Entry screens: login forms and department choice.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use fundview_core::api::Backend;
use fundview_core::router::Screen;

use crate::app::{AppState, LoginField};
use crate::theme;

pub fn render_login<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let form = &app.login;
    let heading = match app.screen() {
        Screen::ResearchLogin => "Research department sign-in",
        _ => "Fund management sign-in",
    };

    let field = |label: &str, value: String, active: bool| {
        let style = if active { theme::cursor() } else { theme::text() };
        Line::from(vec![
            Span::styled(format!("  {label:>10}: "), theme::muted()),
            Span::styled(format!("{value:<24}"), style),
        ])
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {heading}"), theme::accent_bold())),
        Line::from(""),
        field(
            "Username",
            form.username.clone(),
            form.focus == LoginField::Username,
        ),
        field(
            "Password",
            "*".repeat(form.password.chars().count()),
            form.focus == LoginField::Password,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  [Tab]switch field [Enter]sign in [Esc]back",
            theme::muted(),
        )),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

pub fn render_department<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let options = [
        ("Fund management", "Dashboard, asset report, beta, SVM analysis"),
        ("Research", "Data import, SVM data analysis, model training"),
    ];

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Choose a department", theme::accent_bold())),
        Line::from(""),
    ];
    for (i, (name, desc)) in options.iter().enumerate() {
        let style = if i == app.cursor {
            theme::cursor()
        } else {
            theme::text()
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{name:<18}"), style),
            Span::styled(format!("  {desc}"), theme::muted()),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  [j/k]move [Enter]open [Esc]back",
        theme::muted(),
    )));
    f.render_widget(Paragraph::new(lines), area);
}
