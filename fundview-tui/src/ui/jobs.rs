//! Import, model training and notification center screens.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use fundview_core::api::{Backend, ImportTarget};
use fundview_core::fetch::Slot;
use fundview_core::router::Screen;

use crate::app::AppState;
use crate::theme;
use crate::ui::{region_placeholder, visible_window};

pub fn render_import<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let keys = match app.screen() {
        Screen::ResearchDataImport => " [i] set file path [Tab] switch target [Enter] import",
        _ => " [i] set file path [Enter] import",
    };
    let path = if app.import_path.is_empty() {
        "(none)"
    } else {
        app.import_path.as_str()
    };

    let mut lines = vec![
        Line::from(Span::styled(keys, theme::muted())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  File    ", theme::muted()),
            Span::styled(path.to_string(), theme::accent()),
        ]),
        Line::from(vec![
            Span::styled("  Target  ", theme::muted()),
            Span::styled(app.import_target.label(), theme::accent()),
            Span::styled(format!("  ({})", app.import_target.path()), theme::muted()),
        ]),
        Line::from(Span::styled(
            "  The file holds a JSON array of row objects, or {\"data\": [...]}.",
            theme::muted(),
        )),
    ];
    if app.screen() == Screen::ResearchDataImport {
        let other = match app.import_target {
            ImportTarget::ResearchMarketIndex => ImportTarget::Research,
            _ => ImportTarget::ResearchMarketIndex,
        };
        lines.push(Line::from(Span::styled(
            format!("  Tab switches to {}.", other.label()),
            theme::muted(),
        )));
    }
    lines.push(Line::from(""));

    let region = app.session.receipt_view(Slot::DataImport);
    match region_placeholder(&region, "  Nothing imported yet.") {
        Some(placeholder) => lines.extend(placeholder),
        None => {
            let message = region
                .ready()
                .and_then(|r| r.message.clone())
                .unwrap_or_else(|| "Import finished".into());
            lines.push(Line::from(Span::styled(format!("  {message}"), theme::positive())));
        }
    }
    f.render_widget(Paragraph::new(lines), area);
}

pub fn render_training<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let mut lines = vec![Line::from(Span::styled(
        " [r] recalculate betas and retrain [a] run research analysis",
        theme::muted(),
    ))];
    for (slot, title) in [
        (Slot::Recalculate, "Recalculation"),
        (Slot::ResearchAnalysis, "Research analysis"),
    ] {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {title}"), theme::accent())));
        let region = app.session.receipt_view(slot);
        match region_placeholder(&region, "  Not started in this session.") {
            Some(placeholder) => lines.extend(placeholder.into_iter().skip(1)),
            None => {
                let message = region
                    .ready()
                    .and_then(|r| r.message.clone())
                    .unwrap_or_else(|| "Job finished".into());
                lines.push(Line::from(Span::styled(format!("  {message}"), theme::positive())));
            }
        }
    }
    f.render_widget(Paragraph::new(lines), area);
}

pub fn render_notifications<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let mut lines = vec![Line::from(Span::styled(
        format!(" {} notifications  [j/k]scroll [c]lear", app.notifications.len()),
        theme::muted(),
    ))];
    if app.notifications.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Finished requests show up here.",
            theme::muted(),
        )));
    }

    let height = area.height.saturating_sub(1) as usize;
    let (start, end) = visible_window(app.notifications.len(), app.cursor, height);
    for (i, n) in app.notifications.iter().enumerate().take(end).skip(start) {
        let (mark, style) = if n.ok {
            ("ok ", theme::positive())
        } else {
            ("err", theme::negative())
        };
        let text_style = if i == app.cursor { theme::cursor() } else { theme::text() };
        lines.push(Line::from(vec![
            Span::styled(format!(" [{}] ", n.timestamp.format("%H:%M:%S")), theme::muted()),
            Span::styled(mark, style),
            Span::styled(format!(" {:<16} ", n.slot.label()), theme::neutral()),
            Span::styled(n.text.clone(), text_style),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}
