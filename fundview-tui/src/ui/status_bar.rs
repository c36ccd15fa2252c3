//! Bottom status bar: pending requests, last status message, key hints.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use fundview_core::api::Backend;
use fundview_core::fetch::Slot;

use crate::app::{AppState, StatusLevel};
use crate::theme;

pub fn render<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let mut spans: Vec<Span> = vec![Span::styled(" ?:help e:errors Esc:back q:quit", theme::muted())];

    let pending: Vec<&str> = Slot::ALL
        .into_iter()
        .filter(|&s| app.session.is_pending(s))
        .map(Slot::label)
        .collect();
    if !pending.is_empty() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(format!("loading {}", pending.join(", ")), theme::warning()));
    }

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
