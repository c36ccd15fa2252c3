//! Beta calculation screen: per-stock betas and the weighted portfolio beta.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use fundview_core::api::Backend;
use fundview_core::view::{BetaBand, format_beta};

use crate::app::AppState;
use crate::theme::{self, Theme};
use crate::ui::{region_placeholder, visible_window};

pub fn render<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    render_betas(f, chunks[0], app);
    render_portfolio(f, chunks[1], app);
}

fn render_betas<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let palette = Theme::default();
    let mut lines = vec![Line::from(Span::styled(
        " [m]market [t]icker [b]eta for ticker [B] all stocks",
        theme::muted(),
    ))];

    let region = app.session.beta_view();
    if let Some(placeholder) = region_placeholder(&region, " Choose a ticker and press b.") {
        lines.extend(placeholder);
    } else if let Some(results) = region.ready() {
        lines.push(Line::from(Span::styled(
            format!(" {:<10} {:>8}  {:<10} {}", "Stock", "Beta", "Band", "Interpretation"),
            theme::accent_bold(),
        )));
        let height = area.height.saturating_sub(2) as usize;
        for result in results.iter().take(height) {
            if let Some(err) = &result.error {
                lines.push(Line::from(vec![
                    Span::styled(format!(" {:<10} ", result.label()), theme::text()),
                    Span::styled(err.clone(), theme::negative()),
                ]));
                continue;
            }
            let band = BetaBand::classify(result.beta);
            let interpretation = result
                .interpretation
                .clone()
                .unwrap_or_else(|| band.description().to_string());
            lines.push(Line::from(vec![
                Span::styled(format!(" {:<10} ", result.label()), theme::text()),
                Span::styled(
                    format!("{:>8}  {:<10}", format_beta(result.beta), band.label()),
                    Style::default().fg(palette.beta_color(band)),
                ),
                Span::styled(format!(" {interpretation}"), theme::muted()),
            ]));
        }
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn render_portfolio<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let palette = Theme::default();
    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(theme::muted())
        .title(" Portfolio ")
        .title_style(theme::accent_bold());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(Span::styled(
        " [a]dd ticker [w]eight [d]elete [p]ortfolio beta",
        theme::muted(),
    ))];

    let portfolio = app.session.portfolio();
    if portfolio.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Empty. Select a ticker and press a.",
            theme::muted(),
        )));
    }
    let (start, end) = visible_window(portfolio.len(), app.cursor, 8);
    for (i, (code, weight)) in portfolio.iter().enumerate().take(end).skip(start) {
        let style = if i == app.cursor { theme::cursor() } else { theme::text() };
        lines.push(Line::from(Span::styled(format!(" {code:<10} w={weight:>6.2}"), style)));
    }
    lines.push(Line::from(""));

    let region = app.session.portfolio_view();
    if let Some(placeholder) = region_placeholder(&region, " Press p to compute the portfolio beta.") {
        lines.extend(placeholder);
    } else if let Some(result) = region.ready() {
        let band = BetaBand::classify(Some(result.portfolio_beta));
        lines.push(Line::from(vec![
            Span::styled(" Portfolio beta ", theme::muted()),
            Span::styled(
                format!("{:.3}", result.portfolio_beta),
                Style::default().fg(palette.beta_color(band)),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!(" {}", result.interpretation),
            theme::muted(),
        )));
        for c in &result.component_betas {
            lines.push(Line::from(Span::styled(
                format!(
                    "  {:<10} beta {:>8}  weight {:>6.2}  weighted {:>8}",
                    c.stock_code,
                    format_beta(c.beta),
                    c.weight,
                    format_beta(c.weighted_beta)
                ),
                theme::text(),
            )));
        }
    }
    f.render_widget(Paragraph::new(lines), inner);
}
