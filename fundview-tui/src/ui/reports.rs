//! Dashboard, asset report and market index screens.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};

use fundview_core::api::{Backend, Row};
use fundview_core::fetch::Slot;
use fundview_core::router::Screen;

use crate::app::AppState;
use crate::theme::{self, Theme};
use crate::ui::{fmt_num, region_placeholder, visible_window};

/// Stock table for the dashboard (all rows) or the asset report (per market).
pub fn render_stock_rows<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let (slot, hint) = match app.screen() {
        Screen::AssetReport => (Slot::AssetReport, "[m]market [r]reload"),
        _ => (Slot::StockData, "[m]market [t]icker [r]reload"),
    };
    let region = app.session.rows_view(slot);

    let mut lines = vec![Line::from(Span::styled(format!("  {hint}"), theme::muted()))];
    if let Some(placeholder) = region_placeholder(&region, "  Press r to load stock data.") {
        lines.extend(placeholder);
        f.render_widget(Paragraph::new(lines), area);
        return;
    }
    let rows = region.ready().copied().unwrap_or_default();
    let palette = Theme::default();

    lines.push(Line::from(Span::styled(
        format!(
            "  {:<8} {:<8} {:>10} {:>10} {:>10} {:>12} {:>10} {:>8}",
            "Market", "Ticker", "Open", "Current", "Close", "Volume", "P/L", "P/L %"
        ),
        theme::accent_bold(),
    )));

    let height = area.height.saturating_sub(2) as usize;
    let (start, end) = visible_window(rows.len(), app.cursor, height);
    for (i, row) in rows.iter().enumerate().take(end).skip(start) {
        let pnl = row.profit_loss.unwrap_or(0.0);
        let base = if i == app.cursor { theme::cursor() } else { theme::text() };
        lines.push(Line::from(vec![
            Span::styled(
                format!(
                    "  {:<8} {:<8} {:>10} {:>10} {:>10} {:>12}",
                    row.market_code.as_deref().unwrap_or("-"),
                    row.ticker.as_deref().unwrap_or("-"),
                    fmt_num(row.open_price, 2),
                    fmt_num(row.current_price, 2),
                    fmt_num(row.close_price, 2),
                    fmt_num(row.total_volume, 0),
                ),
                base,
            ),
            Span::styled(
                format!(
                    " {:>10} {:>8}",
                    fmt_num(row.profit_loss, 2),
                    fmt_num(row.profit_loss_percent, 2)
                ),
                Style::default().fg(palette.pnl_color(pnl)),
            ),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}

/// The numeric series of `column`, skipping rows without a number there.
pub fn column_series(rows: &[Row], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|r| r.get(column).and_then(|v| v.as_f64()))
        .collect()
}

fn cell(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn render_market_index<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let region = app.session.market_index_view();
    if let Some(mut lines) = region_placeholder(&region, "  Press r to load the market index.") {
        lines.insert(0, Line::from(Span::styled("  [r]reload", theme::muted())));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }
    let rows = region.ready().copied().unwrap_or_default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let columns: Vec<&String> = rows.first().map(|r| r.keys().collect()).unwrap_or_default();
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "  {}",
            columns
                .iter()
                .map(|c| format!("{c:>14}"))
                .collect::<String>()
        ),
        theme::accent_bold(),
    ))];
    let height = chunks[0].height.saturating_sub(1) as usize;
    let (start, end) = visible_window(rows.len(), app.cursor, height);
    for (i, row) in rows.iter().enumerate().take(end).skip(start) {
        let style = if i == app.cursor { theme::cursor() } else { theme::text() };
        let text: String = columns.iter().map(|c| format!("{:>14}", cell(row, c))).collect();
        lines.push(Line::from(Span::styled(format!("  {text}"), style)));
    }
    f.render_widget(Paragraph::new(lines), chunks[0]);

    let closes = column_series(rows, "Close");
    if closes.len() > 1 {
        render_line_chart(f, chunks[1], &closes, "Close");
    }
}

fn render_line_chart(f: &mut Frame, area: Rect, series: &[f64], label: &str) {
    let min_y = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let padding = ((max_y - min_y).abs() * 0.05).max(f64::EPSILON);
    let (y_min, y_max) = (min_y - padding, max_y + padding);
    let x_max = series.len().saturating_sub(1) as f64;

    let data: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();

    let dataset = Dataset::default()
        .name(label)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(theme::ACCENT))
        .graph_type(GraphType::Line)
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([0.0, x_max.max(1.0)])
                .labels(vec![
                    Span::styled("1", theme::muted()),
                    Span::styled(format!("{}", series.len()), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format!("{y_min:.1}"), theme::muted()),
                    Span::styled(format!("{y_max:.1}"), theme::muted()),
                ]),
        );
    f.render_widget(chart, area);
}
