//! SVM analysis screens. The analysis area draws only the cache entry of the
//! current selection; a result for another selection never shows here.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};

use fundview_core::api::{Backend, Prediction, SvmAnalysis};
use fundview_core::view::{
    BetaBand, ConfidenceBand, Signal, SignalDistribution, format_beta, format_confidence,
};
use fundview_core::DisplayMode;

use crate::app::AppState;
use crate::theme::{self, Theme};
use crate::ui::{region_placeholder, visible_window};

const KEYS: &str = " [m]arket [t]icker [+/-]days [u]se beta [a]nalyze [v]iew [r]efresh latest";

pub fn render<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4), Constraint::Length(3)])
        .split(area);
    f.render_widget(Paragraph::new(Span::styled(KEYS, theme::muted())), chunks[0]);

    let region = app.session.analysis_view();
    match region.ready() {
        Some(analysis) => match app.session.display_mode() {
            DisplayMode::Table => render_table(f, chunks[1], analysis, app.cursor),
            DisplayMode::Chart => render_chart(f, chunks[1], analysis),
        },
        None => {
            let lines = region_placeholder(&region, " Choose a market and ticker, then press a.")
                .unwrap_or_default();
            f.render_widget(Paragraph::new(lines), chunks[1]);
        }
    }
    render_latest_summary(f, chunks[2], app);
}

fn render_table(f: &mut Frame, area: Rect, analysis: &SvmAnalysis, cursor: usize) {
    let dist = SignalDistribution::from_predictions(&analysis.predictions);
    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Accuracy ", theme::muted()),
            Span::styled(
                format!("{:.1}%", analysis.model_metrics.accuracy * 100.0),
                theme::accent_bold(),
            ),
            Span::styled(
                format!(
                    "   buy {} ({:.0}%)  hold {} ({:.0}%)  sell {} ({:.0}%)  trend {}",
                    dist.buy,
                    dist.percent(dist.buy),
                    dist.hold,
                    dist.percent(dist.hold),
                    dist.sell,
                    dist.percent(dist.sell),
                    dist.trend().arrow()
                ),
                theme::muted(),
            ),
        ]),
        Line::from(""),
    ];
    let height = area.height.saturating_sub(3) as usize;
    lines.extend(prediction_lines(&analysis.predictions, cursor, height));
    f.render_widget(Paragraph::new(lines), area);
}

/// Header plus the visible window of the prediction table.
pub fn prediction_lines(predictions: &[Prediction], cursor: usize, height: usize) -> Vec<Line<'static>> {
    let palette = Theme::default();
    let mut lines = vec![Line::from(Span::styled(
        format!(
            " {:<10} {:<12} {:>10} {:<10} {:>8}  {}",
            "Stock", "Signal", "Confidence", "Level", "Beta", "Beta band"
        ),
        theme::accent_bold(),
    ))];
    let (start, end) = visible_window(predictions.len(), cursor, height.saturating_sub(1));
    for (i, p) in predictions.iter().enumerate().take(end).skip(start) {
        let signal = Signal::classify(&p.signal);
        let label = p
            .prediction_label
            .clone()
            .unwrap_or_else(|| signal.label().to_string());
        let level = p
            .confidence
            .map(|c| ConfidenceBand::classify(c).label())
            .unwrap_or("-");
        let band = BetaBand::classify(p.beta);
        let name_style = if i == cursor { theme::cursor() } else { theme::text() };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<10} ", p.stock_code), name_style),
            Span::styled(
                format!("{label:<12}"),
                Style::default().fg(palette.signal_color(signal)),
            ),
            Span::styled(
                format!(" {:>10} {:<10}", format_confidence(p.confidence), level),
                theme::text(),
            ),
            Span::styled(
                format!(" {:>8}  {}", format_beta(p.beta), band.label()),
                Style::default().fg(palette.beta_color(band)),
            ),
        ]));
    }
    lines
}

fn render_chart(f: &mut Frame, area: Rect, analysis: &SvmAnalysis) {
    let palette = Theme::default();
    let dist = SignalDistribution::from_predictions(&analysis.predictions);
    let bars = [
        (Signal::Buy, dist.buy),
        (Signal::Hold, dist.hold),
        (Signal::Sell, dist.sell),
    ]
    .map(|(signal, count)| {
        Bar::default()
            .label(Line::from(signal.label()))
            .value(count as u64)
            .text_value(format!("{count} ({:.0}%)", dist.percent(count)))
            .style(Style::default().fg(palette.signal_color(signal)))
    });

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::NONE)
                .title(format!(
                    " Signal distribution, accuracy {:.1}%, trend {} ",
                    analysis.model_metrics.accuracy * 100.0,
                    dist.trend().arrow()
                ))
                .title_style(theme::accent_bold()),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(12)
        .bar_gap(4);
    f.render_widget(chart, area);
}

fn render_latest_summary<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let region = app.session.latest_view();
    let line = match region.ready() {
        Some(Some(latest)) => Line::from(vec![
            Span::styled(" Last stored run ", theme::muted()),
            Span::styled(latest.date.clone().unwrap_or_else(|| "?".into()), theme::accent()),
            Span::styled(
                format!(
                    "  {} predictions, accuracy {}",
                    latest.predictions.len(),
                    format_confidence(latest.accuracy)
                ),
                theme::muted(),
            ),
        ]),
        Some(None) => Line::from(Span::styled(" No stored analysis yet.", theme::muted())),
        None => region_placeholder(&region, " Stored analysis not loaded.")
            .and_then(|mut l| l.pop())
            .unwrap_or_default(),
    };
    let block = Block::default().borders(Borders::TOP).border_style(theme::muted());
    f.render_widget(Paragraph::new(line).block(block), area);
}

/// Research view: the stored analysis table, plus the current run's status.
pub fn render_latest<B: Backend + 'static>(f: &mut Frame, area: Rect, app: &AppState<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(2), Constraint::Min(3)])
        .split(area);
    f.render_widget(Paragraph::new(Span::styled(KEYS, theme::muted())), chunks[0]);

    let current = app.session.analysis_view();
    let status = match current.ready() {
        Some(a) => Line::from(Span::styled(
            format!(
                " Current selection: {} predictions, accuracy {:.1}%",
                a.predictions.len(),
                a.model_metrics.accuracy * 100.0
            ),
            theme::accent(),
        )),
        None => region_placeholder(&current, " No analysis run for this selection.")
            .and_then(|mut l| l.pop())
            .unwrap_or_default(),
    };
    f.render_widget(Paragraph::new(status), chunks[1]);

    let region = app.session.latest_view();
    let lines = match region.ready() {
        Some(Some(latest)) => {
            let mut lines = vec![Line::from(Span::styled(
                format!(
                    " Stored run {} | {} {} | {} days | beta {}",
                    latest.date.as_deref().unwrap_or("?"),
                    latest.market_code.as_deref().unwrap_or("all"),
                    latest.ticker.as_deref().unwrap_or(""),
                    latest.days_to_predict.map_or("-".to_string(), |d| d.to_string()),
                    match latest.use_beta {
                        Some(true) => "on",
                        Some(false) => "off",
                        None => "-",
                    }
                ),
                theme::muted(),
            ))];
            let height = chunks[2].height.saturating_sub(1) as usize;
            lines.extend(prediction_lines(&latest.predictions, app.cursor, height));
            lines
        }
        Some(None) => vec![Line::from(Span::styled(
            " No stored analysis yet.",
            theme::muted(),
        ))],
        None => region_placeholder(&region, " Press r to load the stored analysis.").unwrap_or_default(),
    };
    f.render_widget(Paragraph::new(lines), chunks[2]);
}
