//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for the three dashboard controls (span,
//! benchmark, composite weight), a KPI row, and the five charts. Every
//! change re-runs [`Dashboard::render`]; a fatal pipeline error replaces the
//! whole dashboard with its message.

use std::io;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::app::pipeline::Dashboard;
use crate::config::Settings;
use crate::domain::Controls;
use crate::error::{AppError, PipelineError};
use crate::report::{DashboardView, ScatterChart, TimeChart};

mod plotters_chart;

use plotters_chart::{ChartLine, DashPlottersChart, tui_color};

/// Line colors, assigned to series in order.
const PALETTE: [RGBColor; 3] = [
    RGBColor(0, 255, 255),   // cyan
    RGBColor(255, 170, 0),   // orange
    RGBColor(180, 180, 180), // gray
];
const FIT_COLOR: RGBColor = RGBColor(255, 0, 0);
const DOT_COLOR: RGBColor = RGBColor(255, 255, 255);

/// Number of rows in the settings list.
const SETTINGS_FIELDS: usize = 3;

/// Start the TUI.
pub fn run(settings: &Settings) -> Result<(), AppError> {
    let dashboard = Dashboard::from_settings(settings)?;
    let controls = crate::cli::initial_controls(settings);

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(dashboard, controls);
    terminal
        .draw(|f| app.draw(f))
        .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
    app.rerender();
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Result of the latest render pass.
enum Outcome {
    Pending,
    Ready(Box<DashboardView>),
    Failed(PipelineError),
}

struct App {
    dashboard: Dashboard,
    controls: Controls,
    selected_field: usize,
    status: String,
    outcome: Outcome,
}

impl App {
    fn new(dashboard: Dashboard, controls: Controls) -> Self {
        let status = format!("Fetching prices from {}...", dashboard.source_name());
        Self {
            dashboard,
            controls,
            selected_field: 0,
            status,
            outcome: Outcome::Pending,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < SETTINGS_FIELDS {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('r') => {
                self.controls.refresh = true;
                self.rerender();
                self.controls.refresh = false;
                if matches!(self.outcome, Outcome::Ready(_)) {
                    self.status = "Refreshed prices.".to_string();
                }
            }
            KeyCode::Char('d') => self.write_debug(),
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        let before = self.controls;
        match self.selected_field {
            0 => {
                self.controls.span = if delta >= 0 {
                    self.controls.span.next()
                } else {
                    self.controls.span.prev()
                };
            }
            1 => self.controls.benchmark = self.controls.benchmark.next(),
            2 => self.controls.weight = self.controls.weight.step(delta),
            _ => {}
        }
        if self.controls != before {
            self.rerender();
        }
    }

    fn rerender(&mut self) {
        self.outcome = match self.dashboard.render(&self.controls) {
            Ok(view) => {
                self.status = format!(
                    "{} | {} | {}",
                    self.controls.span.display_name(),
                    self.controls.benchmark.display_name(),
                    view.weight_caption()
                );
                Outcome::Ready(Box::new(view))
            }
            Err(err) => {
                warn!(error = %err, "render halted");
                self.status = "Render halted.".to_string();
                Outcome::Failed(err)
            }
        };
    }

    fn write_debug(&mut self) {
        let Outcome::Ready(view) = &self.outcome else {
            self.status = "Nothing rendered yet.".to_string();
            return;
        };
        self.status = match crate::debug::write_debug_bundle(view, &self.controls) {
            Ok(path) => {
                info!(path = %path.display(), "debug bundle written from TUI");
                format!("Wrote debug bundle: {}", path.display())
            }
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(5),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        match &self.outcome {
            Outcome::Pending => draw_message(frame, chunks[1], "Waiting for data...", Color::Yellow),
            Outcome::Failed(err) => draw_message(frame, chunks[1], &err.to_string(), Color::Red),
            Outcome::Ready(view) => draw_dashboard(frame, chunks[1], view),
        }
        self.draw_settings(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let settings = self.dashboard.settings();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled(
                format!("Is {} Benefiting from the AI Boom?", settings.target),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" — Market Sensitivity & Risk Dashboard"),
        ]));

        let detail = match &self.outcome {
            Outcome::Ready(view) => {
                let h = &view.header;
                format!(
                    "source: {} | {} .. {} | prices n={} | returns n={}",
                    h.source,
                    h.first_date.map(|d| d.to_string()).unwrap_or_default(),
                    h.last_date.map(|d| d.to_string()).unwrap_or_default(),
                    h.price_rows,
                    h.return_rows,
                )
            }
            _ => format!("source: {}", self.dashboard.source_name()),
        };
        lines.push(Line::from(Span::styled(detail, Style::default().fg(Color::Gray))));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let composite = &self.dashboard.settings().composite;
        let w = self.controls.weight;
        let items = vec![
            ListItem::new(format!("Date Range: {}", self.controls.span.display_name())),
            ListItem::new(format!("Benchmark: {}", self.controls.benchmark.display_name())),
            ListItem::new(format!(
                "{} Weights ({} vs {}): {:.2}   {}: {:.0}%  |  {}: {:.0}%",
                composite.label,
                composite.first,
                composite.second,
                w.first(),
                composite.first,
                w.first() * 100.0,
                composite.second,
                w.second() * 100.0,
            )),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  r refresh  d debug  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn draw_message(frame: &mut ratatui::Frame<'_>, area: Rect, message: &str, color: Color) {
    let p = Paragraph::new(message.to_string())
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_dashboard(frame: &mut ratatui::Frame<'_>, area: Rect, view: &DashboardView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(55),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_kpis(frame, rows[0], view);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(rows[1]);
    let risk = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(top[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[2]);

    let charts = &view.charts;
    draw_time_chart(frame, top[0], &charts.performance, fmt_ratio);
    draw_time_chart(frame, risk[0], &charts.volatility, fmt_percent);
    draw_time_chart(frame, risk[1], &charts.drawdown, fmt_percent);
    draw_time_chart(frame, bottom[0], &charts.correlation, fmt_ratio);
    draw_scatter(frame, bottom[1], &charts.scatter);

    let footer = Paragraph::new(view.footer.clone()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, rows[3]);
}

fn draw_kpis(frame: &mut ratatui::Frame<'_>, area: Rect, view: &DashboardView) {
    let n = view.kpis.len().max(1) as u32;
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, n); view.kpis.len()])
        .split(area);

    for (kpi, cell) in view.kpis.iter().zip(cells.iter()) {
        let p = Paragraph::new(Line::from(Span::styled(
            kpi.value.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(Span::styled(kpi.label.clone(), Style::default().fg(Color::Gray)))
                .borders(Borders::ALL),
        );
        frame.render_widget(p, *cell);
    }
}

fn draw_time_chart(frame: &mut ratatui::Frame<'_>, area: Rect, chart: &TimeChart, fmt_y: fn(f64) -> String) {
    let lines: Vec<ChartLine> = chart
        .series
        .iter()
        .zip(PALETTE.iter().cycle())
        .map(|(series, &color)| ChartLine {
            points: series.points.iter().map(|(d, v)| (day_x(*d), *v)).collect(),
            color,
        })
        .collect();

    let mut title = vec![Span::raw(format!("{} ", chart.title))];
    if chart.series.len() > 1 {
        for (series, &color) in chart.series.iter().zip(PALETTE.iter().cycle()) {
            title.push(Span::styled(format!("■ {} ", series.label), Style::default().fg(tui_color(color))));
        }
    }

    let block = Block::default().title(Line::from(title)).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let all = || lines.iter().flat_map(|l| l.points.iter());
    let (Some(x_bounds), Some(y_bounds)) = (bounds(all().map(|p| p.0), 0.0), bounds(all().map(|p| p.1), 0.05)) else {
        draw_message(frame, inner, "— (not enough history for this window)", Color::Yellow);
        return;
    };

    frame.render_widget(
        DashPlottersChart {
            lines: &lines,
            points: &[],
            point_color: DOT_COLOR,
            x_bounds,
            y_bounds,
            x_label: "Date",
            y_label: &chart.y_label,
            fmt_x: fmt_day,
            fmt_y,
        },
        inner,
    );
}

fn draw_scatter(frame: &mut ratatui::Frame<'_>, area: Rect, chart: &ScatterChart) {
    let block = Block::default().title(chart.title.clone()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let Some(x_bounds) = bounds(chart.points.iter().map(|p| p.0), 0.05) else {
        draw_message(frame, inner, "— (no observations)", Color::Yellow);
        return;
    };
    let fit_line: Vec<ChartLine> = chart
        .fit
        .iter()
        .map(|fit| ChartLine {
            points: vec![
                (x_bounds[0], fit.predict(x_bounds[0])),
                (x_bounds[1], fit.predict(x_bounds[1])),
            ],
            color: FIT_COLOR,
        })
        .collect();
    let Some(y_bounds) = bounds(chart.points.iter().map(|p| p.1), 0.05) else {
        return;
    };

    frame.render_widget(
        DashPlottersChart {
            lines: &fit_line,
            points: &chart.points,
            point_color: DOT_COLOR,
            x_bounds,
            y_bounds,
            x_label: &chart.x_label,
            y_label: &chart.y_label,
            fmt_x: fmt_percent,
            fmt_y: fmt_percent,
        },
        inner,
    );
}

/// Finite `[min, max]` padded by `pad` of its width; a flat range gets unit width.
fn bounds(values: impl Iterator<Item = f64>, pad: f64) -> Option<[f64; 2]> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    if hi <= lo {
        let half = lo.abs().max(1.0) * 0.05;
        return Some([lo - half, hi + half]);
    }
    let margin = ((hi - lo) * pad).max(1e-12);
    Some([lo - margin, hi + margin])
}

fn day_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    f64::from(date.num_days_from_ce())
}

fn fmt_day(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%y-%m").to_string())
        .unwrap_or_default()
}

fn fmt_ratio(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_percent(v: f64) -> String {
    format!("{:.0}%", v * 100.0)
}
