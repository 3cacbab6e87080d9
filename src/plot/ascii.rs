//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - time series: one glyph per series (`*`, `+`, `o`, `#`), joined by lines
//! - scatter: observed pairs `o` over the fitted regression line `-`

use chrono::NaiveDate;

use crate::report::{ScatterChart, TimeChart, UNAVAILABLE};

/// Glyphs assigned to time series in order.
const SERIES_GLYPHS: [char; 4] = ['*', '+', 'o', '#'];

struct Layer {
    label: String,
    glyph: char,
    connect: bool,
    points: Vec<(f64, f64)>,
}

/// Render a multi-series, date-indexed chart.
pub fn render_time_chart(chart: &TimeChart, width: usize, height: usize) -> String {
    let layers: Vec<Layer> = chart
        .series
        .iter()
        .zip(SERIES_GLYPHS.iter().cycle())
        .map(|(series, &glyph)| Layer {
            label: series.label.clone(),
            glyph,
            connect: true,
            points: series.points.iter().map(|(d, v)| (day_x(*d), *v)).collect(),
        })
        .collect();

    let dates = chart.series.iter().flat_map(|s| s.points.iter().map(|(d, _)| *d));
    let (first, last) = dates.fold((None::<NaiveDate>, None::<NaiveDate>), |(lo, hi), d| {
        (Some(lo.map_or(d, |x| x.min(d))), Some(hi.map_or(d, |x| x.max(d))))
    });
    let (Some(first), Some(last)) = (first, last) else {
        return format!("{}\n{UNAVAILABLE} (no defined values)\n", chart.title);
    };

    let header = |y_min: f64, y_max: f64| {
        format!(
            "{}\n{}: [{y_min:.4}, {y_max:.4}] | {first} .. {last}\n",
            chart.title, chart.y_label
        )
    };
    render_layers(&layers, width, height, header)
}

/// Render paired returns with the fitted line (when the regression is defined).
pub fn render_scatter(chart: &ScatterChart, width: usize, height: usize) -> String {
    let points: Vec<(f64, f64)> = chart
        .points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let Some((x_min, x_max)) = range(points.iter().map(|p| p.0)) else {
        return format!("{}\n{UNAVAILABLE} (no observations)\n", chart.title);
    };

    let mut layers = Vec::with_capacity(2);
    if let Some(fit) = &chart.fit {
        let n = width.max(2);
        let line = (0..n)
            .map(|i| {
                let u = i as f64 / (n as f64 - 1.0);
                let x = x_min + u * (x_max - x_min);
                (x, fit.predict(x))
            })
            .collect();
        layers.push(Layer {
            label: "OLS fit".to_string(),
            glyph: '-',
            connect: true,
            points: line,
        });
    }
    layers.push(Layer {
        label: "daily returns".to_string(),
        glyph: 'o',
        connect: false,
        points,
    });

    let header = |y_min: f64, y_max: f64| {
        format!(
            "{}\nx={}: [{x_min:.4}, {x_max:.4}] | y={}: [{y_min:.4}, {y_max:.4}]\n",
            chart.title, chart.x_label, chart.y_label
        )
    };
    render_layers(&layers, width, height, header)
}

fn render_layers(
    layers: &[Layer],
    width: usize,
    height: usize,
    header: impl Fn(f64, f64) -> String,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = || layers.iter().flat_map(|l| l.points.iter());
    let (x_min, x_max) = widen(range(all().map(|p| p.0)).unwrap_or((0.0, 1.0)));
    let (y_min, y_max) = range(all().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first (so points can overlay).
    for layer in layers.iter().filter(|l| l.connect) {
        draw_curve(&mut grid, layer, x_min, x_max, y_min, y_max);
    }
    for layer in layers.iter().filter(|l| !l.connect) {
        for &(x, y) in &layer.points {
            let col = map_x(x, x_min, x_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][col] = layer.glyph;
        }
    }

    let mut out = header(y_min, y_max);
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    let legend: Vec<String> = layers.iter().map(|l| format!("{} {}", l.glyph, l.label)).collect();
    out.push_str(&legend.join("   "));
    out.push('\n');
    out
}

fn day_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    f64::from(date.num_days_from_ce())
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

/// Give a degenerate (single-valued) range some width.
fn widen((min, max): (f64, f64)) -> (f64, f64) {
    if max > min { (min, max) } else { (min - 1.0, max + 1.0) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], layer: &Layer, x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in layer.points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, layer.glyph);
        } else if grid[row][col] == ' ' {
            grid[row][col] = layer.glyph;
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::RegressionFit;
    use crate::report::TimeSeries;

    #[test]
    fn scatter_golden_snapshot_small() {
        let chart = ScatterChart {
            title: "Fit".to_string(),
            x_label: "C".to_string(),
            y_label: "T".to_string(),
            points: vec![(0.0, 0.0), (1.0, 1.0)],
            fit: Some(RegressionFit {
                beta: 1.0,
                intercept: 0.0,
                r_squared: Some(1.0),
                n_obs: 2,
            }),
        };

        let txt = render_scatter(&chart, 10, 5);
        let expected = concat!(
            "Fit\n",
            "x=C: [0.0000, 1.0000] | y=T: [-0.0500, 1.0500]\n",
            "         o\n",
            "      ---\n",
            "    --\n",
            " ---\n",
            "o\n",
            "- OLS fit   o daily returns\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn time_chart_draws_each_series_with_its_glyph() {
        let d = |day: u32| NaiveDate::from_ymd_opt(2025, 1, day).unwrap();
        let chart = TimeChart {
            title: "Growth".to_string(),
            y_label: "Growth of $1".to_string(),
            series: vec![
                TimeSeries {
                    label: "A".to_string(),
                    points: vec![(d(1), 1.0), (d(2), 1.0), (d(3), 1.0)],
                },
                TimeSeries {
                    label: "B".to_string(),
                    points: vec![(d(1), 2.0), (d(2), 2.0), (d(3), 2.0)],
                },
            ],
        };

        let txt = render_time_chart(&chart, 12, 6);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Growth");
        assert!(lines[1].ends_with("2025-01-01 .. 2025-01-03"));
        // B is the top row, A the bottom row, both full width.
        assert_eq!(lines[2], "++++++++++++");
        assert_eq!(lines[7], "************");
        assert_eq!(lines[8], "* A   + B");
    }

    #[test]
    fn empty_chart_shows_placeholder() {
        let chart = TimeChart {
            title: "Relationship".to_string(),
            y_label: "Correlation".to_string(),
            series: vec![TimeSeries {
                label: "x".to_string(),
                points: Vec::new(),
            }],
        };
        assert_eq!(render_time_chart(&chart, 20, 5), "Relationship\n— (no defined values)\n");
    }
}
