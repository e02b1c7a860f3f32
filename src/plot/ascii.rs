//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: one glyph per cluster assignment (`o`, `x`, `+`, ...)
//! - optional fitted curve: `-` line
//!
//! The plot does not compute clusters; it consumes a precomputed assignment
//! per point (the batch front-end assigns by dataset).

use crate::domain::FitParams;
use crate::model::norm_capacity;

/// Glyphs used for cluster assignments, cycled when clusters outnumber them.
pub const CLUSTER_GLYPHS: &[char] = &['o', 'x', '+', '*', '#', '%', '@', '&'];

/// Render clustered (rate, capacity) points.
///
/// `assignment[i]` selects the glyph for `points[i]`; both slices must have
/// equal length (extra points fall back to the first glyph).
pub fn render_clustered_points(
    points: &[(f64, f64)],
    assignment: &[usize],
    width: usize,
    height: usize,
) -> String {
    render_plot(points, assignment, None, width, height)
}

/// Render a single dataset's points together with its fitted model curve.
pub fn render_fit_plot(
    rates: &[f64],
    capacities: &[f64],
    params: &FitParams,
    width: usize,
    height: usize,
) -> String {
    let points: Vec<(f64, f64)> = rates
        .iter()
        .zip(capacities.iter())
        .map(|(&r, &c)| (r, c))
        .collect();
    let assignment = vec![0; points.len()];
    render_plot(&points, &assignment, Some(params), width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    assignment: &[usize],
    curve: Option<&FitParams>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((x_min, x_max)) = value_range(points.iter().map(|p| p.0)) else {
        return "Plot: no points to draw.\n".to_string();
    };
    let (y_min, y_max) = value_range(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw the curve first so points can overlay it.
    if let Some(params) = curve {
        let samples = sample_curve(params, x_min, x_max, width.max(2));
        draw_curve(&mut grid, &samples, x_min, x_max, y_min, y_max);
    }

    for (i, &(x, y)) in points.iter().enumerate() {
        let cluster = assignment.get(i).copied().unwrap_or(0);
        let ch = CLUSTER_GLYPHS[cluster % CLUSTER_GLYPHS.len()];
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = ch;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: rate=[{x_min:.3}, {x_max:.3}] C | capacity=[{y_min:.2}, {y_max:.2}] mAh/g\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn value_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in values {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v.is_finite() && max_v.is_finite() && max_v > min_v {
        Some((min_v, max_v))
    } else {
        None
    }
}

fn sample_curve(params: &FitParams, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let x = x_min + u * (x_max - x_min);
        out.push((x, norm_capacity(x, params)));
    }
    out
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
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

    #[test]
    fn clustered_plot_golden_snapshot_small() {
        let points = [(0.5, 90.0), (5.0, 20.0), (0.5, 60.0), (5.0, 40.0)];
        let assignment = [0, 0, 1, 1];
        let txt = render_clustered_points(&points, &assignment, 10, 5);
        let expected = concat!(
            "Plot: rate=[0.500, 5.000] C | capacity=[16.50, 93.50] mAh/g\n",
            "o         \n",
            "          \n",
            "x         \n",
            "         x\n",
            "         o\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_input_renders_a_placeholder() {
        let txt = render_clustered_points(&[], &[], 10, 5);
        assert!(txt.contains("no points"));
    }

    #[test]
    fn fit_plot_contains_curve_and_points() {
        let params = FitParams {
            tau: 0.5,
            n: 1.0,
            q: 100.0,
        };
        let rates = [0.1, 0.5, 1.0, 2.0, 5.0];
        let capacities: Vec<f64> = rates.iter().map(|&r| norm_capacity(r, &params)).collect();
        let txt = render_fit_plot(&rates, &capacities, &params, 40, 12);
        assert!(txt.contains('-'));
        assert!(txt.contains('o'));
    }
}
