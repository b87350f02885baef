//! Braille line chart rasterizer.
//!
//! Turns a [`SeriesUpdate`] into a grid of glyphs for a `width × height`
//! cell area: a y-axis labelled 0/50/100, an x-axis with time labels, and
//! one line per series plotted with 2×4 braille dots per cell. The y range is
//! fixed at `0..=100`; values outside it are clamped.
//!
//! Pure: no terminal I/O, so layouts and dot placement are unit-testable.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::surface::{Palette, SeriesUpdate};

pub const Y_MIN: f64 = 0.0;
pub const Y_MAX: f64 = 100.0;

/// Columns reserved for y-axis labels ("100").
const Y_LABEL_WIDTH: usize = 3;

/// Smallest area worth drawing into: label column, axis, two plot cells;
/// one plot row plus the x-axis and its labels.
pub const MIN_WIDTH: usize = Y_LABEL_WIDTH + 3;
pub const MIN_HEIGHT: usize = 3;

pub const AXIS_COLOR: Palette = Palette::Red;
pub const LABEL_COLOR: Palette = Palette::Green;

const BRAILLE_BASE: u32 = 0x2800;

/// Dot bit for `[row][column]` within one braille cell.
const DOT_BITS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

// ──────────────────── frame ────────────────────

/// One screen cell of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub color: Option<Palette>,
}

impl Glyph {
    const BLANK: Self = Self {
        ch: ' ',
        color: None,
    };
}

/// Rendered chart, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFrame {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl ChartFrame {
    fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Glyph::BLANK; width * height],
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn row(&self, y: usize) -> &[Glyph] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    /// Row `y` as plain text, colors dropped.
    #[must_use]
    pub fn text_row(&self, y: usize) -> String {
        self.row(y).iter().map(|g| g.ch).collect()
    }

    fn set(&mut self, x: usize, y: usize, glyph: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = glyph;
        }
    }

    fn put_str(&mut self, x: usize, y: usize, text: &str, color: Palette) {
        for (i, ch) in text.chars().enumerate() {
            self.set(
                x + i,
                y,
                Glyph {
                    ch,
                    color: Some(color),
                },
            );
        }
    }
}

// ──────────────────── rendering ────────────────────

/// Rasterize `update` into a `width × height` area.
///
/// Areas smaller than [`MIN_WIDTH`] × [`MIN_HEIGHT`] come back blank.
#[must_use]
pub fn render(update: &SeriesUpdate, width: usize, height: usize) -> ChartFrame {
    let mut frame = ChartFrame::blank(width, height);
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return frame;
    }

    let plot_x = Y_LABEL_WIDTH + 1;
    let plot_w = width - plot_x;
    let plot_h = height - 2;
    let axis_row = plot_h;
    let label_row = plot_h + 1;

    draw_axes(&mut frame, plot_h, axis_row);
    draw_y_labels(&mut frame, plot_h);

    let mut dots = DotCanvas::new(plot_w, plot_h);
    let longest = update
        .series
        .iter()
        .map(|s| s.values.len())
        .max()
        .unwrap_or(0);
    for series in &update.series {
        dots.plot(&series.values, longest, series.color);
    }
    for (cx, cy, glyph) in dots.glyphs() {
        frame.set(plot_x + cx, cy, glyph);
    }

    draw_x_labels(&mut frame, update, plot_x, plot_w, longest, label_row);
    frame
}

fn draw_axes(frame: &mut ChartFrame, plot_h: usize, axis_row: usize) {
    let axis = Some(AXIS_COLOR);
    for y in 0..plot_h {
        frame.set(Y_LABEL_WIDTH, y, Glyph { ch: '│', color: axis });
    }
    frame.set(Y_LABEL_WIDTH, axis_row, Glyph { ch: '└', color: axis });
    for x in Y_LABEL_WIDTH + 1..frame.width {
        frame.set(x, axis_row, Glyph { ch: '─', color: axis });
    }
}

fn draw_y_labels(frame: &mut ChartFrame, plot_h: usize) {
    let mut marks = vec![(0, Y_MAX), (plot_h - 1, Y_MIN)];
    if plot_h >= 3 {
        marks.push(((plot_h - 1) / 2, (Y_MAX + Y_MIN) / 2.0));
    }
    for (row, value) in marks {
        let label = format!("{value:>w$.0}", w = Y_LABEL_WIDTH);
        frame.put_str(0, row, &label, LABEL_COLOR);
    }
}

/// Place each label under its sample, left to right, skipping any that would
/// overlap the previous one or run past the right edge.
fn draw_x_labels(
    frame: &mut ChartFrame,
    update: &SeriesUpdate,
    plot_x: usize,
    plot_w: usize,
    points: usize,
    row: usize,
) {
    let dot_w = plot_w * 2;
    let mut next_free = plot_x;
    for (&pos, label) in &update.x_labels {
        if pos >= points {
            continue;
        }
        let col = plot_x + dot_x(pos, points, dot_w) / 2;
        let len = label.chars().count();
        if col < next_free || col + len > frame.width {
            continue;
        }
        frame.put_str(col, row, label, LABEL_COLOR);
        next_free = col + len + 1;
    }
}

/// Horizontal dot for sample `i` of `n`, spread evenly across `dot_w` dots.
fn dot_x(i: usize, n: usize, dot_w: usize) -> usize {
    if n <= 1 || dot_w <= 1 {
        return 0;
    }
    ((i as f64 * (dot_w - 1) as f64 / (n - 1) as f64).round() as usize).min(dot_w - 1)
}

/// Vertical dot for `value`, row 0 at the top.
fn dot_y(value: f64, dot_h: usize) -> usize {
    let norm = (value.clamp(Y_MIN, Y_MAX) - Y_MIN) / (Y_MAX - Y_MIN);
    (((1.0 - norm) * (dot_h - 1) as f64).round() as usize).min(dot_h - 1)
}

// ──────────────────── dot canvas ────────────────────

struct DotCanvas {
    cols: usize,
    rows: usize,
    bits: Vec<u8>,
    colors: Vec<Option<Palette>>,
}

impl DotCanvas {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            bits: vec![0; cols * rows],
            colors: vec![None; cols * rows],
        }
    }

    /// Plot one series as connected segments. Non-finite values break the line.
    fn plot(&mut self, values: &[f64], points: usize, color: Palette) {
        let dot_w = self.cols * 2;
        let dot_h = self.rows * 4;
        let mut prev: Option<(usize, usize)> = None;
        for (i, value) in values.iter().enumerate() {
            if !value.is_finite() {
                prev = None;
                continue;
            }
            let here = (dot_x(i, points, dot_w), dot_y(*value, dot_h));
            match prev {
                Some(from) => self.line(from, here, color),
                None => self.dot(here.0, here.1, color),
            }
            prev = Some(here);
        }
    }

    fn dot(&mut self, x: usize, y: usize, color: Palette) {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.cols || cy >= self.rows {
            return;
        }
        let idx = cy * self.cols + cx;
        self.bits[idx] |= DOT_BITS[y % 4][x % 2];
        self.colors[idx] = Some(color);
    }

    /// Bresenham between two dots, both ends inclusive.
    fn line(&mut self, from: (usize, usize), to: (usize, usize), color: Palette) {
        let (x0, y0) = (from.0 as isize, from.1 as isize);
        let (x1, y1) = (to.0 as isize, to.1 as isize);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.dot(x as usize, y as usize, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Non-empty cells as `(column, row, glyph)`.
    fn glyphs(&self) -> impl Iterator<Item = (usize, usize, Glyph)> + '_ {
        self.bits.iter().enumerate().filter_map(|(idx, &bits)| {
            if bits == 0 {
                return None;
            }
            let ch = char::from_u32(BRAILLE_BASE + u32::from(bits))?;
            Some((
                idx % self.cols,
                idx / self.cols,
                Glyph {
                    ch,
                    color: self.colors[idx],
                },
            ))
        })
    }
}
