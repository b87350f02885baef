//! Crossterm drawing surface: raw mode, alternate screen, bordered panels
//! with braille line charts.
//!
//! The screen is repainted from scratch on every redraw; the grid percentages
//! are resolved against the terminal size at that moment, so resizes take
//! effect on the next frame. Keyboard events are read on a background thread
//! that cancels the session token on Esc, `q` or Ctrl-C.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::core::errors::{KloadError, Result};
use crate::engine::cancel::CancelToken;
use crate::surface::chart::{self, ChartFrame};
use crate::surface::{DrawingSurface, GridSpec, Palette, PanelId, PanelSpec, SeriesUpdate};

/// How long the key thread blocks in `event::poll` before rechecking its stop flag.
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

const ROOT_BORDER: Palette = Palette::Cyan;

// ──────────────────── geometry ────────────────────

/// Screen rectangle in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area left inside a one-cell border.
    #[must_use]
    pub const fn inner(&self) -> Self {
        Self {
            x: self.x + 1,
            y: self.y + 1,
            width: self.width.saturating_sub(2),
            height: self.height.saturating_sub(2),
        }
    }
}

fn share(total: u16, percent: u16) -> u16 {
    (u32::from(total) * u32::from(percent.min(100)) / 100) as u16
}

/// Resolve every cell of `grid` to a rectangle inside `area`, row by row.
#[must_use]
pub fn panel_rects<'a>(grid: &'a GridSpec, area: Rect) -> Vec<(&'a PanelSpec, Rect)> {
    let mut out = Vec::with_capacity(grid.panel_count());
    let mut y = area.y;
    for row in &grid.rows {
        let height = share(area.height, row.height_percent);
        let mut x = area.x;
        for cell in &row.cells {
            let width = share(area.width, cell.width_percent);
            out.push((cell, Rect::new(x, y, width, height)));
            x = x.saturating_add(width);
        }
        y = y.saturating_add(height);
    }
    out
}

const fn color(p: Palette) -> Color {
    match p {
        Palette::Yellow => Color::Yellow,
        Palette::Red => Color::Red,
        Palette::Cyan => Color::Cyan,
        Palette::Green => Color::Green,
        Palette::White => Color::White,
        Palette::DarkGrey => Color::DarkGrey,
    }
}

/// Esc, `q` or Ctrl-C.
#[must_use]
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

// ──────────────────── keyboard thread ────────────────────

struct KeyListener {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl KeyListener {
    fn spawn(cancel: CancelToken) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("kload-keys".to_string())
            .spawn(move || {
                while !thread_stop.load(Ordering::SeqCst) {
                    match event::poll(KEY_POLL_INTERVAL) {
                        Ok(true) => {
                            if let Ok(Event::Key(key)) = event::read()
                                && is_quit_key(&key)
                            {
                                cancel.cancel();
                            }
                        }
                        Ok(false) => {}
                        Err(_) => break,
                    }
                }
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

// ──────────────────── surface ────────────────────

/// Full-screen terminal surface.
#[derive(Default)]
pub struct TerminalSurface {
    grid: Option<GridSpec>,
    series: HashMap<PanelId, SeriesUpdate>,
    raw: bool,
    keys: Option<KeyListener>,
}

impl TerminalSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        self.raw = true;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        let mut stdout = io::stdout();
        let left = execute!(stdout, ResetColor, Show, LeaveAlternateScreen);
        terminal::disable_raw_mode()?;
        left
    }

    fn paint(&self) -> io::Result<()> {
        let Some(grid) = &self.grid else {
            return Err(io::Error::other("surface not built"));
        };
        let (cols, rows) = terminal::size()?;
        let screen = Rect::new(0, 0, cols, rows);

        let mut out = io::stdout().lock();
        queue!(out, Clear(ClearType::All))?;
        draw_box(&mut out, screen, &grid.title, ROOT_BORDER)?;
        for (spec, rect) in panel_rects(grid, screen.inner()) {
            draw_box(&mut out, rect, &spec.title, spec.border)?;
            if let Some(update) = self.series.get(&spec.id) {
                let area = rect.inner();
                let frame = chart::render(update, usize::from(area.width), usize::from(area.height));
                blit(&mut out, area, &frame)?;
            }
        }
        queue!(out, ResetColor)?;
        out.flush()
    }
}

impl DrawingSurface for TerminalSurface {
    fn build(&mut self, grid: &GridSpec) -> Result<()> {
        if grid.panel_count() == 0 {
            return Err(KloadError::SurfaceConstruction {
                details: "grid has no panels".to_string(),
            });
        }
        if let Err(e) = self.enter() {
            let _ = self.restore();
            return Err(KloadError::SurfaceConstruction {
                details: format!("terminal setup failed: {e}"),
            });
        }
        self.grid = Some(grid.clone());
        self.series.clear();
        Ok(())
    }

    fn subscribe_keys(&mut self, cancel: CancelToken) -> Result<()> {
        if self.keys.is_some() {
            return Ok(());
        }
        let listener = KeyListener::spawn(cancel).map_err(|e| KloadError::Surface {
            details: format!("cannot start keyboard thread: {e}"),
        })?;
        self.keys = Some(listener);
        Ok(())
    }

    fn push_series(&mut self, panel: PanelId, update: SeriesUpdate) -> Result<()> {
        let known = self
            .grid
            .as_ref()
            .is_some_and(|g| g.panels().any(|p| p.id == panel));
        if !known {
            return Err(KloadError::Surface {
                details: format!("no panel with id {}", panel.0),
            });
        }
        self.series.insert(panel, update);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        self.paint().map_err(|e| KloadError::Redraw {
            details: e.to_string(),
        })
    }

    fn release(&mut self) -> Result<()> {
        if let Some(keys) = self.keys.take() {
            keys.stop();
        }
        self.restore().map_err(|e| KloadError::Surface {
            details: format!("terminal restore failed: {e}"),
        })
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

// ──────────────────── drawing ────────────────────

/// Single-line box with `title` embedded in the top edge.
fn draw_box<W: Write>(out: &mut W, rect: Rect, title: &str, border: Palette) -> io::Result<()> {
    if rect.width < 2 || rect.height < 2 {
        return Ok(());
    }
    let inner_w = usize::from(rect.width - 2);
    let title: String = title.chars().take(inner_w.saturating_sub(2)).collect();
    let top = if title.is_empty() {
        "─".repeat(inner_w)
    } else {
        let used = title.chars().count() + 2;
        format!(" {title} {}", "─".repeat(inner_w.saturating_sub(used)))
    };

    queue!(out, SetForegroundColor(color(border)), MoveTo(rect.x, rect.y))?;
    write!(out, "┌{top}┐")?;
    for dy in 1..rect.height - 1 {
        queue!(out, MoveTo(rect.x, rect.y + dy))?;
        write!(out, "│")?;
        queue!(out, MoveTo(rect.x + rect.width - 1, rect.y + dy))?;
        write!(out, "│")?;
    }
    queue!(out, MoveTo(rect.x, rect.y + rect.height - 1))?;
    write!(out, "└{}┘", "─".repeat(inner_w))?;
    queue!(out, ResetColor)?;
    Ok(())
}

/// Copy a rendered chart into `area`, switching colors only when they change.
fn blit<W: Write>(out: &mut W, area: Rect, frame: &ChartFrame) -> io::Result<()> {
    for y in 0..frame.height() {
        queue!(out, MoveTo(area.x, area.y + y as u16), ResetColor)?;
        let mut current: Option<Palette> = None;
        for glyph in frame.row(y) {
            if glyph.color != current {
                match glyph.color {
                    Some(p) => queue!(out, SetForegroundColor(color(p)))?,
                    None => queue!(out, ResetColor)?,
                }
                current = glyph.color;
            }
            write!(out, "{}", glyph.ch)?;
        }
    }
    Ok(())
}
