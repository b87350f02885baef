//! Drawing surface contract consumed by the render/poll loop.
//!
//! The engine describes the screen declaratively (a [`GridSpec`] of rows and
//! cells with percentage spans), pushes series data into panels by
//! [`PanelId`], and asks for redraws. Widget internals stay on the surface
//! side; the engine never reads anything back.

#![allow(missing_docs)]

pub mod chart;
pub mod memory;
#[cfg(feature = "tui")]
pub mod terminal;

use std::collections::BTreeMap;

use crate::core::errors::Result;
use crate::engine::cancel::CancelToken;

/// Colors the engine may ask for. Surfaces map them onto whatever their
/// backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
    Yellow,
    Red,
    Cyan,
    Green,
    White,
    DarkGrey,
}

/// Handle to a panel widget owned by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(pub usize);

/// One bordered cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSpec {
    pub id: PanelId,
    pub title: String,
    pub width_percent: u16,
    pub border: Palette,
}

/// One row of cells sharing a height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub height_percent: u16,
    pub cells: Vec<PanelSpec>,
}

/// Declarative description of the whole screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSpec {
    pub title: String,
    pub rows: Vec<GridRow>,
}

impl GridSpec {
    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).sum()
    }

    pub fn panels(&self) -> impl Iterator<Item = &PanelSpec> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }
}

/// A named numeric series with its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    pub name: String,
    pub values: Vec<f64>,
    pub color: Palette,
}

/// Everything pushed into a panel on one tick: its series plus the x-axis
/// labels keyed by sample position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeriesUpdate {
    pub series: Vec<SeriesData>,
    pub x_labels: BTreeMap<usize, String>,
}

/// Backend the render/poll loop draws onto.
///
/// Error contract: `build` fails with `SurfaceConstruction`, `redraw` with
/// `Redraw`, everything else with `Surface`. `release` must be safe to call
/// on a surface that was never built.
pub trait DrawingSurface {
    /// Create the container tree and one widget per cell.
    fn build(&mut self, grid: &GridSpec) -> Result<()>;

    /// Start delivering keyboard events; quit keys cancel `cancel`.
    fn subscribe_keys(&mut self, cancel: CancelToken) -> Result<()>;

    /// Replace the series shown by one panel.
    fn push_series(&mut self, panel: PanelId, update: SeriesUpdate) -> Result<()>;

    /// Paint the current widget tree.
    fn redraw(&mut self) -> Result<()>;

    /// Tear down and give the terminal back.
    fn release(&mut self) -> Result<()>;
}
