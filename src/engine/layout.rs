//! Grid layout planning: how many columns and rows a set of panels gets and
//! what share of the screen each cell spans.

#![allow(missing_docs)]

use crate::surface::{GridRow, GridSpec, Palette, PanelId, PanelSpec};

/// Panels shown at most, regardless of how many entities a source reports.
pub const DEFAULT_ON_SCREEN_CAP: usize = 12;

/// Columns used when neither the source nor the config says otherwise.
pub const DEFAULT_MAX_COLUMNS: usize = 3;

const A_HUNDRED: f64 = 100.0;

/// Row/column partition for a fixed number of panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutPlan {
    pub columns: usize,
    pub rows: usize,
    pub col_percent: u16,
    pub row_percent: u16,
}

impl LayoutPlan {
    /// True when there is nothing to lay out.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns == 0
    }

    /// Total cells in the grid (the last row may be partially filled).
    #[must_use]
    pub const fn cells(&self) -> usize {
        self.columns * self.rows
    }
}

/// Partition `entity_count` panels into at most `max_columns` columns.
///
/// Up to `max_columns` panels share a single row; beyond that every row is
/// full width and the rows needed are rounded up. Zero entities give an
/// empty plan the caller has to handle. A `max_columns` of zero is treated as
/// one.
#[must_use]
pub fn plan(max_columns: usize, entity_count: usize) -> LayoutPlan {
    let max_columns = max_columns.max(1);
    if entity_count == 0 {
        return LayoutPlan {
            columns: 0,
            rows: 0,
            col_percent: 0,
            row_percent: 0,
        };
    }

    let (columns, rows) = if entity_count <= max_columns {
        (entity_count, 1)
    } else {
        (max_columns, entity_count.div_ceil(max_columns))
    };

    LayoutPlan {
        columns,
        rows,
        col_percent: percent(1, columns),
        row_percent: percent(1, rows),
    }
}

/// `x` as a percentage of `y`, rounded, minus one point of headroom so the
/// cells never add up to more than the container.
#[must_use]
pub fn percent(x: usize, y: usize) -> u16 {
    if y == 0 {
        return 0;
    }
    let p = (x as f64 / y as f64 * A_HUNDRED).round() - 1.0;
    p.clamp(0.0, A_HUNDRED) as u16
}

/// How many of `entity_count` entities get a panel.
#[must_use]
pub fn visible_count(entity_count: usize, on_screen_cap: usize) -> usize {
    entity_count.min(on_screen_cap)
}

/// Lay out `panels` (id and border title, in assignment order) row by row.
#[must_use]
pub fn assemble_grid(plan: &LayoutPlan, panels: &[(PanelId, String)], title: &str) -> GridSpec {
    let rows = if plan.is_empty() {
        Vec::new()
    } else {
        panels
            .chunks(plan.columns)
            .map(|chunk| GridRow {
                height_percent: plan.row_percent,
                cells: chunk
                    .iter()
                    .map(|(id, cell_title)| PanelSpec {
                        id: *id,
                        title: cell_title.clone(),
                        width_percent: plan.col_percent,
                        border: Palette::Cyan,
                    })
                    .collect(),
            })
            .collect()
    };

    GridSpec {
        title: title.to_string(),
        rows,
    }
}
