//! Entity name → panel binding, fixed once the initial layout is built.
//!
//! Entities that first appear after the initial snapshot never get a panel:
//! their history is still recorded, but pushes for them are no-ops.

#![allow(missing_docs)]

use std::collections::HashMap;

use crate::core::errors::Result;
use crate::engine::window::SeriesHistory;
use crate::source::{Dimensions, Entity};
use crate::surface::{DrawingSurface, Palette, PanelId, SeriesData, SeriesUpdate};

/// Color of the first dimension's line.
pub const SERIES_A_COLOR: Palette = Palette::Yellow;
/// Color of the second dimension's line.
pub const SERIES_B_COLOR: Palette = Palette::Red;

/// One bound panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelBinding {
    pub id: PanelId,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct PanelRegistry {
    panels: Vec<PanelBinding>,
    by_name: HashMap<String, PanelId>,
    dimensions: Dimensions,
}

impl PanelRegistry {
    #[must_use]
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            panels: Vec::new(),
            by_name: HashMap::new(),
            dimensions,
        }
    }

    /// Bind every entity of the initial snapshot, in snapshot order.
    #[must_use]
    pub fn from_snapshot(entities: &[Entity], dimensions: Dimensions) -> Self {
        let mut registry = Self::new(dimensions);
        for entity in entities {
            let title = registry.dimensions.panel_title(entity);
            registry.bind(&entity.name, title);
        }
        registry
    }

    /// Panel for `name`, creating it on first call. Later calls return the
    /// existing panel and ignore `title`.
    pub fn bind(&mut self, name: &str, title: String) -> PanelId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = PanelId(self.panels.len());
        self.panels.push(PanelBinding {
            id,
            name: name.to_string(),
            title,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<PanelId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn panels(&self) -> &[PanelBinding] {
        &self.panels
    }

    /// `(id, title)` pairs in assignment order, ready for grid assembly.
    #[must_use]
    pub fn cells(&self) -> Vec<(PanelId, String)> {
        self.panels
            .iter()
            .map(|p| (p.id, p.title.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    #[must_use]
    pub const fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Forward `history` to the panel bound to `name`.
    ///
    /// Returns `Ok(false)` without touching the surface when `name` has no panel.
    pub fn push<D>(&self, surface: &mut D, name: &str, history: &SeriesHistory) -> Result<bool>
    where
        D: DrawingSurface + ?Sized,
    {
        let Some(id) = self.get(name) else {
            return Ok(false);
        };
        surface.push_series(id, self.series_update(name, history))?;
        Ok(true)
    }

    fn series_update(&self, name: &str, history: &SeriesHistory) -> SeriesUpdate {
        SeriesUpdate {
            series: vec![
                SeriesData {
                    name: format!("{name}{}", self.dimensions.a.name.to_lowercase()),
                    values: history.samples_a(),
                    color: SERIES_A_COLOR,
                },
                SeriesData {
                    name: format!("{name}{}", self.dimensions.b.name.to_lowercase()),
                    values: history.samples_b(),
                    color: SERIES_B_COLOR,
                },
            ],
            x_labels: history.labels().clone(),
        }
    }
}
