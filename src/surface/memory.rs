//! In-memory drawing surface.
//!
//! Records every call so tests can assert on what the render/poll loop did,
//! and can simulate the user pressing a quit key after a given number of
//! redraws or inject build/redraw failures.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::errors::{KloadError, Result};
use crate::engine::cancel::CancelToken;
use crate::surface::{DrawingSurface, GridSpec, PanelId, SeriesUpdate};

/// One recorded surface call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceCall {
    Build,
    SubscribeKeys,
    Push(PanelId),
    Redraw,
    Release,
}

#[derive(Debug, Default)]
struct MemoryState {
    grid: Option<GridSpec>,
    latest: HashMap<PanelId, SeriesUpdate>,
    calls: Vec<SurfaceCall>,
    redraws: usize,
    pushes: usize,
    released: bool,
    cancel: Option<CancelToken>,
    cancel_after_redraws: Option<usize>,
    fail_build: bool,
    fail_redraw_at: Option<usize>,
}

/// Surface that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryState>>,
}

/// Read-only view onto a [`MemorySurface`] that outlives the session owning it.
#[derive(Debug, Clone)]
pub struct MemorySurfaceHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the subscribed token when the `n`th redraw happens, as if the
    /// user hit Esc while that frame was on screen.
    #[must_use]
    pub fn cancel_after_redraws(self, n: usize) -> Self {
        self.state.lock().cancel_after_redraws = Some(n);
        self
    }

    /// Make `build` fail.
    #[must_use]
    pub fn failing_build(self) -> Self {
        self.state.lock().fail_build = true;
        self
    }

    /// Make the `n`th redraw fail.
    #[must_use]
    pub fn failing_redraw_at(self, n: usize) -> Self {
        self.state.lock().fail_redraw_at = Some(n);
        self
    }

    #[must_use]
    pub fn handle(&self) -> MemorySurfaceHandle {
        MemorySurfaceHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl DrawingSurface for MemorySurface {
    fn build(&mut self, grid: &GridSpec) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Build);
        if state.fail_build {
            return Err(KloadError::SurfaceConstruction {
                details: "injected build failure".to_string(),
            });
        }
        if grid.panel_count() == 0 {
            return Err(KloadError::SurfaceConstruction {
                details: "grid has no panels".to_string(),
            });
        }
        state.grid = Some(grid.clone());
        Ok(())
    }

    fn subscribe_keys(&mut self, cancel: CancelToken) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::SubscribeKeys);
        state.cancel = Some(cancel);
        Ok(())
    }

    fn push_series(&mut self, panel: PanelId, update: SeriesUpdate) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(grid) = &state.grid
            && !grid.panels().any(|p| p.id == panel)
        {
            return Err(KloadError::Surface {
                details: format!("no panel with id {}", panel.0),
            });
        }
        state.calls.push(SurfaceCall::Push(panel));
        state.pushes += 1;
        state.latest.insert(panel, update);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Redraw);
        if state.grid.is_none() {
            return Err(KloadError::Redraw {
                details: "surface not built".to_string(),
            });
        }
        state.redraws += 1;
        if state.fail_redraw_at == Some(state.redraws) {
            return Err(KloadError::Redraw {
                details: format!("injected failure on redraw {}", state.redraws),
            });
        }
        if state.cancel_after_redraws == Some(state.redraws)
            && let Some(cancel) = &state.cancel
        {
            cancel.cancel();
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(SurfaceCall::Release);
        state.released = true;
        state.cancel = None;
        Ok(())
    }
}

impl MemorySurfaceHandle {
    /// Grid passed to the successful `build`, if any.
    #[must_use]
    pub fn grid(&self) -> Option<GridSpec> {
        self.state.lock().grid.clone()
    }

    /// Most recent update pushed to `panel`.
    #[must_use]
    pub fn latest(&self, panel: PanelId) -> Option<SeriesUpdate> {
        self.state.lock().latest.get(&panel).cloned()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().calls.clone()
    }

    #[must_use]
    pub fn redraw_count(&self) -> usize {
        self.state.lock().redraws
    }

    #[must_use]
    pub fn push_count(&self) -> usize {
        self.state.lock().pushes
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}
