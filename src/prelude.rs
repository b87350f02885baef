//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use kload::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, SourceKind};
pub use crate::core::errors::{KloadError, Result};

// Sources
pub use crate::source::demo::DemoSource;
pub use crate::source::filter::{EntityFilter, FilteredSource};
pub use crate::source::json_file::JsonFileSource;
pub use crate::source::{DimensionLabel, Dimensions, Entity, MetricsSource};

// Engine
pub use crate::engine::cancel::CancelToken;
pub use crate::engine::layout::{LayoutPlan, plan};
pub use crate::engine::registry::PanelRegistry;
pub use crate::engine::session::{Session, SessionConfig, SessionReport, SessionState};
pub use crate::engine::window::{SeriesHistory, SlidingWindowStore};

// Surfaces
pub use crate::surface::memory::MemorySurface;
#[cfg(feature = "tui")]
pub use crate::surface::terminal::TerminalSurface;
pub use crate::surface::{DrawingSurface, GridSpec, PanelId, SeriesUpdate};

// Logging
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter};
