#![forbid(unsafe_code)]

//! kload: live terminal dashboard of per-entity resource load.
//!
//! A [`MetricsSource`](source::MetricsSource) is polled on a fixed cadence.
//! Each entity's usage, as a percentage of its capacity, goes into a bounded
//! sliding window, and each window is drawn as a two-line chart in a grid of
//! panels sized from the first snapshot.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use kload::prelude::*;
//!
//! let source = DemoSource::new(4, 3);
//! let report = Session::new(
//!     source,
//!     MemorySurface::new().cancel_after_redraws(5),
//!     SessionConfig::default(),
//!     CancelToken::new(),
//! )
//! .run()?;
//! # Ok::<(), KloadError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod engine;
pub mod logger;
pub mod source;
pub mod surface;
