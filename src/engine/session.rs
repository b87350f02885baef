//! Render/poll loop: `Init → Running → Stopped`.
//!
//! One thread drives everything. Each iteration redraws, checks the cancel
//! token, fetches a snapshot (blocking), records every entity into its
//! sliding window, pushes the windows of bound entities to their panels and
//! then sleeps until the next poll. Redraw and poll share that one cadence.
//!
//! Every failure is terminal: nothing is retried, and the surface is
//! released on the way out no matter how the session ended.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::time::Duration;

use chrono::Local;

use crate::core::errors::{KloadError, Result};
use crate::engine::cancel::CancelToken;
use crate::engine::layout::{
    self, DEFAULT_ON_SCREEN_CAP, LayoutPlan, assemble_grid, visible_count,
};
use crate::engine::registry::PanelRegistry;
use crate::engine::window::{DEFAULT_WINDOW_WIDTH, SlidingWindowStore};
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::source::{Entity, MetricsSource};
use crate::surface::DrawingSurface;

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Knobs for one dashboard session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Samples retained per entity series.
    pub window_width: usize,
    /// Panels shown at most.
    pub on_screen_cap: usize,
    /// Pause between polls; also the redraw cadence.
    pub poll_interval: Duration,
    /// Log one `poll` event per iteration.
    pub log_polls: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            on_screen_cap: DEFAULT_ON_SCREEN_CAP,
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_polls: false,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Running,
    Stopped,
}

/// Summary of a session that ended through cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Completed fetch-and-update iterations after the initial layout fetch.
    pub polls: u64,
    /// Panels built from the initial snapshot.
    pub panels: usize,
    /// Entities with a recorded history, bound or not.
    pub tracked_entities: usize,
    pub layout: LayoutPlan,
}

/// A dashboard session over one source and one surface.
pub struct Session<S, D> {
    source: S,
    surface: D,
    config: SessionConfig,
    cancel: CancelToken,
    state: SessionState,
    store: SlidingWindowStore,
    registry: PanelRegistry,
    layout: LayoutPlan,
    polls: u64,
    unbound_seen: HashSet<String>,
    log: Option<JsonlWriter>,
    config_hash: Option<String>,
}

impl<S: MetricsSource, D: DrawingSurface> Session<S, D> {
    #[must_use]
    pub fn new(source: S, surface: D, config: SessionConfig, cancel: CancelToken) -> Self {
        let store = SlidingWindowStore::new(config.window_width);
        Self {
            source,
            surface,
            config,
            cancel,
            state: SessionState::Init,
            store,
            registry: PanelRegistry::default(),
            layout: layout::plan(1, 0),
            polls: 0,
            unbound_seen: HashSet::new(),
            log: None,
            config_hash: None,
        }
    }

    /// Write session events to `log`.
    #[must_use]
    pub fn with_log(mut self, log: JsonlWriter) -> Self {
        self.log = Some(log);
        self
    }

    /// Tag the `session_start` event with the effective config's hash.
    #[must_use]
    pub fn with_config_hash(mut self, hash: String) -> Self {
        self.config_hash = Some(hash);
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run until cancelled or until the first error.
    ///
    /// Consumes the session: once stopped there is nothing left to fetch or draw.
    pub fn run(mut self) -> Result<SessionReport> {
        let mut start = LogEntry::new(EventType::SessionStart, Severity::Info);
        start.source = Some(self.source.name().to_string());
        start.config_hash = self.config_hash.take();
        self.log(start);

        let outcome = self.start().and_then(|()| self.poll_loop());
        let released = self.surface.release();
        self.state = SessionState::Stopped;

        match &outcome {
            Ok(report) => {
                let mut stop = LogEntry::new(EventType::SessionStop, Severity::Info);
                stop.polls = Some(report.polls);
                stop.entities = Some(report.tracked_entities);
                self.log(stop);
            }
            Err(err) => {
                let event = if matches!(
                    err,
                    KloadError::SourceUnavailable { .. } | KloadError::EmptyResultSet { .. }
                ) {
                    EventType::SourceFailure
                } else {
                    EventType::Error
                };
                let mut entry = LogEntry::from_error(event, err);
                entry.source = Some(self.source.name().to_string());
                entry.polls = Some(self.polls);
                self.log(entry);
            }
        }
        if let Some(log) = self.log.as_mut() {
            log.flush();
        }

        let report = outcome?;
        released?;
        Ok(report)
    }

    /// `Init`: fetch once, plan the grid, bind panels, build the surface.
    fn start(&mut self) -> Result<()> {
        let snapshot = self.fetch()?;
        let max_columns = self.source.max_columns_hint();
        if max_columns == 0 {
            return Err(KloadError::InvalidConfig {
                details: format!("source {} asked for 0 columns", self.source.name()),
            });
        }

        let visible = visible_count(snapshot.len(), self.config.on_screen_cap);
        self.layout = layout::plan(max_columns, visible);
        let dimensions = self.source.dimensions();
        let root_title = dimensions.root_title();
        self.registry = PanelRegistry::from_snapshot(&snapshot[..visible], dimensions);

        let grid = assemble_grid(&self.layout, &self.registry.cells(), &root_title);
        self.surface.build(&grid)?;
        self.surface.subscribe_keys(self.cancel.clone())?;

        let mut planned = LogEntry::new(EventType::LayoutPlanned, Severity::Info);
        planned.entities = Some(snapshot.len());
        planned.panels = Some(self.registry.len());
        planned.columns = Some(self.layout.columns);
        planned.rows = Some(self.layout.rows);
        if snapshot.len() > visible {
            planned.details = Some(format!(
                "{} entities tracked without a panel (cap {})",
                snapshot.len() - visible,
                self.config.on_screen_cap
            ));
        }
        self.log(planned);

        self.state = SessionState::Running;
        Ok(())
    }

    /// `Running`: redraw, check cancel, fetch, update, sleep.
    fn poll_loop(&mut self) -> Result<SessionReport> {
        loop {
            self.surface.redraw()?;
            if self.cancel.is_cancelled() {
                self.log(LogEntry::new(EventType::CancelRequested, Severity::Info));
                return Ok(self.report());
            }

            let snapshot = self.fetch()?;
            self.apply(&snapshot)?;
            self.polls += 1;

            if self.config.log_polls {
                let mut entry = LogEntry::new(EventType::Poll, Severity::Info);
                entry.entities = Some(snapshot.len());
                entry.polls = Some(self.polls);
                self.log(entry);
            }

            self.cancel.sleep(self.config.poll_interval);
        }
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        let snapshot = self
            .source
            .fetch()
            .map_err(|e| e.into_source_unavailable(self.source.name()))?;
        if snapshot.is_empty() {
            return Err(KloadError::EmptyResultSet {
                source_name: self.source.name().to_string(),
            });
        }
        Ok(snapshot)
    }

    /// Record every entity and push the windows of the ones with a panel.
    fn apply(&mut self, snapshot: &[Entity]) -> Result<()> {
        let now = Local::now();
        for entity in snapshot {
            let history =
                self.store
                    .record(&entity.name, &now, entity.percent_a(), entity.percent_b());
            let pushed = self
                .registry
                .push(&mut self.surface, &entity.name, history)?;
            if !pushed && self.unbound_seen.insert(entity.name.clone()) {
                let mut entry = LogEntry::new(EventType::EntityUnbound, Severity::Warning);
                entry.entity = Some(entity.name.clone());
                self.log(entry);
            }
        }
        Ok(())
    }

    fn report(&self) -> SessionReport {
        SessionReport {
            polls: self.polls,
            panels: self.registry.len(),
            tracked_entities: self.store.len(),
            layout: self.layout,
        }
    }

    fn log(&mut self, entry: LogEntry) {
        if let Some(log) = self.log.as_mut() {
            log.write_entry(&entry);
        }
    }
}
