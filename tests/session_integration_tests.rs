//! Session integration tests: the render/poll loop driven end to end with a
//! scripted metrics source and the in-memory surface.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kload::core::errors::{KloadError, Result};
use kload::engine::cancel::CancelToken;
use kload::engine::session::{Session, SessionConfig};
use kload::source::demo::DemoSource;
use kload::source::filter::{EntityFilter, FilteredSource};
use kload::source::{Entity, MetricsSource};
use kload::surface::PanelId;
use kload::surface::memory::{MemorySurface, SurfaceCall};

// ══════════════════════════════════════════════════════════════════
// Fixtures
// ══════════════════════════════════════════════════════════════════

/// Source replaying scripted replies and counting fetches.
struct ScriptedSource {
    replies: VecDeque<Result<Vec<Entity>>>,
    /// Reply used once the script runs out.
    fallback: Option<Vec<Entity>>,
    columns: usize,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(columns: usize, replies: Vec<Result<Vec<Entity>>>) -> Self {
        Self {
            replies: replies.into(),
            fallback: None,
            columns,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn repeating(columns: usize, snapshot: Vec<Entity>) -> Self {
        let mut source = Self::new(columns, Vec::new());
        source.fallback = Some(snapshot);
        source
    }

    fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl MetricsSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = self.replies.pop_front() {
            return reply;
        }
        self.fallback
            .clone()
            .ok_or_else(|| KloadError::SourceUnavailable {
                source_name: "scripted".to_string(),
                details: "script exhausted".to_string(),
            })
    }

    fn max_columns_hint(&self) -> usize {
        self.columns
    }
}

fn entities(count: usize, pct: f64) -> Vec<Entity> {
    (0..count)
        .map(|i| Entity::new(format!("pod-{i}/app"), pct, 100.0, pct, 200.0))
        .collect()
}

fn fast() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

// ══════════════════════════════════════════════════════════════════
// Section 1: Layout from the initial snapshot
// ══════════════════════════════════════════════════════════════════

#[test]
fn seven_entities_three_columns_give_three_by_three() {
    let surface = MemorySurface::new().cancel_after_redraws(1);
    let handle = surface.handle();
    let source = ScriptedSource::repeating(3, entities(7, 10.0));

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    assert_eq!((report.layout.columns, report.layout.rows), (3, 3));
    assert_eq!(report.panels, 7);
    let grid = handle.grid().expect("grid built");
    assert_eq!(grid.panel_count(), 7);
    assert_eq!(grid.rows.len(), 3);
    assert_eq!(grid.rows[2].cells.len(), 1);
    assert!(grid.rows.iter().all(|r| r.height_percent == 32));
    assert_eq!(
        grid.title,
        "Press Esc to quit (CPU in yellow, Memory in red)"
    );
    assert_eq!(grid.rows[0].cells[0].title, "pod-0/app (100Mi/200MB)");
}

#[test]
fn panels_are_capped_but_every_entity_is_tracked() {
    let surface = MemorySurface::new().cancel_after_redraws(2);
    let handle = surface.handle();
    let source = ScriptedSource::repeating(3, entities(15, 10.0));

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.panels, 12);
    assert_eq!(report.tracked_entities, 15);
    assert_eq!((report.layout.columns, report.layout.rows), (3, 4));
    // One poll, twelve pushes: the three overflow entities have no panel.
    assert_eq!(handle.push_count(), 12);
}

#[test]
fn empty_initial_snapshot_fails_before_build() {
    let surface = MemorySurface::new();
    let handle = surface.handle();
    let source = ScriptedSource::new(3, vec![Ok(Vec::new())]);

    let err = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, KloadError::EmptyResultSet { .. }));
    assert!(handle.grid().is_none());
    assert!(!handle.calls().contains(&SurfaceCall::Build));
    assert!(handle.is_released());
}

#[test]
fn initial_fetch_failure_is_source_unavailable() {
    let surface = MemorySurface::new();
    let handle = surface.handle();
    let source = ScriptedSource::new(
        3,
        vec![Err(KloadError::Serialization {
            context: "test",
            details: "boom".into(),
        })],
    );

    let err = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap_err();

    match err {
        KloadError::SourceUnavailable { source_name, .. } => assert_eq!(source_name, "scripted"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(handle.redraw_count(), 0);
}

// ══════════════════════════════════════════════════════════════════
// Section 2: Running loop
// ══════════════════════════════════════════════════════════════════

#[test]
fn failure_on_second_poll_stops_the_session() {
    let surface = MemorySurface::new();
    let handle = surface.handle();
    let source = ScriptedSource::new(
        2,
        vec![
            Ok(entities(2, 10.0)),
            Ok(entities(2, 20.0)),
            Err(KloadError::SourceUnavailable {
                source_name: "scripted".into(),
                details: "api down".into(),
            }),
        ],
    );
    let fetches = source.fetch_counter();

    let err = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap_err();

    assert_eq!(err.code(), "KLD-2001");
    assert!(err.to_string().contains("api down"));
    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert_eq!(handle.grid().map(|g| g.panel_count()), Some(2));
    // Data from the successful poll was pushed before the failure.
    assert_eq!(
        handle.latest(PanelId(1)).unwrap().series[0].values,
        vec![20.0]
    );
    assert_eq!(handle.calls().last(), Some(&SurfaceCall::Release));
}

#[test]
fn empty_snapshot_while_running_is_fatal() {
    let surface = MemorySurface::new();
    let handle = surface.handle();
    let source = ScriptedSource::new(1, vec![Ok(entities(1, 5.0)), Ok(Vec::new())]);

    let err = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap_err();

    assert_eq!(err.code(), "KLD-2002");
    assert!(handle.is_released());
}

#[test]
fn cancel_stops_within_one_more_fetch() {
    let surface = MemorySurface::new().cancel_after_redraws(4);
    let source = ScriptedSource::repeating(2, entities(2, 50.0));
    let fetches = source.fetch_counter();

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    // One layout fetch plus one per completed poll; the cancelling frame
    // fetches nothing.
    assert_eq!(report.polls, 3);
    assert_eq!(fetches.load(Ordering::SeqCst), 4);
}

#[test]
fn external_cancel_interrupts_sleep() {
    let cancel = CancelToken::new();
    let source = ScriptedSource::repeating(2, entities(2, 50.0));
    let config = SessionConfig {
        poll_interval: Duration::from_secs(60),
        ..SessionConfig::default()
    };
    let canceller = cancel.clone();
    let thread = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let report = Session::new(source, MemorySurface::new(), config, cancel)
        .run()
        .unwrap();
    thread.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(report.polls <= 1);
}

#[test]
fn late_entity_gets_history_but_no_panel() {
    let surface = MemorySurface::new().cancel_after_redraws(3);
    let handle = surface.handle();
    let mut later = entities(1, 10.0);
    later.push(Entity::new("newcomer/app", 1.0, 10.0, 1.0, 10.0));
    let source = ScriptedSource::new(
        3,
        vec![Ok(entities(1, 10.0)), Ok(later.clone()), Ok(later)],
    );

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.panels, 1);
    assert_eq!(report.tracked_entities, 2);
    assert!(
        handle
            .calls()
            .iter()
            .all(|c| !matches!(c, SurfaceCall::Push(id) if *id != PanelId(0)))
    );
}

#[test]
fn window_slides_and_labels_stay_dense() {
    let surface = MemorySurface::new().cancel_after_redraws(6);
    let handle = surface.handle();
    let mut replies = vec![Ok(entities(1, 0.0))];
    replies.extend((1..=5).map(|i| Ok(entities(1, f64::from(i) * 10.0))));
    let source = ScriptedSource::new(1, replies);
    let config = SessionConfig {
        window_width: 3,
        ..fast()
    };

    let report = Session::new(source, surface, config, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.polls, 5);
    let update = handle.latest(PanelId(0)).unwrap();
    assert_eq!(update.series[0].values, vec![30.0, 40.0, 50.0]);
    assert_eq!(update.series[1].values, vec![15.0, 20.0, 25.0]);
    let keys: Vec<usize> = update.x_labels.keys().copied().collect();
    assert_eq!(keys, vec![0, 1, 2]);
}

#[test]
fn redraw_failure_releases_surface() {
    let surface = MemorySurface::new().failing_redraw_at(3);
    let handle = surface.handle();
    let source = ScriptedSource::repeating(2, entities(3, 10.0));

    let err = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap_err();

    assert_eq!(err.code(), "KLD-3002");
    assert!(handle.is_released());
    assert_eq!(handle.redraw_count(), 3);
}

// ══════════════════════════════════════════════════════════════════
// Section 3: Real sources through the loop
// ══════════════════════════════════════════════════════════════════

#[test]
fn demo_source_runs_through_session() {
    let surface = MemorySurface::new().cancel_after_redraws(5);
    let handle = surface.handle();
    let source = DemoSource::seeded(4, 2, 7);

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.panels, 4);
    assert_eq!((report.layout.columns, report.layout.rows), (2, 2));
    let update = handle.latest(PanelId(3)).unwrap();
    assert_eq!(update.series[0].values.len(), 4);
    assert!(
        update
            .series
            .iter()
            .flat_map(|s| s.values.iter())
            .all(|v| (0.0..=100.0).contains(v))
    );
}

#[test]
fn filtered_source_shapes_the_layout() {
    let surface = MemorySurface::new().cancel_after_redraws(1);
    let mut snapshot = entities(4, 10.0);
    snapshot.push(Entity::new("pod-0/istio-proxy", 1.0, 10.0, 1.0, 10.0));
    let filter = EntityFilter::new(vec!["pod-".into()], Some("pod-3"), Some("^istio-proxy$"))
        .unwrap();
    let source = FilteredSource::new(ScriptedSource::repeating(3, snapshot), filter);

    let report = Session::new(source, surface, fast(), CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.panels, 3);
    assert_eq!((report.layout.columns, report.layout.rows), (3, 1));
}
