//! Per-entity bounded history: two aligned sample series plus x-axis labels.
//!
//! Each append that pushes a series past the window width drops the oldest
//! sample from both series and re-keys the labels to a dense `0..len` range.
//! Label keys are positions, not steps; that is what the chart consumes.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, TimeZone};

/// Samples kept per series unless configured otherwise.
pub const DEFAULT_WINDOW_WIDTH: usize = 20;

/// strftime pattern for x-axis labels.
pub const LABEL_FORMAT: &str = "%H:%M:%S";

/// Bounded history for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHistory {
    width: usize,
    samples_a: VecDeque<f64>,
    samples_b: VecDeque<f64>,
    labels: BTreeMap<usize, String>,
    step: usize,
}

impl SeriesHistory {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            samples_a: VecDeque::with_capacity(width + 1),
            samples_b: VecDeque::with_capacity(width + 1),
            labels: BTreeMap::new(),
            step: 0,
        }
    }

    /// Append one observation, then trim back to the window width.
    pub fn push(&mut self, label: String, value_a: f64, value_b: f64) {
        self.samples_a.push_back(value_a);
        self.samples_b.push_back(value_b);
        self.labels.insert(self.step, label);
        self.step += 1;
        self.trim();
    }

    /// Drop the oldest samples until both series fit the window.
    ///
    /// Returns whether anything was dropped; on a series shorter than the
    /// window this is a no-op.
    pub fn trim(&mut self) -> bool {
        let excess = self.samples_a.len().saturating_sub(self.width);
        if excess == 0 {
            return false;
        }
        self.samples_a.drain(..excess);
        self.samples_b.drain(..excess);

        let label_excess = self.labels.len().saturating_sub(self.width);
        self.labels = std::mem::take(&mut self.labels)
            .into_values()
            .skip(label_excess)
            .enumerate()
            .collect();
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples_a.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples_a.is_empty()
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Total observations ever recorded; never reset by trimming.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    #[must_use]
    pub fn samples_a(&self) -> Vec<f64> {
        self.samples_a.iter().copied().collect()
    }

    #[must_use]
    pub fn samples_b(&self) -> Vec<f64> {
        self.samples_b.iter().copied().collect()
    }

    #[must_use]
    pub const fn labels(&self) -> &BTreeMap<usize, String> {
        &self.labels
    }

    /// Most recent pair of samples.
    #[must_use]
    pub fn latest(&self) -> Option<(f64, f64)> {
        Some((*self.samples_a.back()?, *self.samples_b.back()?))
    }
}

/// All entity histories, created lazily on first sighting and kept for the
/// whole session even when an entity stops showing up.
#[derive(Debug, Clone)]
pub struct SlidingWindowStore {
    width: usize,
    histories: HashMap<String, SeriesHistory>,
}

impl SlidingWindowStore {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            histories: HashMap::new(),
        }
    }

    /// Record one observation for `name`, labelled with `at` as `HH:MM:SS`.
    pub fn record<Tz>(
        &mut self,
        name: &str,
        at: &DateTime<Tz>,
        value_a: f64,
        value_b: f64,
    ) -> &SeriesHistory
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let width = self.width;
        let history = self
            .histories
            .entry(name.to_string())
            .or_insert_with(|| SeriesHistory::new(width));
        history.push(at.format(LABEL_FORMAT).to_string(), value_a, value_b);
        history
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SeriesHistory> {
        self.histories.get(name)
    }

    /// Number of entities ever recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }
}

impl Default for SlidingWindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH)
    }
}
