//! Metrics sources: the `MetricsSource` contract plus the concrete sources
//! shipped with the binary.
//!
//! A source returns a full snapshot of monitored entities on every call; the
//! engine never asks for deltas.

#![allow(missing_docs)]

pub mod demo;
pub mod filter;
pub mod json_file;
pub mod quantity;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

const A_HUNDRED: f64 = 100.0;

/// One monitored thing (a node, a `pod/container`, ...) with two measured
/// dimensions and their capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(alias = "cpu", deserialize_with = "quantity::de_cpu_millis")]
    pub current_a: f64,
    #[serde(alias = "cpu_limit", deserialize_with = "quantity::de_cpu_millis")]
    pub capacity_a: f64,
    #[serde(alias = "memory", deserialize_with = "quantity::de_memory_megabytes")]
    pub current_b: f64,
    #[serde(
        alias = "memory_limit",
        deserialize_with = "quantity::de_memory_megabytes"
    )]
    pub capacity_b: f64,
}

impl Entity {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        current_a: f64,
        capacity_a: f64,
        current_b: f64,
        capacity_b: f64,
    ) -> Self {
        Self {
            name: name.into(),
            current_a,
            capacity_a,
            current_b,
            capacity_b,
        }
    }

    /// Dimension A as a percentage of its capacity.
    #[must_use]
    pub fn percent_a(&self) -> f64 {
        percent_of(self.current_a, self.capacity_a)
    }

    /// Dimension B as a percentage of its capacity.
    #[must_use]
    pub fn percent_b(&self) -> f64 {
        percent_of(self.current_b, self.capacity_b)
    }
}

/// Percentage of `capacity` used by `current`. A missing or zero capacity
/// reports 0 so no NaN/inf ever reaches a chart.
fn percent_of(current: f64, capacity: f64) -> f64 {
    if capacity > 0.0 && current.is_finite() {
        current / capacity * A_HUNDRED
    } else {
        0.0
    }
}

/// Display name and capacity unit of one measured dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionLabel {
    pub name: String,
    pub unit: String,
}

impl DimensionLabel {
    #[must_use]
    pub fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// Labels for the two dimensions every entity carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub a: DimensionLabel,
    pub b: DimensionLabel,
}

impl Default for Dimensions {
    /// Kubernetes-style CPU in millicores and memory in megabytes.
    fn default() -> Self {
        Self {
            a: DimensionLabel::new("CPU", "Mi"),
            b: DimensionLabel::new("Memory", "MB"),
        }
    }
}

impl Dimensions {
    /// Border title for one entity's panel, e.g. `web/app (500Mi/256MB)`.
    #[must_use]
    pub fn panel_title(&self, entity: &Entity) -> String {
        format!(
            "{} ({}{}/{}{})",
            entity.name, entity.capacity_a, self.a.unit, entity.capacity_b, self.b.unit
        )
    }

    /// Root container title naming the quit key and the series colors.
    #[must_use]
    pub fn root_title(&self) -> String {
        format!(
            "Press Esc to quit ({} in yellow, {} in red)",
            self.a.name, self.b.name
        )
    }
}

/// Anything that can produce, on demand, a snapshot of named entities.
///
/// Implementations own whatever client they need; it is constructed by the
/// caller and handed in, never lazily created behind a global.
pub trait MetricsSource {
    /// Short name used in errors and log entries.
    fn name(&self) -> &str;

    /// Return the current full snapshot of monitored entities.
    fn fetch(&mut self) -> Result<Vec<Entity>>;

    /// Preferred number of panel columns. Queried once, before the first layout.
    fn max_columns_hint(&self) -> usize;

    /// Names and units of the two dimensions.
    fn dimensions(&self) -> Dimensions {
        Dimensions::default()
    }
}

impl<S: MetricsSource + ?Sized> MetricsSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        (**self).fetch()
    }

    fn max_columns_hint(&self) -> usize {
        (**self).max_columns_hint()
    }

    fn dimensions(&self) -> Dimensions {
        (**self).dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_share_of_capacity() {
        let e = Entity::new("node-1", 250.0, 1000.0, 512.0, 2048.0);
        assert!((e.percent_a() - 25.0).abs() < 1e-9);
        assert!((e.percent_b() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_reports_zero_percent() {
        let e = Entity::new("no-limits", 250.0, 0.0, 512.0, 0.0);
        assert_eq!(e.percent_a(), 0.0);
        assert_eq!(e.percent_b(), 0.0);
    }

    #[test]
    fn percent_can_exceed_one_hundred() {
        let e = Entity::new("burst", 1500.0, 1000.0, 0.0, 1.0);
        assert!((e.percent_a() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn panel_title_uses_units() {
        let e = Entity::new("web/app", 10.0, 500.0, 10.0, 256.0);
        assert_eq!(Dimensions::default().panel_title(&e), "web/app (500Mi/256MB)");
    }

    #[test]
    fn root_title_names_both_dimensions() {
        assert_eq!(
            Dimensions::default().root_title(),
            "Press Esc to quit (CPU in yellow, Memory in red)"
        );
    }

    #[test]
    fn entity_deserializes_kubernetes_aliases() {
        let raw = r#"{"name":"api/app","cpu":"250m","cpu_limit":"1","memory":"128Mi","memory_limit":"1Gi"}"#;
        let e: Entity = serde_json::from_str(raw).unwrap();
        assert_eq!(e.current_a, 250.0);
        assert_eq!(e.capacity_a, 1000.0);
        assert_eq!(e.current_b, 128.0);
        assert_eq!(e.capacity_b, 1024.0);
    }

    #[test]
    fn entity_deserializes_plain_numbers() {
        let raw = r#"{"name":"n","current_a":1.5,"capacity_a":3,"current_b":2,"capacity_b":4}"#;
        let e: Entity = serde_json::from_str(raw).unwrap();
        assert!((e.percent_a() - 50.0).abs() < 1e-9);
        assert!((e.percent_b() - 50.0).abs() < 1e-9);
    }
}
