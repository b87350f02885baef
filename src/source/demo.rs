//! Random-walk source for trying the dashboard without a cluster.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::errors::Result;
use crate::source::{Entity, MetricsSource};

const DEMO_CPU_LIMIT: f64 = 100.0;
const DEMO_MEMORY_LIMIT: f64 = 300.0;

/// Synthetic entities whose usage drifts a few units per fetch.
pub struct DemoSource {
    entities: Vec<Entity>,
    max_columns: usize,
    rng: StdRng,
}

impl DemoSource {
    /// `count` entities named like pod containers, starting at random load.
    #[must_use]
    pub fn new(count: usize, max_columns: usize) -> Self {
        Self::with_rng(count, max_columns, StdRng::from_os_rng())
    }

    /// Deterministic variant for tests and reproducible demos.
    #[must_use]
    pub fn seeded(count: usize, max_columns: usize, seed: u64) -> Self {
        Self::with_rng(count, max_columns, StdRng::seed_from_u64(seed))
    }

    fn with_rng(count: usize, max_columns: usize, mut rng: StdRng) -> Self {
        let entities = (0..count)
            .map(|i| {
                Entity::new(
                    format!("http-server/agdf-1df{i}"),
                    rng.random::<f64>() * DEMO_CPU_LIMIT,
                    DEMO_CPU_LIMIT,
                    rng.random::<f64>() * (DEMO_MEMORY_LIMIT * 2.0 / 3.0),
                    DEMO_MEMORY_LIMIT,
                )
            })
            .collect();
        Self {
            entities,
            max_columns,
            rng,
        }
    }
}

/// Step in `{-8, 1, -4, 3, 0, 5}`: odd draws climb slowly, even draws drop twice as fast.
fn drift(rng: &mut StdRng) -> f64 {
    let value: i32 = rng.random_range(0..6);
    let step = if value % 2 == 0 { -value * 2 } else { value };
    f64::from(step)
}

impl MetricsSource for DemoSource {
    fn name(&self) -> &str {
        "demo"
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        for e in &mut self.entities {
            e.current_a = (e.current_a + drift(&mut self.rng)).clamp(0.0, e.capacity_a);
            e.current_b = (e.current_b + drift(&mut self.rng)).clamp(0.0, e.capacity_b);
        }
        Ok(self.entities.clone())
    }

    fn max_columns_hint(&self) -> usize {
        self.max_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_entity_count() {
        let mut src = DemoSource::seeded(5, 2, 7);
        let snapshot = src.fetch().unwrap();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot[0].name, "http-server/agdf-1df0");
        assert_eq!(src.max_columns_hint(), 2);
    }

    #[test]
    fn values_stay_within_capacity() {
        let mut src = DemoSource::seeded(3, 3, 42);
        for _ in 0..500 {
            for e in src.fetch().unwrap() {
                assert!((0.0..=100.0).contains(&e.percent_a()), "{e:?}");
                assert!((0.0..=100.0).contains(&e.percent_b()), "{e:?}");
            }
        }
    }

    #[test]
    fn same_seed_same_walk() {
        let mut a = DemoSource::seeded(2, 2, 9);
        let mut b = DemoSource::seeded(2, 2, 9);
        for _ in 0..10 {
            assert_eq!(a.fetch().unwrap(), b.fetch().unwrap());
        }
    }

    #[test]
    fn names_are_stable_across_fetches() {
        let mut src = DemoSource::seeded(4, 2, 1);
        let first: Vec<String> = src.fetch().unwrap().into_iter().map(|e| e.name).collect();
        let second: Vec<String> = src.fetch().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(first, second);
    }
}
