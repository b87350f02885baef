//! Name-based entity selection wrapped around any source.
//!
//! An entity is kept when its name starts with one of the include prefixes
//! (or no prefixes are configured) and neither exclude pattern matches. The
//! member pattern is tested against the part after the last `/`, which for
//! `pod/container` names is the container.

use regex::Regex;

use crate::core::errors::Result;
use crate::source::{Dimensions, Entity, MetricsSource};

/// Compiled include/exclude rules.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    prefixes: Vec<String>,
    exclude: Option<Regex>,
    exclude_member: Option<Regex>,
}

impl EntityFilter {
    /// Compile a filter. Empty pattern strings mean "no pattern".
    pub fn new(
        prefixes: Vec<String>,
        exclude: Option<&str>,
        exclude_member: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            prefixes,
            exclude: compile(exclude)?,
            exclude_member: compile(exclude_member)?,
        })
    }

    /// True when the filter would keep every entity.
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.prefixes.is_empty() && self.exclude.is_none() && self.exclude_member.is_none()
    }

    #[must_use]
    pub fn keep(&self, name: &str) -> bool {
        let included =
            self.prefixes.is_empty() || self.prefixes.iter().any(|p| name.starts_with(p.as_str()));
        if !included {
            return false;
        }
        if self.exclude.as_ref().is_some_and(|re| re.is_match(name)) {
            return false;
        }
        let member = name.rsplit('/').next().unwrap_or(name);
        !self
            .exclude_member
            .as_ref()
            .is_some_and(|re| re.is_match(member))
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        Some(p) if !p.is_empty() => Ok(Some(Regex::new(p)?)),
        _ => Ok(None),
    }
}

/// Source adapter applying an [`EntityFilter`] to every snapshot.
pub struct FilteredSource<S> {
    inner: S,
    filter: EntityFilter,
}

impl<S: MetricsSource> FilteredSource<S> {
    #[must_use]
    pub fn new(inner: S, filter: EntityFilter) -> Self {
        Self { inner, filter }
    }
}

impl<S: MetricsSource> MetricsSource for FilteredSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(&mut self) -> Result<Vec<Entity>> {
        let mut entities = self.inner.fetch()?;
        entities.retain(|e| self.filter.keep(&e.name));
        Ok(entities)
    }

    fn max_columns_hint(&self) -> usize {
        self.inner.max_columns_hint()
    }

    fn dimensions(&self) -> Dimensions {
        self.inner.dimensions()
    }
}
