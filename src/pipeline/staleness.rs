//! Staleness policy.
//!
//! Decides whether the cached part of a collection is complete enough to
//! serve, by comparing it with the total upstream declares on its first page.
//!
//! > The cache is stale when it holds fewer than `count - margin` records of
//! > the collection. The margin absorbs records appearing or disappearing
//! > upstream between the count check and a crawl.

use crate::models::{Provenance, StalenessConfig};

/// Outcome of a staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cache is complete enough to serve
    Fresh { cached: usize, declared: usize },
    /// Cache is missing too much; crawl the collection
    Stale {
        cached: usize,
        declared: usize,
        threshold: usize,
    },
}

impl Freshness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Provenance of a response built on this decision.
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::Fresh { .. } => Provenance::Cache,
            Self::Stale { .. } => Provenance::Call,
        }
    }
}

/// Count-with-margin completeness heuristic.
#[derive(Debug, Clone)]
pub struct StalenessPolicy {
    margin: usize,
}

impl StalenessPolicy {
    /// Create a policy with the given slack.
    pub fn new(margin: usize) -> Self {
        Self { margin }
    }

    pub fn from_config(config: &StalenessConfig) -> Self {
        Self::new(config.margin)
    }

    /// Compare the cached size of a collection with the declared total.
    pub fn check(&self, cached: usize, declared: usize) -> Freshness {
        let threshold = declared.saturating_sub(self.margin);
        if cached < threshold {
            log::info!(
                "Cache STALE: {cached} cached < {threshold} ({declared} declared - {} margin)",
                self.margin
            );
            Freshness::Stale {
                cached,
                declared,
                threshold,
            }
        } else {
            log::debug!("Cache FRESH: {cached} cached, {declared} declared");
            Freshness::Fresh { cached, declared }
        }
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::from_config(&StalenessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_boundary() {
        let policy = StalenessPolicy::new(8);

        assert_eq!(policy.check(93, 100).provenance(), Provenance::Cache);
        assert_eq!(policy.check(92, 100).provenance(), Provenance::Cache);
        assert_eq!(policy.check(91, 100).provenance(), Provenance::Call);
    }

    #[test]
    fn test_empty_cache_is_stale() {
        let policy = StalenessPolicy::default();
        assert!(policy.check(0, 82).is_stale());
    }

    #[test]
    fn test_small_collections_never_underflow() {
        let policy = StalenessPolicy::new(8);
        assert!(!policy.check(0, 5).is_stale());
    }

    #[test]
    fn test_zero_margin_requires_exact_count() {
        let policy = StalenessPolicy::new(0);
        assert!(policy.check(99, 100).is_stale());
        assert!(!policy.check(100, 100).is_stale());
        assert!(!policy.check(120, 100).is_stale());
    }

    #[test]
    fn test_stale_reports_threshold() {
        let policy = StalenessPolicy::new(8);
        assert_eq!(
            policy.check(10, 100),
            Freshness::Stale {
                cached: 10,
                declared: 100,
                threshold: 92
            }
        );
    }
}
