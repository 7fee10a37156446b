//! Run-wide statistics over the scanned corpus.
//!
//! Workers feed a shared [`StatsAggregator`]; once the pool barrier returns,
//! the aggregator is consumed into an [`AggregateStats`] snapshot. Line counts
//! add atomically and domains land in a concurrent set, so the merged value
//! does not depend on worker count or scheduling.
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashSet;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_lines: u64,
    pub distinct_domains: HashSet<String>,
}

impl AggregateStats {
    pub fn distinct_domain_count(&self) -> usize {
        self.distinct_domains.len()
    }

    /// Distinct domains in lexical order.
    pub fn sorted_domains(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.distinct_domains.iter().map(String::as_str).collect();
        v.sort_unstable();
        v
    }
}

#[derive(Debug, Default)]
pub struct StatsAggregator {
    lines: AtomicU64,
    domains: DashSet<String>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lines(&self, n: u64) {
        self.lines.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_domain(&self, domain: &str) {
        if !self.domains.contains(domain) {
            self.domains.insert(domain.to_owned());
        }
    }

    /// Merge a worker-local batch of domains.
    pub fn extend_domains<I>(&self, domains: I)
    where
        I: IntoIterator<Item = String>,
    {
        for d in domains {
            self.domains.insert(d);
        }
    }

    /// Consume the aggregator into the final snapshot.
    pub fn merge(self) -> AggregateStats {
        AggregateStats {
            total_lines: self.lines.into_inner(),
            distinct_domains: self.domains.into_iter().collect(),
        }
    }
}
