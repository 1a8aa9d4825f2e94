use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the proxy's counters since start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub hits: u64,
    pub misses: u64,
    pub upstream_calls: u64,
    pub empty_results: u64,
    pub quota_rejections: u64,
    pub secondary_writes: u64,
    pub errors: u64,
}

impl ProxyStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
pub(crate) struct AtomicStats {
    pub(crate) hits: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) upstream_calls: AtomicU64,
    pub(crate) empty_results: AtomicU64,
    pub(crate) quota_rejections: AtomicU64,
    pub(crate) secondary_writes: AtomicU64,
    pub(crate) errors: AtomicU64,
}

impl AtomicStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn to_stats(&self) -> ProxyStats {
        ProxyStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            quota_rejections: self.quota_rejections.load(Ordering::Relaxed),
            secondary_writes: self.secondary_writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
