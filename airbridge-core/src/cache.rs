//! Time-based gate between host queries and sensor fetches.

use crate::time::Timestamp;

/// Time-to-live policy for fetched results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Every query triggers a fetch.
    AlwaysRefresh,
    /// Fetched results stay valid for this many milliseconds.
    Finite(u64),
    /// One successful fetch, then cached forever. Push updates are the only
    /// way such an accessory changes after startup.
    Infinite,
}

impl CacheTtl {
    /// Policy for a configured millisecond count: negative means infinite,
    /// zero means always refresh.
    pub fn from_config_millis(millis: i64) -> Self {
        if millis < 0 {
            CacheTtl::Infinite
        } else if millis == 0 {
            CacheTtl::AlwaysRefresh
        } else {
            CacheTtl::Finite(millis as u64)
        }
    }
}

/// Decides whether the last fetched result may be served again.
///
/// [`mark_refreshed`](StalenessCache::mark_refreshed) must only be called
/// after a fully successful fetch. Failures leave the cache stale, so the
/// next query retries immediately instead of serving an error for a whole
/// TTL window.
#[derive(Debug, Clone)]
pub struct StalenessCache {
    ttl: CacheTtl,
    last_refreshed: Option<Timestamp>,
}

impl StalenessCache {
    /// Cache that has never been refreshed.
    pub fn new(ttl: CacheTtl) -> Self {
        Self { ttl, last_refreshed: None }
    }

    /// True when a query must hit the sensor instead of the cached state.
    ///
    /// With a finite TTL the comparison is strict: a query arriving exactly
    /// at the TTL boundary is still served from cache.
    pub fn should_refresh(&self, now: Timestamp) -> bool {
        match self.ttl {
            CacheTtl::AlwaysRefresh => true,
            CacheTtl::Infinite => self.last_refreshed.is_none(),
            CacheTtl::Finite(ttl) => match self.last_refreshed {
                Some(at) => now.saturating_sub(at) > ttl,
                None => true,
            },
        }
    }

    /// Record a successful refresh.
    pub fn mark_refreshed(&mut self, now: Timestamp) {
        self.last_refreshed = Some(now);
    }

    /// Whether this cache keeps its first result forever.
    pub fn is_infinite(&self) -> bool {
        self.ttl == CacheTtl::Infinite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_mapping_from_config() {
        assert_eq!(CacheTtl::from_config_millis(-1), CacheTtl::Infinite);
        assert_eq!(CacheTtl::from_config_millis(i64::MIN), CacheTtl::Infinite);
        assert_eq!(CacheTtl::from_config_millis(0), CacheTtl::AlwaysRefresh);
        assert_eq!(CacheTtl::from_config_millis(30_000), CacheTtl::Finite(30_000));
    }

    #[test]
    fn zero_ttl_always_refreshes() {
        let mut cache = StalenessCache::new(CacheTtl::AlwaysRefresh);
        assert!(cache.should_refresh(100));
        cache.mark_refreshed(100);
        assert!(cache.should_refresh(100));
        assert!(cache.should_refresh(101));
    }

    #[test]
    fn infinite_ttl_refreshes_exactly_once() {
        let mut cache = StalenessCache::new(CacheTtl::Infinite);
        assert!(cache.is_infinite());
        assert!(cache.should_refresh(0));
        cache.mark_refreshed(0);
        assert!(!cache.should_refresh(0));
        assert!(!cache.should_refresh(u64::MAX));
    }

    #[test]
    fn finite_ttl_boundary_is_exclusive() {
        let mut cache = StalenessCache::new(CacheTtl::Finite(30_000));
        assert!(cache.should_refresh(0));
        cache.mark_refreshed(1_000);
        assert!(!cache.should_refresh(1_000));
        // Exactly at the boundary the cache still holds.
        assert!(!cache.should_refresh(31_000));
        assert!(cache.should_refresh(31_001));
    }

    #[test]
    fn unmarked_failures_leave_the_cache_stale() {
        let mut cache = StalenessCache::new(CacheTtl::Finite(30_000));
        assert!(cache.should_refresh(0));
        // No mark_refreshed after a failed fetch: still stale.
        assert!(cache.should_refresh(1));
        cache.mark_refreshed(2);
        assert!(!cache.should_refresh(3));
    }

    #[test]
    fn clock_going_backwards_serves_the_cache() {
        let mut cache = StalenessCache::new(CacheTtl::Finite(10));
        cache.mark_refreshed(1_000);
        assert!(!cache.should_refresh(900));
    }
}
