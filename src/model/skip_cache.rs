use chrono::{DateTime, Duration, FixedOffset};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Photos a rater has passed on this session, so the selector stops
/// re-offering them.
///
/// This is an optimization hint, not a system of record: entries expire,
/// the per-rater set is capped (oldest evicted first), and nothing here
/// enforces duplicate-vote prevention. That stays with the durable
/// already-rated check. A shared expiring KV store can take this role
/// across service instances without changing the selector contract.
pub struct SkipCache {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<i32, IndexMap<i32, DateTime<FixedOffset>>>
}

impl SkipCache {
    pub fn new(capacity: usize, ttl: Duration) -> SkipCache {
        SkipCache {
            capacity,
            ttl,
            entries: HashMap::new()
        }
    }

    /// Records a skip. Re-skipping refreshes the entry's position and
    /// timestamp.
    pub fn record_skip(&mut self, rater_id: i32, photo_id: i32, now: DateTime<FixedOffset>) {
        let skips = self.entries.entry(rater_id).or_default();

        skips.shift_remove(&photo_id);
        skips.insert(photo_id, now);

        while skips.len() > self.capacity {
            skips.shift_remove_index(0);
        }
    }

    /// True iff the rater skipped this photo and the entry is still live.
    pub fn contains(&self, rater_id: i32, photo_id: i32, now: DateTime<FixedOffset>) -> bool {
        self.entries
            .get(&rater_id)
            .and_then(|skips| skips.get(&photo_id))
            .map(|skipped_at| now - *skipped_at < self.ttl)
            .unwrap_or(false)
    }

    /// Drops expired entries and empty raters.
    pub fn prune(&mut self, now: DateTime<FixedOffset>) {
        for skips in self.entries.values_mut() {
            skips.retain(|_, skipped_at| now - *skipped_at < self.ttl);
        }

        self.entries.retain(|_, skips| !skips.is_empty());
    }

    /// Forgets everything for one rater (session end).
    pub fn clear_rater(&mut self, rater_id: i32) {
        self.entries.remove(&rater_id);
    }

    pub fn len(&self, rater_id: i32) -> usize {
        self.entries.get(&rater_id).map(|skips| skips.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cache() -> SkipCache {
        SkipCache::new(3, Duration::minutes(30))
    }

    #[test]
    fn test_record_and_contains() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        cache.record_skip(1, 100, now);

        assert!(cache.contains(1, 100, now));
        assert!(!cache.contains(1, 101, now));
        assert!(!cache.contains(2, 100, now));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        for photo_id in 100..104 {
            cache.record_skip(1, photo_id, now);
        }

        assert_eq!(cache.len(1), 3);
        assert!(!cache.contains(1, 100, now));
        assert!(cache.contains(1, 103, now));
    }

    #[test]
    fn test_entries_expire() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        cache.record_skip(1, 100, now);

        let later = now + Duration::minutes(31);
        assert!(!cache.contains(1, 100, later));
    }

    #[test]
    fn test_reskip_refreshes_position() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        cache.record_skip(1, 100, now);
        cache.record_skip(1, 101, now);
        cache.record_skip(1, 102, now);
        // 100 becomes the newest entry again
        cache.record_skip(1, 100, now);
        cache.record_skip(1, 103, now);

        assert!(cache.contains(1, 100, now));
        assert!(!cache.contains(1, 101, now));
    }

    #[test]
    fn test_prune_drops_expired() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        cache.record_skip(1, 100, now);
        cache.record_skip(2, 200, now + Duration::minutes(20));

        cache.prune(now + Duration::minutes(35));

        assert_eq!(cache.len(1), 0);
        assert_eq!(cache.len(2), 1);
    }

    #[test]
    fn test_clear_rater() {
        let now = Utc::now().fixed_offset();
        let mut cache = cache();

        cache.record_skip(1, 100, now);
        cache.clear_rater(1);

        assert!(!cache.contains(1, 100, now));
    }
}
