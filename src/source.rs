use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use log::{debug, warn};
use lru::LruCache;

use crate::event::Event;
use crate::matches::MatchInfo;

/// Competition/season pair as used by the open-data listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Competition {
    pub competition_id: u32,
    pub season_id: u32,
}

impl Competition {
    pub const EURO_2024: Competition = Competition {
        competition_id: 55,
        season_id: 282,
    };

    pub fn new(competition_id: u32, season_id: u32) -> Self {
        Self {
            competition_id,
            season_id,
        }
    }
}

impl Default for Competition {
    fn default() -> Self {
        Self::EURO_2024
    }
}

/// Provider of match listings and normalized event logs.
pub trait EventSource: Send + Sync {
    fn matches(&self, competition: Competition) -> Result<Vec<MatchInfo>>;

    fn events(&self, match_id: u64) -> Result<Vec<Event>>;

    /// Events of every match in the competition. Matches that fail to load are
    /// logged and skipped.
    fn competition_events(&self, competition: Competition) -> Result<Vec<Event>> {
        let mut out = Vec::new();
        for m in self.matches(competition)? {
            match self.events(m.match_id) {
                Ok(events) => out.extend(events),
                Err(err) => warn!("skipping match {}: {err:#}", m.match_id),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Tables {
    matches: LruCache<Competition, Arc<Vec<MatchInfo>>>,
    events: LruCache<u64, Arc<Vec<Event>>>,
    competition_events: LruCache<Competition, Arc<Vec<Event>>>,
    stats: CacheStats,
}

/// Read-through cache in front of another source, keyed by call parameters.
/// Errors are never cached.
pub struct CachedSource<S> {
    inner: S,
    tables: Mutex<Tables>,
}

impl<S: EventSource> CachedSource<S> {
    /// `capacity` is per table; zero is raised to one.
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            tables: Mutex::new(Tables {
                matches: LruCache::new(capacity),
                events: LruCache::new(capacity),
                competition_events: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn matches_shared(&self, competition: Competition) -> Result<Arc<Vec<MatchInfo>>> {
        self.read_through(
            |t| &mut t.matches,
            competition,
            || self.inner.matches(competition),
        )
    }

    pub fn events_shared(&self, match_id: u64) -> Result<Arc<Vec<Event>>> {
        self.read_through(|t| &mut t.events, match_id, || self.inner.events(match_id))
    }

    pub fn competition_events_shared(&self, competition: Competition) -> Result<Arc<Vec<Event>>> {
        self.read_through(
            |t| &mut t.competition_events,
            competition,
            || self.inner.competition_events(competition),
        )
    }

    // Lock is released while loading.
    fn read_through<K, V>(
        &self,
        table: impl Fn(&mut Tables) -> &mut LruCache<K, Arc<V>>,
        key: K,
        load: impl FnOnce() -> Result<V>,
    ) -> Result<Arc<V>>
    where
        K: Hash + Eq + std::fmt::Debug,
    {
        {
            let mut tables = self.lock();
            if let Some(hit) = table(&mut *tables).get(&key).cloned() {
                tables.stats.hits += 1;
                debug!("source cache hit: {key:?}");
                return Ok(hit);
            }
            tables.stats.misses += 1;
        }
        let value = Arc::new(load()?);
        let mut tables = self.lock();
        let lru = table(&mut *tables);
        // `push` also hands back the old value when the key was already present.
        let replacing = lru.contains(&key);
        if lru.push(key, Arc::clone(&value)).is_some() && !replacing {
            tables.stats.evictions += 1;
            debug!("source cache evicted an entry");
        }
        Ok(value)
    }
}

impl<S: EventSource> EventSource for CachedSource<S> {
    fn matches(&self, competition: Competition) -> Result<Vec<MatchInfo>> {
        Ok(self.matches_shared(competition)?.as_ref().clone())
    }

    fn events(&self, match_id: u64) -> Result<Vec<Event>> {
        Ok(self.events_shared(match_id)?.as_ref().clone())
    }

    fn competition_events(&self, competition: Competition) -> Result<Vec<Event>> {
        Ok(self.competition_events_shared(competition)?.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        event_calls: AtomicUsize,
    }

    impl EventSource for CountingSource {
        fn matches(&self, _competition: Competition) -> Result<Vec<MatchInfo>> {
            Ok(Vec::new())
        }

        fn events(&self, match_id: u64) -> Result<Vec<Event>> {
            self.event_calls.fetch_add(1, Ordering::SeqCst);
            if match_id == 0 {
                anyhow::bail!("no such match");
            }
            Ok(vec![Event::new(match_id.to_string(), EventKind::Pass, "A", "p")])
        }
    }

    #[test]
    fn lru_evicts_least_recent() {
        let cached = CachedSource::new(CountingSource::default(), 2);
        cached.events(1).unwrap();
        cached.events(2).unwrap();
        cached.events(1).unwrap();
        cached.events(3).unwrap();
        assert_eq!(cached.stats().evictions, 1);
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 3);

        // 2 was least recent, so it is the one reloaded.
        cached.events(1).unwrap();
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 3);
        cached.events(2).unwrap();
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 4);
        assert_eq!(cached.lock().events.len(), 2);
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let cached = CachedSource::new(CountingSource::default(), 1);
        cached.events(7).unwrap();
        cached.events(7).unwrap();
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 1);
        cached.events(8).unwrap();
        cached.events(7).unwrap();
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 3);
        let stats = cached.stats();
        assert_eq!((stats.hits, stats.misses, stats.evictions), (1, 3, 2));
    }

    #[test]
    fn errors_are_not_cached() {
        let cached = CachedSource::new(CountingSource::default(), 4);
        assert!(cached.events(0).is_err());
        assert!(cached.events(0).is_err());
        assert_eq!(cached.inner().event_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn shared_across_threads() {
        let cached = Arc::new(CachedSource::new(CountingSource::default(), 4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&cached);
                std::thread::spawn(move || c.events(5).unwrap().len())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 1);
        }
    }
}
