// src/cache/store.rs

//! Bounded record store.
//!
//! Records live in one table keyed by their normalized URL. Names are a
//! secondary index onto that table, so a record reachable by two keys is
//! still stored (and counted) once. Several records may share a name.
//!
//! Every operation takes the current instant explicitly; the store has no
//! clock of its own and is only ever touched by the cache worker.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::models::Record;
use crate::utils::{name_key, url_key};

/// Counters describing cache behavior since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

#[derive(Debug)]
struct Entry {
    record: Record,
    name: Option<String>,
    last_access: Instant,
    /// Position in the recency queue
    tick: u64,
    /// Enumeration position
    seq: u64,
}

/// URL-keyed record table with a name index, LRU eviction and idle expiry.
#[derive(Debug)]
pub struct RecordStore {
    records: HashMap<String, Entry>,
    names: HashMap<String, BTreeSet<String>>,
    recency: BTreeMap<u64, String>,
    capacity: usize,
    idle: Duration,
    next_tick: u64,
    next_seq: u64,
    stats: CacheStats,
}

impl RecordStore {
    pub fn new(capacity: usize, idle: Duration) -> Self {
        Self {
            records: HashMap::new(),
            names: HashMap::new(),
            recency: BTreeMap::new(),
            capacity: capacity.max(1),
            idle,
            next_tick: 0,
            next_seq: 0,
            stats: CacheStats::default(),
        }
    }

    /// Insert or overwrite a record under its URL and name. An overwritten
    /// record keeps its enumeration position.
    pub fn put(&mut self, record: Record, now: Instant) {
        self.insert(record, now, false);
    }

    /// Insert or overwrite a record and move it to the end of the
    /// enumeration order. Storing a crawled collection this way, in upstream
    /// order, makes later enumeration return it in that same order.
    pub fn put_last(&mut self, record: Record, now: Instant) {
        self.insert(record, now, true);
    }

    fn insert(&mut self, record: Record, now: Instant, reseat: bool) {
        self.purge_expired(now);

        let key = url_key(record.url());
        let name = record.name().map(name_key);
        let tick = self.bump_tick();

        let kept = self.records.remove(&key).map(|old| {
            self.recency.remove(&old.tick);
            if let Some(old_name) = old.name {
                if name.as_ref() != Some(&old_name) {
                    self.unlink_name(&old_name, &key);
                }
            }
            old.seq
        });
        let seq = match kept {
            Some(seq) if !reseat => seq,
            _ => {
                self.next_seq += 1;
                self.next_seq
            }
        };

        if let Some(name) = &name {
            self.names
                .entry(name.clone())
                .or_default()
                .insert(key.clone());
        }
        self.recency.insert(tick, key.clone());
        self.records.insert(
            key,
            Entry {
                record,
                name,
                last_access: now,
                tick,
                seq,
            },
        );

        while self.records.len() > self.capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            log::debug!("Cache full, evicting {oldest}");
            self.remove(&oldest);
            self.stats.evictions += 1;
        }
    }

    /// Look up one record by URL, refreshing its access time.
    pub fn get_by_url(&mut self, url: &str, now: Instant) -> Option<Record> {
        self.purge_expired(now);
        let key = url_key(url);
        let found = self.touch(&key, now);
        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Cached subset of `urls`, in input order.
    pub fn get_many_by_url<S: AsRef<str>>(&mut self, urls: &[S], now: Instant) -> Vec<Record> {
        urls.iter()
            .filter_map(|url| self.get_by_url(url.as_ref(), now))
            .collect()
    }

    /// Records whose name contains `needle`, case-insensitively.
    pub fn get_by_name(&mut self, needle: &str, now: Instant) -> Vec<Record> {
        self.purge_expired(now);
        let needle = name_key(needle);
        let mut keys: Vec<String> = self
            .names
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect();
        self.sort_by_seq(&mut keys);

        let found: Vec<Record> = keys
            .iter()
            .filter_map(|key| self.touch(key, now))
            .collect();
        if found.is_empty() {
            self.stats.misses += 1;
        } else {
            self.stats.hits += found.len() as u64;
        }
        found
    }

    /// Records whose URL lies under `prefix`. Does not refresh access times.
    pub fn get_by_prefix(&mut self, prefix: &str, now: Instant) -> Vec<Record> {
        self.purge_expired(now);
        let prefix = url_key(prefix);
        self.collect_sorted(|key| key.starts_with(&prefix))
    }

    /// Every distinct record, in enumeration order. Does not refresh access
    /// times.
    pub fn all(&mut self, now: Instant) -> Vec<Record> {
        self.purge_expired(now);
        self.collect_sorted(|_| true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.records.len(),
            ..self.stats
        }
    }

    /// Drop every record idle for longer than the configured window.
    pub fn purge_expired(&mut self, now: Instant) {
        while let Some((_, key)) = self.recency.first_key_value() {
            let expired = self
                .records
                .get(key)
                .is_none_or(|entry| now.saturating_duration_since(entry.last_access) > self.idle);
            if !expired {
                break;
            }
            if let Some((_, key)) = self.recency.pop_first() {
                log::debug!("Cache entry {key} expired");
                self.remove(&key);
                self.stats.expirations += 1;
            }
        }
    }

    fn touch(&mut self, key: &str, now: Instant) -> Option<Record> {
        let tick = self.next_tick + 1;
        let entry = self.records.get_mut(key)?;
        self.next_tick = tick;
        self.recency.remove(&entry.tick);
        self.recency.insert(tick, key.to_string());
        entry.tick = tick;
        entry.last_access = now;
        Some(entry.record.clone())
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.records.remove(key) {
            self.recency.remove(&entry.tick);
            if let Some(name) = entry.name {
                self.unlink_name(&name, key);
            }
        }
    }

    /// Drop `key` from a name's entry, and the entry once it is empty.
    fn unlink_name(&mut self, name: &str, key: &str) {
        if let Some(keys) = self.names.get_mut(name) {
            keys.remove(key);
            if keys.is_empty() {
                self.names.remove(name);
            }
        }
    }

    fn bump_tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn sort_by_seq(&self, keys: &mut [String]) {
        keys.sort_by_key(|key| self.records.get(key).map(|e| e.seq).unwrap_or(u64::MAX));
    }

    fn collect_sorted(&self, keep: impl Fn(&str) -> bool) -> Vec<Record> {
        let mut entries: Vec<&Entry> = self
            .records
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|e| e.record.clone()).collect()
    }
}
