//! Per-session accumulation of recent fragments.
//!
//! A buffer lets the caller re-scan the concatenation of recent submissions
//! so a value split across several small fragments is still caught. Buffers
//! are bounded in size and in time: the oldest bytes are dropped from the
//! front once the cap is exceeded, and a buffer idle for longer than the
//! timeout is cleared on its next append. There is no background timer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::config::SessionConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionBuffer {
    contents: String,
    last_update: Option<DateTime<Utc>>,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// True once more than the idle timeout has passed since the last
    /// append. A clock that moved backwards never counts as idle.
    pub fn is_idle(&self, now: DateTime<Utc>, config: &SessionConfig) -> bool {
        self.last_update.is_some_and(|last| {
            (now - last)
                .to_std()
                .is_ok_and(|idle| idle > config.idle_timeout())
        })
    }

    /// Append `chunk` as of `now` and return the resulting contents.
    ///
    /// An idle buffer is cleared before the chunk goes in, so stale content
    /// never reaches the next scan.
    pub fn append_at(&mut self, chunk: &str, now: DateTime<Utc>, config: &SessionConfig) -> &str {
        if self.is_idle(now, config) {
            debug!(dropped_bytes = self.contents.len(), "session buffer reset after inactivity");
            self.contents.clear();
        }

        if !self.contents.is_empty() {
            self.contents.push_str(&config.separator);
        }
        self.contents.push_str(chunk);
        self.trim_front(config.max_bytes);
        self.last_update = Some(now);

        &self.contents
    }

    pub fn clear(&mut self) {
        self.contents.clear();
        self.last_update = None;
    }

    /// Keep at most the trailing `max` bytes, starting on a char boundary.
    fn trim_front(&mut self, max: usize) {
        let len = self.contents.len();
        if len <= max {
            return;
        }
        let mut cut = len - max;
        while !self.contents.is_char_boundary(cut) {
            cut += 1;
        }
        self.contents.drain(..cut);
        debug!(dropped_bytes = cut, retained_bytes = self.contents.len(), "session buffer trimmed");
    }
}

/// Session buffers keyed by caller-supplied session id.
///
/// Each buffer has its own lock; appends to different sessions never
/// contend with one another.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<SessionBuffer>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Append to the session, creating it on first use. Returns the buffer
    /// contents after the append.
    pub fn append(&self, id: &str, chunk: &str) -> String {
        self.append_at(id, chunk, Utc::now())
    }

    pub fn append_at(&self, id: &str, chunk: &str, now: DateTime<Utc>) -> String {
        // Clone the handle out so the map shard is unlocked before the
        // buffer lock is taken.
        let buffer = Arc::clone(&self.sessions.entry(id.to_string()).or_default());
        let mut buffer = buffer.lock();
        buffer.append_at(chunk, now, &self.config).to_string()
    }

    /// Current contents, or `None` for an unknown session.
    pub fn snapshot(&self, id: &str) -> Option<String> {
        let buffer = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        let contents = buffer.lock().contents().to_string();
        Some(contents)
    }

    /// Drop the session. Returns whether it existed.
    pub fn end(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop every session idle for longer than the timeout. Returns how many
    /// were removed.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, buffer| !buffer.lock().is_idle(now, &self.config));
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            debug!(pruned, remaining = self.sessions.len(), "idle sessions pruned");
        }
        pruned
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn config(max_bytes: usize) -> SessionConfig {
        SessionConfig {
            max_bytes,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn first_chunk_has_no_leading_separator() {
        let mut buf = SessionBuffer::new();
        assert_eq!(buf.append_at("hello", t0(), &SessionConfig::default()), "hello");
        assert_eq!(buf.append_at("world", t0(), &SessionConfig::default()), "hello world");
    }

    #[test]
    fn custom_separator_is_used() {
        let cfg = SessionConfig {
            separator: "\n".to_string(),
            ..SessionConfig::default()
        };
        let mut buf = SessionBuffer::new();
        buf.append_at("a", t0(), &cfg);
        assert_eq!(buf.append_at("b", t0(), &cfg), "a\nb");
    }

    #[test]
    fn overflow_keeps_trailing_window() {
        let cfg = config(10);
        let mut buf = SessionBuffer::new();
        buf.append_at("abcdef", t0(), &cfg);
        assert_eq!(buf.append_at("ghijkl", t0(), &cfg), "def ghijkl");
        assert_eq!(buf.contents().len(), 10);
    }

    #[test]
    fn trim_never_splits_a_character() {
        let cfg = config(3);
        let mut buf = SessionBuffer::new();
        buf.append_at("ab", t0(), &cfg);
        assert_eq!(buf.append_at("éé", t0(), &cfg), "é");
    }

    #[test]
    fn timeout_clears_before_append() {
        let cfg = SessionConfig::default();
        let mut buf = SessionBuffer::new();
        buf.append_at("stale", t0(), &cfg);

        let later = t0() + Duration::seconds(601);
        assert_eq!(buf.append_at("fresh", later, &cfg), "fresh");
        assert_eq!(buf.last_update(), Some(later));
    }

    #[test]
    fn exactly_the_timeout_is_not_idle() {
        let cfg = SessionConfig::default();
        let mut buf = SessionBuffer::new();
        buf.append_at("kept", t0(), &cfg);

        let later = t0() + Duration::seconds(600);
        assert_eq!(buf.append_at("too", later, &cfg), "kept too");
    }

    #[test]
    fn clock_moving_backwards_is_not_idle() {
        let cfg = SessionConfig::default();
        let mut buf = SessionBuffer::new();
        buf.append_at("kept", t0(), &cfg);
        assert!(!buf.is_idle(t0() - Duration::hours(2), &cfg));
    }

    #[test]
    fn store_creates_on_first_use_and_ends_explicitly() {
        let store = SessionStore::new(SessionConfig::default());
        assert_eq!(store.snapshot("tab-1"), None);

        assert_eq!(store.append_at("tab-1", "one", t0()), "one");
        assert_eq!(store.append_at("tab-1", "two", t0()), "one two");
        assert_eq!(store.snapshot("tab-1").as_deref(), Some("one two"));

        assert!(store.end("tab-1"));
        assert!(!store.end("tab-1"));
        assert_eq!(store.append_at("tab-1", "three", t0()), "three");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::default();
        store.append_at("a", "alpha", t0());
        store.append_at("b", "beta", t0());

        assert_eq!(store.snapshot("a").as_deref(), Some("alpha"));
        assert_eq!(store.snapshot("b").as_deref(), Some("beta"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn prune_drops_only_idle_sessions() {
        let store = SessionStore::new(SessionConfig::default());
        store.append_at("old", "x", t0());
        store.append_at("recent", "y", t0() + Duration::seconds(500));

        let pruned = store.prune_idle(t0() + Duration::seconds(700));
        assert_eq!(pruned, 1);
        assert!(!store.contains("old"));
        assert!(store.contains("recent"));
    }

    #[test]
    fn concurrent_appends_to_one_session_are_all_retained() {
        let store = Arc::new(SessionStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.append_at("shared", &i.to_string(), t0());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = store.snapshot("shared").unwrap();
        assert_eq!(snapshot.split(' ').count(), 80);
    }
}
