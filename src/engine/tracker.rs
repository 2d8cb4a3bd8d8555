use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::settings::TrackerConfig;

/// Opportunistic sweeps run at most this often, independent of the host's
/// own eviction loop.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// What the tracker knows about a session at observation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSnapshot {
    pub sample_count: usize,
    /// Requests per second over the retained window. Zero below 2 samples.
    pub frequency: f64,
    /// Variance of inter-arrival intervals, in ms^2.
    pub interval_variance_ms2: f64,
    /// Low-jitter mechanical timing. Only meaningful once enough samples
    /// accumulated; false below that.
    pub is_rhythmic: bool,
}

impl PatternSnapshot {
    fn baseline(sample_count: usize) -> Self {
        Self {
            sample_count,
            frequency: 0.0,
            interval_variance_ms2: 0.0,
            is_rhythmic: false,
        }
    }
}

struct SessionHistory {
    timestamps: VecDeque<Instant>,
    last_seen: Instant,
}

/// Per-session request timing history — the only stateful piece of the
/// engine.
///
/// `DashMap` shards give per-key serialization: concurrent observations
/// of the same session queue on the shard lock, so the read-modify-write
/// of its timestamp list is never torn, while different sessions proceed
/// in parallel. Idle sessions are evicted, both opportunistically on
/// observation and by the host's periodic [`cleanup`](Self::cleanup).
pub struct RequestPatternTracker {
    sessions: DashMap<String, SessionHistory>,
    config: TrackerConfig,
    last_sweep: Mutex<Instant>,
}

impl RequestPatternTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config: config.clone(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Record a request for the session and return the updated snapshot.
    pub fn observe(&self, session_id: &str) -> PatternSnapshot {
        self.observe_at(session_id, Instant::now())
    }

    /// Record with an explicit timestamp. Exposed for deterministic tests;
    /// production callers use [`observe`](Self::observe).
    pub fn observe_at(&self, session_id: &str, now: Instant) -> PatternSnapshot {
        // Sweep before taking the entry: retain() on the same shard while
        // holding an entry guard would deadlock.
        self.maybe_sweep();

        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionHistory {
                timestamps: VecDeque::with_capacity(self.config.max_samples),
                last_seen: now,
            });

        entry.timestamps.push_back(now);
        while entry.timestamps.len() > self.config.max_samples {
            entry.timestamps.pop_front();
        }
        entry.last_seen = now;

        self.snapshot_of(&entry.timestamps)
    }

    fn snapshot_of(&self, timestamps: &VecDeque<Instant>) -> PatternSnapshot {
        let count = timestamps.len();
        if count < 2 {
            return PatternSnapshot::baseline(count);
        }

        let first = timestamps.front().copied().unwrap_or_else(Instant::now);
        let last = timestamps.back().copied().unwrap_or(first);
        let span_secs = last.duration_since(first).as_secs_f64();

        // A burst landing within one tick still reads as per-second volume.
        let frequency = if span_secs > 0.0 {
            count as f64 / span_secs
        } else {
            count as f64
        };

        let intervals: Vec<f64> = timestamps
            .iter()
            .zip(timestamps.iter().skip(1))
            .map(|(a, b)| b.duration_since(*a).as_secs_f64() * 1000.0)
            .collect();

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let variance = intervals
            .iter()
            .map(|i| (i - mean).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;

        let is_rhythmic = count >= self.config.min_rhythm_samples
            && variance < self.config.rhythm_variance_ms2;

        PatternSnapshot {
            sample_count: count,
            frequency,
            interval_variance_ms2: variance,
            is_rhythmic,
        }
    }

    /// Evict sessions idle longer than the configured TTL.
    pub fn cleanup(&self) {
        let ttl = Duration::from_secs(self.config.session_ttl_secs);
        let before = self.sessions.len();
        self.sessions
            .retain(|_, history| history.last_seen.elapsed() < ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted = evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
    }

    pub fn tracked_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn maybe_sweep(&self) {
        let mut last = match self.last_sweep.try_lock() {
            Some(guard) => guard,
            None => return,
        };
        if last.elapsed() < SWEEP_INTERVAL {
            return;
        }
        *last = Instant::now();
        drop(last);
        self.cleanup();
    }
}
