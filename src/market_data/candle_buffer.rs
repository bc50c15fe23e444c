use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Candle;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Composite key that identifies a unique candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub interval: String,
}

impl CandleKey {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.symbol, self.interval)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    candle: Candle,
    is_closed: bool,
}

// ---------------------------------------------------------------------------
// CandleBuffer -- thread-safe ring buffer per (symbol, interval)
// ---------------------------------------------------------------------------

/// Thread-safe ring-buffer that stores the most recent candles per
/// `(symbol, interval)` pair.  The live (unclosed) candle is continuously
/// updated in-place; when a candle closes it becomes permanent and the ring is
/// trimmed to `max_candles`.
pub struct CandleBuffer {
    buffers: RwLock<HashMap<CandleKey, VecDeque<Slot>>>,
    max_candles: usize,
}

impl CandleBuffer {
    /// Create a new buffer that retains at most `max_candles` closed candles per
    /// key, plus one in-progress candle.
    pub fn new(max_candles: usize) -> Self {
        Self {
            buffers: RwLock::new(HashMap::new()),
            max_candles,
        }
    }

    /// Insert or replace the latest candle for the given key.
    ///
    /// An update with the same open time as the in-progress candle replaces
    /// it. An in-progress candle whose close was never received is dropped
    /// once a later candle arrives. Closed candles are permanent; a stale
    /// update older than the last closed candle is ignored. Returns `true`
    /// when this update closed a candle.
    pub fn update(&self, key: CandleKey, candle: Candle, is_closed: bool) -> bool {
        let mut map = self.buffers.write();
        let ring = map
            .entry(key.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.max_candles + 1));

        if let Some(last) = ring.back() {
            if !last.is_closed && candle.timestamp >= last.candle.timestamp {
                if candle.timestamp > last.candle.timestamp {
                    debug!(
                        key = %key,
                        abandoned = %last.candle.timestamp.to_rfc3339(),
                        "close never received, dropping in-progress candle"
                    );
                }
                ring.pop_back();
            } else if candle.timestamp <= last.candle.timestamp {
                return false;
            }
        }

        ring.push_back(Slot { candle, is_closed });
        if is_closed {
            self.trim(ring);
        }
        is_closed
    }

    /// Load backfilled history; every candle is treated as closed.
    pub fn seed(&self, key: CandleKey, candles: impl IntoIterator<Item = Candle>) {
        let mut map = self.buffers.write();
        let ring = map
            .entry(key)
            .or_insert_with(|| VecDeque::with_capacity(self.max_candles + 1));
        ring.clear();
        for candle in candles {
            if ring.back().is_some_and(|last| candle.timestamp <= last.candle.timestamp) {
                continue;
            }
            ring.push_back(Slot { candle, is_closed: true });
        }
        self.trim(ring);
    }

    fn trim(&self, ring: &mut VecDeque<Slot>) {
        let closed = ring.iter().filter(|s| s.is_closed).count();
        let mut excess = closed.saturating_sub(self.max_candles);
        while excess > 0 {
            if let Some(front) = ring.pop_front() {
                if front.is_closed {
                    excess -= 1;
                }
            } else {
                break;
            }
        }
    }

    /// Return the most recent `count` **closed** candles (oldest-first order).
    pub fn get_closed(&self, key: &CandleKey, count: usize) -> Vec<Candle> {
        let map = self.buffers.read();
        match map.get(key) {
            Some(ring) => {
                let closed: Vec<&Candle> = ring.iter().filter(|s| s.is_closed).map(|s| &s.candle).collect();
                let start = closed.len().saturating_sub(count);
                closed[start..].iter().map(|c| (*c).clone()).collect()
            }
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
