/// Candle series merging
///
/// Reconciles the REST-fetched history snapshot with incremental push
/// updates into one ordered, deduplicated, length-bounded series.
use std::collections::VecDeque;

use crate::types::Candle;

/// One push update for the candle series.
///
/// The live candle channel in this system re-sends its whole recent window
/// each interval, so `Window` replacement is the operative mode; `Latest`
/// covers single-bar feeds. A delta-based variant could be added here without
/// touching callers.
#[derive(Debug, Clone)]
pub enum CandleUpdate {
    /// The forming (or next) bar alone
    Latest(Candle),
    /// Full replacement of the recent window
    Window(Vec<Candle>),
}

/// Ordered candle sequence keyed by open time.
///
/// Invariants: strictly increasing `open_time`, no duplicate keys, at most
/// `max_len` entries (oldest evicted first). The last entry is the forming
/// bar and the only one ever mutated in place.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
    max_len: usize,
}

impl CandleSeries {
    /// Create an empty series bounded to `max_len` bars.
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            candles: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    /// Establish the series from a REST snapshot (expected time-ordered).
    /// Entries that would break the strictly-increasing invariant are dropped.
    pub fn seed(candles: Vec<Candle>, max_len: usize) -> Self {
        let mut series = Self::new(max_len);
        for candle in candles {
            series.apply_latest(candle);
        }
        series
    }

    /// Apply one push update. Returns whether the series changed, so callers
    /// know to recompute indicators. Applying the same update twice yields
    /// the same series and reports no change the second time.
    pub fn apply(&mut self, update: CandleUpdate) -> bool {
        match update {
            CandleUpdate::Latest(candle) => self.apply_latest(candle),
            CandleUpdate::Window(window) => self.apply_window(window),
        }
    }

    fn apply_latest(&mut self, candle: Candle) -> bool {
        if let Some(last) = self.candles.back_mut() {
            if candle.open_time == last.open_time {
                // Forming bar updated in place
                if *last == candle {
                    return false;
                }
                *last = candle;
                return true;
            }
            if candle.open_time < last.open_time {
                // Stale or out-of-order, discard
                return false;
            }
        }
        self.candles.push_back(candle);
        if self.candles.len() > self.max_len {
            self.candles.pop_front();
        }
        true
    }

    fn apply_window(&mut self, window: Vec<Candle>) -> bool {
        if window.is_empty() || !strictly_increasing(&window) {
            return false;
        }
        let start = window.len().saturating_sub(self.max_len);
        let trimmed = &window[start..];
        if self.candles.len() == trimmed.len() && self.candles.iter().eq(trimmed.iter()) {
            return false;
        }
        self.candles.clear();
        self.candles.extend(trimmed.iter().copied());
        true
    }

    /// The most recent (forming) bar
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Close prices, oldest first
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|candle| candle.close).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

fn strictly_increasing(candles: &[Candle]) -> bool {
    candles
        .windows(2)
        .all(|pair| pair[0].open_time < pair[1].open_time)
}
