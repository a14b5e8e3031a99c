/// Market view aggregate
///
/// `MarketViewState` is the single source of truth for one selection's candle
/// series, ticker, order book and trade tape; everything the UI reads comes
/// out of it. `MarketView` wires the aggregate to the REST client and the two
/// push feeds, stamping every asynchronous result with the generation of the
/// selection that requested it so a slow fetch or a slow-to-close feed can
/// never corrupt a newer selection's state.
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::config::MarketClientConfig;
use crate::connection::{spawn_feed, FeedHandle};
use crate::error::ApiError;
use crate::indicators::{sma_overlays, SmaOverlay};
use crate::rest::{candle_feed_url, ticker_feed_url, MarketApi};
use crate::series::{CandleSeries, CandleUpdate};
use crate::types::{Candle, OrderBookSnapshot, Selection, TickerSnapshot, Trade, WireCandle};

/// View-level load status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewStatus {
    /// No selection yet
    #[default]
    Idle,
    /// Snapshot fetches in flight
    Loading,
    /// Snapshot applied, feeds live
    Ready,
    /// A snapshot fetch failed; nothing partial was applied. Reselect to retry.
    Error(String),
}

/// Derived state republished to subscribers after every mutation
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub selection: Option<Selection>,
    pub status: ViewStatus,
    /// Merged candle series, oldest first
    pub candles: Vec<Candle>,
    /// SMA overlays, one per configured period
    pub overlays: Vec<SmaOverlay>,
    pub ticker: TickerSnapshot,
    pub book: OrderBookSnapshot,
    /// Trade tape, most recent first
    pub tape: Vec<Trade>,
}

/// The owned aggregate behind the market screen.
///
/// All mutation funnels through the methods below; each taking a
/// `generation` compares it against the current one and drops stale input.
pub struct MarketViewState {
    selection: Option<Selection>,
    generation: u64,
    status: ViewStatus,
    series: CandleSeries,
    ticker: TickerSnapshot,
    book: OrderBookSnapshot,
    tape: Vec<Trade>,
    sma_periods: Vec<usize>,
    overlays: Vec<SmaOverlay>,
    candle_limit: usize,
    publisher: watch::Sender<MarketSnapshot>,
}

impl MarketViewState {
    pub fn new(
        sma_periods: Vec<usize>,
        candle_limit: usize,
    ) -> (Self, watch::Receiver<MarketSnapshot>) {
        let (publisher, subscriber) = watch::channel(MarketSnapshot::default());
        let state = Self {
            selection: None,
            generation: 0,
            status: ViewStatus::Idle,
            series: CandleSeries::new(candle_limit),
            ticker: TickerSnapshot::default(),
            book: OrderBookSnapshot::default(),
            tape: Vec::new(),
            sma_periods,
            overlays: Vec::new(),
            candle_limit,
            publisher,
        };
        (state, subscriber)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn ticker(&self) -> &TickerSnapshot {
        &self.ticker
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    /// Start a selection change. Returns the new generation to stamp the
    /// snapshot fetches and feeds with, or `None` when the selection already
    /// matches (re-selecting the current symbol is a no-op).
    pub fn begin_selection(&mut self, selection: Selection) -> Option<u64> {
        if self.selection.as_ref() == Some(&selection) {
            return None;
        }
        self.generation += 1;
        self.selection = Some(selection);
        self.status = ViewStatus::Loading;
        self.publish();
        Some(self.generation)
    }

    /// Apply the four parallel REST snapshots, all-or-nothing. Returns false
    /// when `generation` has been superseded; the results are then discarded
    /// without touching state.
    pub fn apply_snapshot(
        &mut self,
        generation: u64,
        candles: Vec<Candle>,
        ticker: TickerSnapshot,
        book: OrderBookSnapshot,
        mut tape: Vec<Trade>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale snapshot"
            );
            return false;
        }
        self.series = CandleSeries::seed(candles, self.candle_limit);
        self.ticker = ticker;
        self.book = book;
        tape.sort_by_key(|trade| std::cmp::Reverse(trade.timestamp));
        self.tape = tape;
        self.status = ViewStatus::Ready;
        self.recompute_overlays();
        self.publish();
        true
    }

    /// Record a failed snapshot fetch. Stale failures are ignored the same
    /// way stale successes are.
    pub fn snapshot_failed(&mut self, generation: u64, error: &ApiError) -> bool {
        if generation != self.generation {
            return false;
        }
        self.status = ViewStatus::Error(error.to_string());
        self.publish();
        true
    }

    /// Merge a partial ticker push update, field by field.
    pub fn apply_ticker_update(&mut self, generation: u64, update: &TickerSnapshot) -> bool {
        if generation != self.generation {
            return false;
        }
        self.ticker.merge_from(update);
        self.publish();
        true
    }

    /// Route a candle push update through the merger; on mutation the
    /// overlays are recomputed and the derived state republished.
    pub fn apply_candle_update(&mut self, generation: u64, update: CandleUpdate) -> bool {
        if generation != self.generation {
            return false;
        }
        if self.series.apply(update) {
            self.recompute_overlays();
            self.publish();
        }
        true
    }

    fn recompute_overlays(&mut self) {
        self.overlays = sma_overlays(&self.series.closes(), &self.sma_periods);
    }

    fn publish(&self) {
        let _ = self.publisher.send(MarketSnapshot {
            selection: self.selection.clone(),
            status: self.status.clone(),
            candles: self.series.to_vec(),
            overlays: self.overlays.clone(),
            ticker: self.ticker,
            book: self.book.clone(),
            tape: self.tape.clone(),
        });
    }
}

/// Ticker channel frame: a partial ticker, or an object carrying an error
/// marker (`error`; deployed backends send `hata`)
#[derive(Debug, Deserialize)]
struct TickerFrame {
    #[serde(default, alias = "hata")]
    error: Option<String>,
    #[serde(flatten)]
    ticker: TickerSnapshot,
}

/// Candle channel frame: a full replacement window, or an error-marker
/// object (`error` / `hata`)
#[derive(Debug, Deserialize)]
struct CandleFrame {
    #[serde(default, alias = "hata")]
    error: Option<String>,
    #[serde(default)]
    candles: Vec<WireCandle>,
}

/// Malformed payloads and explicit error payloads are dropped here; they are
/// noise, not connection failures, and never reach the aggregate.
fn parse_ticker_frame(raw: &str) -> Option<TickerSnapshot> {
    let frame: TickerFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("dropping malformed ticker frame: {}", e);
            return None;
        }
    };
    if let Some(error) = frame.error {
        debug!(%error, "dropping ticker error frame");
        return None;
    }
    Some(frame.ticker)
}

fn parse_candle_frame(raw: &str) -> Option<CandleUpdate> {
    let frame: CandleFrame = match serde_json::from_str(raw) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("dropping malformed candle frame: {}", e);
            return None;
        }
    };
    if let Some(error) = frame.error {
        debug!(%error, "dropping candle error frame");
        return None;
    }
    if frame.candles.is_empty() {
        return None;
    }
    Some(CandleUpdate::Window(
        frame.candles.into_iter().map(Candle::from).collect(),
    ))
}

#[derive(Default)]
struct ActiveFeeds {
    ticker: Option<FeedHandle>,
    candles: Option<FeedHandle>,
}

/// Orchestrates the aggregate, the REST client, and the push feeds for one
/// market screen.
pub struct MarketView {
    config: MarketClientConfig,
    api: MarketApi,
    state: Arc<Mutex<MarketViewState>>,
    feeds: Mutex<ActiveFeeds>,
    subscriber: watch::Receiver<MarketSnapshot>,
}

impl MarketView {
    pub fn new(config: MarketClientConfig) -> Self {
        let api = MarketApi::new(&config);
        let (state, subscriber) =
            MarketViewState::new(config.sma_periods.clone(), config.candle_limit);
        Self {
            config,
            api,
            state: Arc::new(Mutex::new(state)),
            feeds: Mutex::new(ActiveFeeds::default()),
            subscriber,
        }
    }

    /// Watch the derived state; every mutation republishes.
    pub fn subscribe(&self) -> watch::Receiver<MarketSnapshot> {
        self.subscriber.clone()
    }

    /// Current derived state
    pub fn snapshot(&self) -> MarketSnapshot {
        self.subscriber.borrow().clone()
    }

    /// The shared REST client, for collaborators (order entry, catalog)
    pub fn api(&self) -> &MarketApi {
        &self.api
    }

    /// Select a symbol on a venue, keeping the current timeframe.
    pub async fn select(&self, exchange: &str, symbol: &str) {
        let timeframe = self
            .state
            .lock()
            .selection()
            .map(|s| s.timeframe.clone())
            .unwrap_or_else(|| self.config.timeframe.clone());
        self.reload(Selection::new(exchange, symbol, timeframe))
            .await;
    }

    /// Switch timeframe for the current symbol.
    pub async fn select_timeframe(&self, timeframe: &str) {
        let Some(current) = self.state.lock().selection().cloned() else {
            warn!("select_timeframe with no active selection");
            return;
        };
        self.reload(Selection::new(
            current.exchange,
            current.symbol,
            timeframe,
        ))
        .await;
    }

    async fn reload(&self, selection: Selection) {
        let Some(generation) = self.state.lock().begin_selection(selection.clone()) else {
            debug!(%selection, "selection unchanged");
            return;
        };

        // Old feeds go down before the new snapshot comes in; their stale
        // messages are fenced by the generation bump either way.
        self.close_feeds();

        let result = tokio::try_join!(
            self.api.fetch_candles(&selection, self.config.candle_limit),
            self.api.fetch_ticker(&selection),
            self.api
                .fetch_order_book(&selection, self.config.orderbook_depth),
            self.api.fetch_trades(&selection, self.config.trade_limit),
        );

        match result {
            Ok((candles, ticker, book, tape)) => {
                let applied = self
                    .state
                    .lock()
                    .apply_snapshot(generation, candles, ticker, book, tape);
                if applied {
                    self.open_feeds(generation, &selection);
                }
            }
            Err(e) => {
                warn!(%selection, "snapshot fetch failed: {}", e);
                self.state.lock().snapshot_failed(generation, &e);
            }
        }
    }

    fn close_feeds(&self) {
        let mut feeds = self.feeds.lock();
        if let Some(feed) = feeds.ticker.take() {
            feed.close();
        }
        if let Some(feed) = feeds.candles.take() {
            feed.close();
        }
    }

    fn open_feeds(&self, generation: u64, selection: &Selection) {
        let ticker_url = match ticker_feed_url(
            &self.config.ws_base,
            selection,
            self.config.ticker_interval_sec,
        ) {
            Ok(url) => url,
            Err(e) => {
                error!("invalid ticker feed url: {}", e);
                return;
            }
        };
        let candle_url = match candle_feed_url(
            &self.config.ws_base,
            selection,
            self.config.candle_limit,
            self.config.candle_interval_sec,
        ) {
            Ok(url) => url,
            Err(e) => {
                error!("invalid candle feed url: {}", e);
                return;
            }
        };

        let state = Arc::clone(&self.state);
        let ticker_feed = spawn_feed(
            ticker_url,
            self.config.reconnect_delay,
            generation,
            move |raw| {
                if let Some(update) = parse_ticker_frame(raw) {
                    state.lock().apply_ticker_update(generation, &update);
                }
            },
        );

        let state = Arc::clone(&self.state);
        let candle_feed = spawn_feed(
            candle_url,
            self.config.reconnect_delay,
            generation,
            move |raw| {
                if let Some(update) = parse_candle_frame(raw) {
                    state.lock().apply_candle_update(generation, update);
                }
            },
        );

        let mut feeds = self.feeds.lock();
        // A newer selection may have raced past its own open_feeds while
        // this reload was still in flight; its feeds must not be displaced
        // by superseded ones. Dropping the fresh handles aborts their tasks.
        if self.state.lock().generation() != generation {
            debug!(generation, "discarding feeds for superseded selection");
            return;
        }
        feeds.ticker = Some(ticker_feed);
        feeds.candles = Some(candle_feed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open_time: i64, close: f64) -> Candle {
        Candle {
            open_time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    fn ticker(last: f64) -> TickerSnapshot {
        TickerSnapshot {
            last: Some(last),
            ..Default::default()
        }
    }

    fn trade(timestamp: i64) -> Trade {
        Trade {
            price: 100.0,
            amount: 1.0,
            side: crate::types::Side::Buy,
            timestamp,
        }
    }

    fn new_state() -> (MarketViewState, watch::Receiver<MarketSnapshot>) {
        MarketViewState::new(vec![2], 100)
    }

    #[test]
    fn test_reselecting_current_selection_is_noop() {
        let (mut state, _rx) = new_state();
        let selection = Selection::new("binance", "BTC/USDT", "1h");

        let generation = state.begin_selection(selection.clone()).unwrap();
        assert_eq!(generation, 1);
        assert_eq!(state.status(), &ViewStatus::Loading);

        assert_eq!(state.begin_selection(selection), None);
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let (mut state, rx) = new_state();
        let gen_a = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();
        let gen_b = state
            .begin_selection(Selection::new("binance", "ETH/USDT", "1h"))
            .unwrap();

        // A's fetch resolves after B was selected: discarded wholesale
        let applied = state.apply_snapshot(
            gen_a,
            vec![candle(1, 10.0)],
            ticker(10.0),
            OrderBookSnapshot::default(),
            vec![],
        );
        assert!(!applied);
        assert_eq!(state.status(), &ViewStatus::Loading);
        assert!(state.series().is_empty());

        // B's data is the only data ever applied
        assert!(state.apply_snapshot(
            gen_b,
            vec![candle(1, 2000.0)],
            ticker(2000.0),
            OrderBookSnapshot::default(),
            vec![],
        ));
        assert_eq!(state.status(), &ViewStatus::Ready);
        assert_eq!(rx.borrow().ticker.last, Some(2000.0));
        assert_eq!(
            rx.borrow().selection.as_ref().unwrap().symbol,
            "ETH/USDT"
        );
    }

    #[test]
    fn test_snapshot_failure_is_all_or_nothing() {
        let (mut state, rx) = new_state();
        let generation = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();

        let error = ApiError::Status(502);
        assert!(state.snapshot_failed(generation, &error));
        assert!(matches!(state.status(), ViewStatus::Error(_)));
        assert!(state.series().is_empty());
        assert!(matches!(rx.borrow().status, ViewStatus::Error(_)));
    }

    #[test]
    fn test_stale_push_updates_mutate_nothing() {
        let (mut state, rx) = new_state();
        let gen_old = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();
        state.apply_snapshot(
            gen_old,
            vec![candle(1, 10.0)],
            ticker(10.0),
            OrderBookSnapshot::default(),
            vec![],
        );
        let gen_new = state
            .begin_selection(Selection::new("binance", "ETH/USDT", "1h"))
            .unwrap();

        // Push from the superseded subscription, delivered after close
        assert!(!state.apply_ticker_update(gen_old, &ticker(999.0)));
        assert!(!state.apply_candle_update(gen_old, CandleUpdate::Latest(candle(2, 999.0))));

        assert_eq!(state.ticker().last, Some(10.0));
        assert_eq!(state.series().len(), 1);
        assert!(gen_new > gen_old);
        // Nothing was republished by the stale updates
        assert_eq!(rx.borrow().status, ViewStatus::Loading);
    }

    #[test]
    fn test_ticker_push_merges_field_by_field() {
        let (mut state, _rx) = new_state();
        let generation = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();
        state.apply_snapshot(
            generation,
            vec![],
            TickerSnapshot {
                last: Some(100.0),
                change_24h: Some(2.5),
                ..Default::default()
            },
            OrderBookSnapshot::default(),
            vec![],
        );

        assert!(state.apply_ticker_update(generation, &ticker(105.0)));
        assert_eq!(state.ticker().last, Some(105.0));
        assert_eq!(state.ticker().change_24h, Some(2.5));
    }

    #[test]
    fn test_candle_push_recomputes_overlays() {
        let (mut state, rx) = new_state();
        let generation = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();
        state.apply_snapshot(
            generation,
            vec![candle(1, 10.0)],
            ticker(10.0),
            OrderBookSnapshot::default(),
            vec![],
        );

        let window = vec![candle(1, 10.0), candle(2, 20.0), candle(3, 30.0)];
        assert!(state.apply_candle_update(generation, CandleUpdate::Window(window)));

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.candles.len(), 3);
        assert_eq!(snapshot.overlays.len(), 1);
        assert_eq!(snapshot.overlays[0].period, 2);
        assert_eq!(
            snapshot.overlays[0].values,
            vec![None, Some(15.0), Some(25.0)]
        );
    }

    #[test]
    fn test_tape_is_most_recent_first() {
        let (mut state, rx) = new_state();
        let generation = state
            .begin_selection(Selection::new("binance", "BTC/USDT", "1h"))
            .unwrap();
        state.apply_snapshot(
            generation,
            vec![],
            ticker(10.0),
            OrderBookSnapshot::default(),
            vec![trade(1), trade(3), trade(2)],
        );

        let stamps: Vec<i64> = rx.borrow().tape.iter().map(|t| t.timestamp).collect();
        assert_eq!(stamps, vec![3, 2, 1]);
    }

    #[test]
    fn test_parse_ticker_frame_drops_errors_and_garbage() {
        assert!(parse_ticker_frame("not json").is_none());
        assert!(parse_ticker_frame(r#"{"error": "venue down", "symbol": "BTC/USDT"}"#).is_none());

        let update = parse_ticker_frame(r#"{"last": 101.0, "percentage": 1.5}"#).unwrap();
        assert_eq!(update.last, Some(101.0));
        assert_eq!(update.change_24h, Some(1.5));
    }

    #[test]
    fn test_parse_frames_drop_backend_error_marker() {
        // Deployed backends mark push errors with "hata"; such frames must
        // never reach the aggregate as empty partial updates
        assert!(parse_ticker_frame(r#"{"hata": "kaynak yok", "sembol": "BTC/USDT"}"#).is_none());
        assert!(parse_candle_frame(r#"{"hata": "kaynak yok", "candles": []}"#).is_none());
        assert!(
            parse_candle_frame(r#"{"hata": "kaynak yok", "candles": [[1, 1.0, 2.0, 0.5, 1.5, 10.0]]}"#)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_superseded_reload_cannot_displace_newer_feeds() {
        // Unroutable endpoints: the feed tasks just cycle in the background
        let config = MarketClientConfig::new(
            "http://127.0.0.1:9/api/v1",
            "ws://127.0.0.1:9/api/v1/ws",
        );
        let view = MarketView::new(config);

        let old_selection = Selection::new("binance", "BTC/USDT", "1h");
        let new_selection = Selection::new("binance", "ETH/USDT", "1h");
        let gen_old = view
            .state
            .lock()
            .begin_selection(old_selection.clone())
            .unwrap();
        let gen_new = view
            .state
            .lock()
            .begin_selection(new_selection.clone())
            .unwrap();

        view.open_feeds(gen_new, &new_selection);
        // The older reload finishes last; its feeds must not replace the
        // newer selection's feeds
        view.open_feeds(gen_old, &old_selection);

        let feeds = view.feeds.lock();
        assert_eq!(feeds.ticker.as_ref().unwrap().generation(), gen_new);
        assert_eq!(feeds.candles.as_ref().unwrap().generation(), gen_new);
    }

    #[test]
    fn test_parse_candle_frame_window() {
        assert!(parse_candle_frame("{}").is_none());
        assert!(parse_candle_frame(r#"{"error": "venue down"}"#).is_none());

        let update =
            parse_candle_frame(r#"{"candles": [[1, 1.0, 2.0, 0.5, 1.5, 10.0]]}"#).unwrap();
        match update {
            CandleUpdate::Window(candles) => {
                assert_eq!(candles.len(), 1);
                assert_eq!(candles[0].close, 1.5);
            }
            CandleUpdate::Latest(_) => panic!("expected a window update"),
        }
    }
}
