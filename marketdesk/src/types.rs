/// Core data types for the live market view
///
/// These types match the JSON shapes served by the dashboard backend's
/// `markets/*` REST endpoints and its `ws/ticker` / `ws/ohlcv` push channels.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar.
///
/// `open_time` (ms since epoch) is the natural key: a series holds at most one
/// candle per open time. The most recent bar is still forming and may be
/// replaced in place by push updates; earlier bars are immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    /// Bar open time, ms since epoch
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Wire form of a candle: `[open_time_ms, open, high, low, close, volume]`
#[derive(Debug, Deserialize)]
pub(crate) struct WireCandle(
    pub i64, // 0: open time (ms)
    pub f64, // 1: open
    pub f64, // 2: high
    pub f64, // 3: low
    pub f64, // 4: close
    pub f64, // 5: volume
);

impl From<WireCandle> for Candle {
    fn from(wire: WireCandle) -> Self {
        Self {
            open_time: wire.0,
            open: wire.1,
            high: wire.2,
            low: wire.3,
            close: wire.4,
            volume: wire.5,
        }
    }
}

/// 24h ticker snapshot with partial-update semantics.
///
/// Push updates may carry any subset of fields; merging is field-by-field and
/// an absent field never erases the previous value (see [`merge_from`]).
///
/// [`merge_from`]: TickerSnapshot::merge_from
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct TickerSnapshot {
    /// Last traded price
    #[serde(default)]
    pub last: Option<f64>,
    /// 24h change, percent (some feeds name this `percentage`)
    #[serde(default, alias = "percentage")]
    pub change_24h: Option<f64>,
    /// 24h high
    #[serde(default, alias = "high")]
    pub high_24h: Option<f64>,
    /// 24h low
    #[serde(default, alias = "low")]
    pub low_24h: Option<f64>,
    /// 24h base volume
    #[serde(default, alias = "baseVolume")]
    pub volume: Option<f64>,
}

impl TickerSnapshot {
    /// Merge a partial update into this snapshot, field by field.
    pub fn merge_from(&mut self, update: &TickerSnapshot) {
        if update.last.is_some() {
            self.last = update.last;
        }
        if update.change_24h.is_some() {
            self.change_24h = update.change_24h;
        }
        if update.high_24h.is_some() {
            self.high_24h = update.high_24h;
        }
        if update.low_24h.is_some() {
            self.low_24h = update.low_24h;
        }
        if update.volume.is_some() {
            self.volume = update.volume;
        }
    }
}

/// Price/quantity level in an order book (wire: `[price, amount]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "(Decimal, Decimal)")]
pub struct Level {
    /// Price level
    pub price: Decimal,
    /// Quantity at this level
    pub amount: Decimal,
}

impl Level {
    pub fn new(price: Decimal, amount: Decimal) -> Self {
        Self { price, amount }
    }

    /// Quote value resting at this level
    pub fn notional(&self) -> Decimal {
        self.price * self.amount
    }
}

impl From<(Decimal, Decimal)> for Level {
    fn from((price, amount): (Decimal, Decimal)) -> Self {
        Self { price, amount }
    }
}

/// Order book snapshot, replaced wholesale on each update.
///
/// Invariant: bids descending by price, asks ascending. Normalised on
/// construction since upstream ordering is not guaranteed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBookSnapshot {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

impl OrderBookSnapshot {
    pub fn new(mut bids: Vec<Level>, mut asks: Vec<Level>) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self { bids, asks }
    }

    /// Best bid (highest buy order)
    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.first()
    }

    /// Best ask (lowest sell order)
    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.first()
    }

    /// Bid-ask spread
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.price + ask.price) / Decimal::from(2)),
            _ => None,
        }
    }
}

/// Order side (Buy or Sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Check if this is a buy
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }

    /// Check if this is a sell
    pub fn is_sell(&self) -> bool {
        matches!(self, Side::Sell)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single tape trade
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    /// Execution price
    pub price: f64,
    /// Trade size (base currency)
    pub amount: f64,
    /// Buyer vs seller initiated
    pub side: Side,
    /// Execution time, ms since epoch
    pub timestamp: i64,
}

/// The market view's current selection: one symbol on one venue at one
/// timeframe. Equality drives idempotent re-selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Venue name, e.g. "binance"
    pub exchange: String,
    /// Trading pair, e.g. "BTC/USDT"
    pub symbol: String,
    /// Candle timeframe, e.g. "1h"
    pub timeframe: String,
}

impl Selection {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.exchange, self.symbol, self.timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn test_side_display() {
        assert_eq!(Side::Buy.to_string(), "buy");
        assert_eq!(Side::Sell.to_string(), "sell");
    }

    #[test]
    fn test_side_checks() {
        assert!(Side::Buy.is_buy());
        assert!(!Side::Buy.is_sell());
        assert!(Side::Sell.is_sell());
        assert!(!Side::Sell.is_buy());
    }

    #[test]
    fn test_wire_candle_decodes_from_array() {
        let candle: Candle = serde_json::from_str::<WireCandle>(
            "[1700000000000, 100.0, 110.0, 95.0, 105.0, 12.5]",
        )
        .unwrap()
        .into();

        assert_eq!(candle.open_time, 1_700_000_000_000);
        assert_eq!(candle.open, 100.0);
        assert_eq!(candle.high, 110.0);
        assert_eq!(candle.low, 95.0);
        assert_eq!(candle.close, 105.0);
        assert_eq!(candle.volume, 12.5);
    }

    #[test]
    fn test_ticker_partial_merge_keeps_absent_fields() {
        let mut ticker = TickerSnapshot {
            last: Some(100.0),
            change_24h: Some(2.5),
            ..Default::default()
        };

        let update = TickerSnapshot {
            last: Some(105.0),
            ..Default::default()
        };
        ticker.merge_from(&update);

        assert_eq!(ticker.last, Some(105.0));
        assert_eq!(ticker.change_24h, Some(2.5));
    }

    #[test]
    fn test_ticker_accepts_percentage_alias() {
        let update: TickerSnapshot =
            serde_json::from_str(r#"{"last": 101.5, "percentage": -1.2}"#).unwrap();
        assert_eq!(update.last, Some(101.5));
        assert_eq!(update.change_24h, Some(-1.2));
    }

    #[test]
    fn test_orderbook_normalises_ordering() {
        let level = |p: f64, a: f64| {
            Level::new(
                Decimal::from_f64(p).unwrap(),
                Decimal::from_f64(a).unwrap(),
            )
        };
        let book = OrderBookSnapshot::new(
            vec![level(99.0, 1.0), level(100.0, 2.0)],
            vec![level(101.0, 1.0), level(100.5, 3.0)],
        );

        assert_eq!(book.best_bid().unwrap().price, Decimal::from(100));
        assert_eq!(book.best_ask().unwrap(), &level(100.5, 3.0));
        assert_eq!(book.spread(), Decimal::from_f64(0.5));
        assert_eq!(book.mid_price(), Decimal::from_f64(100.25));
    }

    #[test]
    fn test_trade_decodes_lowercase_side() {
        let trade: Trade = serde_json::from_str(
            r#"{"price": 100.0, "amount": 0.5, "side": "sell", "timestamp": 1700000000000}"#,
        )
        .unwrap();
        assert!(trade.side.is_sell());
    }
}
