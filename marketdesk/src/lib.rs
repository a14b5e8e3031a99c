/// Marketdesk - Live Market View & Order Entry Client
///
/// Client-side core of the marketdesk trading dashboard: keeps one symbol's
/// price history, ticker, order book and trade tape continuously up to date
/// by combining REST snapshots with auto-reconnecting push feeds, derives
/// SMA overlays from the merged series, and submits discretionary paper
/// orders against the same live state.
///
/// The library includes:
/// - Core data types for candles, tickers, order books and trades
/// - Push feed supervision with fixed-delay reconnection
/// - Snapshot/push series merging and rolling indicators
/// - The market view aggregate with generation-fenced mutation
/// - Quick-order validation and submission
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod indicators;
pub mod order;
pub mod rest;
pub mod series;
pub mod types;
pub mod view;

// Re-export commonly used types for convenience
pub use catalog::SymbolCatalog;
pub use config::MarketClientConfig;
pub use connection::{spawn_feed, FeedHandle, FeedLifecycle, FeedStatus};
pub use error::{ApiError, OrderError};
pub use indicators::{rolling_average, sma_overlays, SmaOverlay};
pub use order::{OrderController, OrderForm, OrderIntent, OrderPhase, OrderType};
pub use rest::{candle_feed_url, ticker_feed_url, MarketApi, OrderAck, OrderRequest};
pub use series::{CandleSeries, CandleUpdate};
pub use types::{Candle, Level, OrderBookSnapshot, Selection, Side, TickerSnapshot, Trade};
pub use view::{MarketSnapshot, MarketView, MarketViewState, ViewStatus};
