/// REST client for market snapshots and order submission
///
/// Thin wrapper over `reqwest` for the backend's `markets/*` and
/// `orders/paper` endpoints, plus URL builders for the two push channels.
/// Every call carries the configured bearer credential and an explicit
/// per-request timeout; a hung backend fails the call instead of pinning
/// the view in its loading state.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use rust_decimal::Decimal;
use url::Url;

use crate::config::MarketClientConfig;
use crate::error::ApiError;
use crate::types::{
    Candle, Level, OrderBookSnapshot, Selection, Side, TickerSnapshot, Trade, WireCandle,
};

#[derive(Debug, Deserialize)]
struct OhlcvResponse {
    #[serde(default)]
    candles: Vec<WireCandle>,
}

#[derive(Debug, Deserialize)]
struct OrderBookResponse {
    #[serde(default)]
    bids: Vec<Level>,
    #[serde(default)]
    asks: Vec<Level>,
}

#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    trades: Vec<Trade>,
}

#[derive(Debug, Deserialize)]
struct SymbolsResponse {
    #[serde(default)]
    symbols: Vec<String>,
}

/// Body for `POST orders/paper`
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    /// Limit price; `None` submits at market
    pub price: Option<Decimal>,
    /// Always absent for discretionary quick orders
    pub strategy_id: Option<i64>,
    pub exchange: String,
}

/// Backend verdict on a submitted order
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// REST client bound to one backend
#[derive(Debug, Clone)]
pub struct MarketApi {
    http: reqwest::Client,
    api_base: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl MarketApi {
    pub fn new(config: &MarketClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            timeout: config.request_timeout,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(format!("{}/{}", self.api_base, path))
            .timeout(self.timeout);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// `GET markets/ohlcv` - historical candle snapshot, oldest first
    pub async fn fetch_candles(
        &self,
        selection: &Selection,
        limit: usize,
    ) -> Result<Vec<Candle>, ApiError> {
        let request = self.get("markets/ohlcv").query(&[
            ("exchange", selection.exchange.as_str()),
            ("symbol", selection.symbol.as_str()),
            ("timeframe", selection.timeframe.as_str()),
            ("limit", &limit.to_string()),
        ]);
        let response: OhlcvResponse = Self::send(request).await?;
        Ok(response.candles.into_iter().map(Candle::from).collect())
    }

    /// `GET markets/ticker` - current 24h ticker
    pub async fn fetch_ticker(&self, selection: &Selection) -> Result<TickerSnapshot, ApiError> {
        let request = self.get("markets/ticker").query(&[
            ("exchange", selection.exchange.as_str()),
            ("symbol", selection.symbol.as_str()),
        ]);
        Self::send(request).await
    }

    /// `GET markets/orderbook` - depth snapshot, normalised on construction
    pub async fn fetch_order_book(
        &self,
        selection: &Selection,
        depth: usize,
    ) -> Result<OrderBookSnapshot, ApiError> {
        let request = self.get("markets/orderbook").query(&[
            ("exchange", selection.exchange.as_str()),
            ("symbol", selection.symbol.as_str()),
            ("limit", &depth.to_string()),
        ]);
        let response: OrderBookResponse = Self::send(request).await?;
        Ok(OrderBookSnapshot::new(response.bids, response.asks))
    }

    /// `GET markets/trades` - recent tape, as delivered by the backend
    pub async fn fetch_trades(
        &self,
        selection: &Selection,
        limit: usize,
    ) -> Result<Vec<Trade>, ApiError> {
        let request = self.get("markets/trades").query(&[
            ("exchange", selection.exchange.as_str()),
            ("symbol", selection.symbol.as_str()),
            ("limit", &limit.to_string()),
        ]);
        let response: TradesResponse = Self::send(request).await?;
        Ok(response.trades)
    }

    /// `GET markets/symbols` - tradable pairs on a venue
    pub async fn fetch_symbols(&self, exchange: &str) -> Result<Vec<String>, ApiError> {
        let request = self.get("markets/symbols").query(&[("exchange", exchange)]);
        let response: SymbolsResponse = Self::send(request).await?;
        Ok(response.symbols)
    }

    /// `POST orders/paper` - submit a discretionary paper order
    pub async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, ApiError> {
        let mut request = self
            .http
            .post(format!("{}/orders/paper", self.api_base))
            .timeout(self.timeout)
            .json(order);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        Self::send(request).await
    }
}

/// Ticker push channel URL for one selection
pub fn ticker_feed_url(
    ws_base: &str,
    selection: &Selection,
    interval_sec: f64,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&format!("{}/ticker", ws_base.trim_end_matches('/')))?;
    url.query_pairs_mut()
        .append_pair("symbol", &selection.symbol)
        .append_pair("exchange", &selection.exchange)
        .append_pair("interval_sec", &interval_sec.to_string());
    Ok(url.into())
}

/// Candle push channel URL for one selection; the channel re-sends a full
/// `limit`-bar window every `interval_sec`
pub fn candle_feed_url(
    ws_base: &str,
    selection: &Selection,
    limit: usize,
    interval_sec: f64,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&format!("{}/ohlcv", ws_base.trim_end_matches('/')))?;
    url.query_pairs_mut()
        .append_pair("symbol", &selection.symbol)
        .append_pair("exchange", &selection.exchange)
        .append_pair("timeframe", &selection.timeframe)
        .append_pair("limit", &limit.to_string())
        .append_pair("interval_sec", &interval_sec.to_string());
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection::new("binance", "BTC/USDT", "1h")
    }

    #[test]
    fn test_ticker_feed_url_encodes_symbol() {
        let url = ticker_feed_url("ws://localhost:8000/api/v1/ws", &selection(), 3.0).unwrap();
        assert_eq!(
            url,
            "ws://localhost:8000/api/v1/ws/ticker?symbol=BTC%2FUSDT&exchange=binance&interval_sec=3"
        );
    }

    #[test]
    fn test_candle_feed_url_carries_window_params() {
        let url =
            candle_feed_url("ws://localhost:8000/api/v1/ws/", &selection(), 100, 30.0).unwrap();
        assert!(url.starts_with("ws://localhost:8000/api/v1/ws/ohlcv?"));
        assert!(url.contains("timeframe=1h"));
        assert!(url.contains("limit=100"));
        assert!(url.contains("interval_sec=30"));
    }

    #[test]
    fn test_order_request_serialises_market_order() {
        let order = OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            quantity: Decimal::new(1, 3), // 0.001
            price: None,
            strategy_id: None,
            exchange: "binance".to_string(),
        };
        let body: serde_json::Value = serde_json::to_value(&order).unwrap();
        assert_eq!(body["side"], "buy");
        assert_eq!(body["quantity"], "0.001");
        assert_eq!(body["price"], serde_json::Value::Null);
    }

    #[test]
    fn test_responses_tolerate_missing_fields() {
        let ack: OrderAck = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(ack.ok);
        assert!(ack.message.is_none());

        let book: OrderBookResponse = serde_json::from_str(r#"{"bids": [[100.0, 1.5]]}"#).unwrap();
        assert_eq!(book.bids.len(), 1);
        assert!(book.asks.is_empty());
    }
}
