/// Client configuration for the live market view
use std::time::Duration;

/// Configuration shared by the REST client, the push feeds, and the view.
#[derive(Debug, Clone)]
pub struct MarketClientConfig {
    /// REST base URL, e.g. "http://127.0.0.1:8000/api/v1"
    pub api_base: String,
    /// Push channel base URL, e.g. "ws://127.0.0.1:8000/api/v1/ws"
    pub ws_base: String,
    /// Bearer credential from the external session store, if any
    pub bearer_token: Option<String>,
    /// Default candle timeframe
    pub timeframe: String,
    /// Candle window length (bars kept for display)
    pub candle_limit: usize,
    /// Order book depth per side
    pub orderbook_depth: usize,
    /// Trade tape length
    pub trade_limit: usize,
    /// SMA overlay periods recomputed on every series change
    pub sma_periods: Vec<usize>,
    /// Fixed delay before a dropped feed reconnects
    pub reconnect_delay: Duration,
    /// Per-request REST timeout
    pub request_timeout: Duration,
    /// Server-side emit interval hint for the ticker channel, seconds
    pub ticker_interval_sec: f64,
    /// Server-side emit interval hint for the candle channel, seconds
    pub candle_interval_sec: f64,
}

impl Default for MarketClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000/api/v1".to_string(),
            ws_base: "ws://127.0.0.1:8000/api/v1/ws".to_string(),
            bearer_token: None,
            timeframe: "1h".to_string(),
            candle_limit: 100,
            orderbook_depth: 20,
            trade_limit: 50,
            sma_periods: vec![7, 20],
            reconnect_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            ticker_interval_sec: 3.0,
            candle_interval_sec: 30.0,
        }
    }
}

impl MarketClientConfig {
    /// Create a configuration with custom REST and push base URLs
    pub fn new(api_base: impl Into<String>, ws_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ws_base: ws_base.into(),
            ..Default::default()
        }
    }

    /// Set the bearer credential attached to REST calls
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the default timeframe
    pub fn with_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = timeframe.into();
        self
    }

    /// Set the candle window length
    pub fn with_candle_limit(mut self, limit: usize) -> Self {
        self.candle_limit = limit;
        self
    }

    /// Set the SMA overlay periods
    pub fn with_sma_periods(mut self, periods: Vec<usize>) -> Self {
        self.sma_periods = periods;
        self
    }

    /// Set the fixed reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the per-request REST timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MarketClientConfig::new("http://localhost:9000/api/v1", "ws://localhost:9000/api/v1/ws")
            .with_bearer_token("secret")
            .with_timeframe("15m")
            .with_candle_limit(250)
            .with_sma_periods(vec![9, 26])
            .with_reconnect_delay(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(30));

        assert_eq!(config.api_base, "http://localhost:9000/api/v1");
        assert_eq!(config.ws_base, "ws://localhost:9000/api/v1/ws");
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.timeframe, "15m");
        assert_eq!(config.candle_limit, 250);
        assert_eq!(config.sma_periods, vec![9, 26]);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_default_config() {
        let config = MarketClientConfig::default();
        assert_eq!(config.timeframe, "1h");
        assert_eq!(config.candle_limit, 100);
        assert_eq!(config.orderbook_depth, 20);
        assert_eq!(config.trade_limit, 50);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.bearer_token.is_none());
    }
}
