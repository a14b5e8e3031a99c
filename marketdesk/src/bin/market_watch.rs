//! Headless market viewer: selects one symbol, keeps the view live, and logs
//! every published snapshot. Useful for smoke-testing a backend without the
//! dashboard in front of it.

use chrono::DateTime;
use marketdesk::{MarketClientConfig, MarketView, ViewStatus};
use tracing::{info, warn};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    init_logging();

    // Configurable via env vars, matching the dashboard's defaults
    let api_base = env_or("MARKETDESK_API_BASE", "http://127.0.0.1:8000/api/v1");
    let ws_base = env_or("MARKETDESK_WS_BASE", "ws://127.0.0.1:8000/api/v1/ws");
    let exchange = env_or("MARKETDESK_EXCHANGE", "binance");
    let symbol = env_or("MARKETDESK_SYMBOL", "BTC/USDT");

    let mut config = MarketClientConfig::new(api_base, ws_base);
    if let Ok(token) = std::env::var("MARKETDESK_TOKEN") {
        config = config.with_bearer_token(token);
    }

    info!(exchange, symbol, "starting market watch");

    let view = MarketView::new(config);
    let mut snapshots = view.subscribe();

    view.select(&exchange, &symbol).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                match &snapshot.status {
                    ViewStatus::Error(reason) => {
                        warn!(%reason, "view error, reselect to retry");
                    }
                    status => {
                        let last = snapshot
                            .ticker
                            .last
                            .map(|l| l.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        let bar_time = snapshot
                            .candles
                            .last()
                            .and_then(|c| DateTime::from_timestamp_millis(c.open_time))
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "-".to_string());
                        info!(
                            ?status,
                            candles = snapshot.candles.len(),
                            %last,
                            %bar_time,
                            tape = snapshot.tape.len(),
                            "view updated"
                        );
                    }
                }
            }
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
