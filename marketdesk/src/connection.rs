/// Push feed supervision
///
/// Owns the lifecycle of one WebSocket subscription: connect, listen, detect
/// termination, reconnect after a fixed delay, tear down. Payload semantics
/// live entirely in the `on_message` handler supplied by the caller.
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Connection status for one push feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    Connecting,
    Open,
    Reconnecting,
}

/// Transition tracker for one feed's connect/reconnect cycle.
///
/// Terminations map to reconnects one-to-one: `on_terminated` answers whether
/// a reconnect timer should be armed, and answers `false` while one is
/// already pending, so overlapping termination events (an error followed by a
/// close, say) never stack timers.
#[derive(Debug, Clone, Copy)]
pub struct FeedLifecycle {
    status: FeedStatus,
    reconnects: u64,
}

impl FeedLifecycle {
    pub fn new() -> Self {
        Self {
            status: FeedStatus::Connecting,
            reconnects: 0,
        }
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    /// Reconnects scheduled so far
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn on_connected(&mut self) {
        self.status = FeedStatus::Open;
    }

    /// Record a termination. Returns true if a reconnect should be scheduled
    /// (exactly once per termination).
    pub fn on_terminated(&mut self) -> bool {
        if self.status == FeedStatus::Reconnecting {
            return false;
        }
        self.status = FeedStatus::Reconnecting;
        self.reconnects += 1;
        true
    }

    /// The reconnect delay has elapsed; a fresh connect attempt begins.
    pub fn on_reconnect_fired(&mut self) {
        self.status = FeedStatus::Connecting;
    }
}

impl Default for FeedLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live feed task.
///
/// Carries the generation of the subscription that spawned it; the view drops
/// any message stamped with a superseded generation, and `close` aborts the
/// task so delivery stops at its next await point.
#[derive(Debug)]
pub struct FeedHandle {
    generation: u64,
    task: JoinHandle<()>,
    status_rx: watch::Receiver<FeedStatus>,
}

impl FeedHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> FeedStatus {
        *self.status_rx.borrow()
    }

    /// Watch the feed's connection status (for a staleness indicator)
    pub fn status_watch(&self) -> watch::Receiver<FeedStatus> {
        self.status_rx.clone()
    }

    /// Tear the feed down. Idempotent; aborts the task at its next await
    /// point, cancelling any pending reconnect timer. A callback that is
    /// already executing may still finish, so stale messages are also fenced
    /// by the generation check in the view before they touch state.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the supervision task for one push subscription.
///
/// Text frames are handed to `on_message` synchronously in arrival order.
/// On termination (server close, transport error, or failed connect) the
/// task sleeps `reconnect_delay` and reconnects, indefinitely. There is no
/// backoff, jitter, or retry cap; a dead feed keeps trying while the
/// subscription is live.
pub fn spawn_feed<F>(
    url: String,
    reconnect_delay: Duration,
    generation: u64,
    mut on_message: F,
) -> FeedHandle
where
    F: FnMut(&str) + Send + 'static,
{
    let (status_tx, status_rx) = watch::channel(FeedStatus::Connecting);

    let task = tokio::spawn(async move {
        let mut lifecycle = FeedLifecycle::new();
        info!(%url, generation, "starting feed");

        loop {
            match connect_async(&url).await {
                Ok((ws_stream, _)) => {
                    lifecycle.on_connected();
                    let _ = status_tx.send(FeedStatus::Open);
                    debug!(%url, "feed connected");

                    let (_, mut read) = ws_stream.split();
                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => on_message(text.as_str()),
                            Ok(Message::Close(_)) => {
                                warn!(%url, "feed closed by server");
                                break;
                            }
                            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                                // Heartbeat - handled by the transport
                            }
                            Err(e) => {
                                error!(%url, "feed error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
                Err(e) => {
                    error!(%url, "feed connect failed: {}", e);
                }
            }

            if lifecycle.on_terminated() {
                let _ = status_tx.send(FeedStatus::Reconnecting);
                debug!(
                    %url,
                    attempt = lifecycle.reconnects(),
                    "waiting {:?} before reconnecting",
                    reconnect_delay
                );
                tokio::time::sleep(reconnect_delay).await;
                lifecycle.on_reconnect_fired();
                let _ = status_tx.send(FeedStatus::Connecting);
            }
        }
    });

    FeedHandle {
        generation,
        task,
        status_rx,
    }
}
