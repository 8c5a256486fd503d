//! Stall detector for Gemini's streaming responses: watches inter-byte
//! gaps and flags truncation without altering the byte stream itself.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug)]
pub struct StallConfig {
    pub data_timeout: Duration,
    pub max_data_interval: Duration,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            data_timeout: Duration::from_secs(30),
            max_data_interval: Duration::from_secs(120),
        }
    }
}

fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Wraps an upstream byte stream, tracking `last_byte_at` and whether a
/// terminal marker (`[DONE]` or a `finishReason` field) was ever observed.
/// Annotation only: bytes pass through unmodified.
pub struct StallWatcher {
    last_byte_at: Arc<AtomicI64>,
    seen_terminal_marker: Arc<std::sync::atomic::AtomicBool>,
    config: StallConfig,
}

impl StallWatcher {
    #[must_use]
    pub fn new(config: StallConfig) -> Self {
        Self {
            last_byte_at: Arc::new(AtomicI64::new(now_unix_ms())),
            seen_terminal_marker: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            config,
        }
    }

    #[must_use]
    pub fn wrap<S>(&self, inner: S) -> WatchedStream<S>
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send,
    {
        WatchedStream {
            inner,
            last_byte_at: self.last_byte_at.clone(),
            seen_terminal_marker: self.seen_terminal_marker.clone(),
        }
    }

    /// True if the stream went quiet for longer than `max_data_interval`
    /// without ever observing a terminal marker — i.e. was truncated.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        if self.seen_terminal_marker.load(Ordering::Relaxed) {
            return false;
        }
        let elapsed_ms = now_unix_ms() - self.last_byte_at.load(Ordering::Relaxed);
        elapsed_ms > self.config.max_data_interval.as_millis() as i64
    }

    /// True if no bytes have arrived yet within `data_timeout` of stream
    /// open; callers should log a warning, not fail the request.
    #[must_use]
    pub fn is_slow_to_start(&self, opened_at_ms: i64) -> bool {
        let last = self.last_byte_at.load(Ordering::Relaxed);
        last == opened_at_ms && now_unix_ms() - opened_at_ms > self.config.data_timeout.as_millis() as i64
    }
}

pub struct WatchedStream<S> {
    inner: S,
    last_byte_at: Arc<AtomicI64>,
    seen_terminal_marker: Arc<std::sync::atomic::AtomicBool>,
}

impl<S> Stream for WatchedStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + Unpin,
{
    type Item = reqwest::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.last_byte_at.store(now_unix_ms(), Ordering::Relaxed);
                if contains_terminal_marker(&chunk) {
                    this.seen_terminal_marker.store(true, Ordering::Relaxed);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

fn contains_terminal_marker(chunk: &Bytes) -> bool {
    let text = String::from_utf8_lossy(chunk);
    text.contains("[DONE]") || text.contains("finishReason")
}

/// Background watchdog for a `WatchedStream`: wakes on a quarter of
/// `max_data_interval` and logs once if the stream has stalled without a
/// terminal marker. Stops as soon as `token` is cancelled.
pub fn spawn_stall_monitor(watcher: Arc<StallWatcher>, token: CancellationToken) {
    let period = (watcher.config.max_data_interval / 4).max(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                () = token.cancelled() => return,
                _ = ticker.tick() => {
                    if watcher.is_truncated() {
                        tracing::warn!("gemini stream stalled without a terminal marker; treating as truncated");
                        return;
                    }
                }
            }
        }
    });
}

/// Cancels `token` when the wrapped stream is dropped, whether it finished
/// normally or the client disconnected early. Pairs with
/// `spawn_stall_monitor` so the watchdog never outlives its stream.
pub struct CancelOnDrop<S> {
    inner: S,
    token: CancellationToken,
}

impl<S> CancelOnDrop<S> {
    #[must_use]
    pub fn new(inner: S, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl<S> Stream for CancelOnDrop<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl<S> Drop for CancelOnDrop<S> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
