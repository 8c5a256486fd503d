//! Bounded async queue between request handling and the persistence writer.

use crate::config::{FullStrategy, LogQueueConfig};
use crate::persistence::{PersistenceStore, RequestLogEnd, RequestLogStart};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};

pub enum QueueItem {
    Start(RequestLogStart),
    End(RequestLogEnd),
}

/// Producer handle shared by request handlers. Backed by a deque (not a
/// channel) so `DropOldest` can evict the genuine head on overflow rather
/// than merely rejecting the newest arrival.
#[derive(Clone)]
pub struct LogQueue {
    items: Arc<Mutex<VecDeque<QueueItem>>>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
    strategy: FullStrategy,
    /// Permits == free slots; only `Block` acquires one per push, so other
    /// strategies never wait. The drain loop releases one per item removed.
    room: Arc<Semaphore>,
}

impl LogQueue {
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Enqueues an item per `full_strategy` when the queue is saturated.
    pub fn push(&self, item: QueueItem) {
        match self.strategy {
            FullStrategy::Block => {
                let items = self.items.clone();
                let room = self.room.clone();
                let dropped = self.dropped.clone();
                tokio::spawn(async move {
                    match room.acquire_owned().await {
                        Ok(permit) => {
                            items.lock().expect("log queue mutex poisoned").push_back(item);
                            permit.forget();
                        }
                        Err(_) => dropped.fetch_add(1, Ordering::Relaxed),
                    };
                });
            }
            FullStrategy::RejectNew => {
                let mut items = self.items.lock().expect("log queue mutex poisoned");
                if items.len() >= self.capacity {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                } else {
                    items.push_back(item);
                }
            }
            FullStrategy::DropOldest => {
                let mut items = self.items.lock().expect("log queue mutex poisoned");
                if items.len() >= self.capacity {
                    items.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                items.push_back(item);
            }
        }
    }
}

/// Spawns the drain task. Returns the producer handle and the task's
/// `JoinHandle` so callers can await graceful shutdown.
pub fn spawn(
    store: Arc<dyn PersistenceStore>,
    config: LogQueueConfig,
) -> (LogQueue, tokio::task::JoinHandle<()>) {
    let items = Arc::new(Mutex::new(VecDeque::with_capacity(config.batch_size)));
    let dropped = Arc::new(AtomicU64::new(0));
    let queue = LogQueue {
        items: items.clone(),
        capacity: config.max_capacity,
        dropped: dropped.clone(),
        strategy: config.full_strategy,
        room: Arc::new(Semaphore::new(config.max_capacity)),
    };
    let handle = tokio::spawn(drain_loop(store, items, queue.room.clone(), config));
    (queue, handle)
}

async fn drain_loop(
    store: Arc<dyn PersistenceStore>,
    items: Arc<Mutex<VecDeque<QueueItem>>>,
    room: Arc<Semaphore>,
    config: LogQueueConfig,
) {
    let mut ticker = interval(Duration::from_millis(config.processing_interval_ms));
    loop {
        ticker.tick().await;
        let batch: Vec<QueueItem> = {
            let mut items = items.lock().expect("log queue mutex poisoned");
            let take = config.batch_size.min(items.len());
            items.drain(..take).collect()
        };
        if batch.is_empty() {
            continue;
        }
        room.add_permits(batch.len());
        for item in batch {
            write_with_retry(&store, item, &config).await;
        }
    }
}

async fn write_with_retry(store: &Arc<dyn PersistenceStore>, item: QueueItem, config: &LogQueueConfig) {
    for attempt in 0..=config.max_retries {
        let result = match &item {
            QueueItem::Start(entry) => store.insert_request_log_start(entry.clone()).await,
            QueueItem::End(entry) => store.update_request_log_end(entry.clone()).await,
        };
        if result.is_ok() {
            return;
        }
        if attempt < config.max_retries {
            tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
        } else {
            tracing::warn!("request log write failed after retries, dropping item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: &str) -> QueueItem {
        QueueItem::Start(RequestLogStart {
            request_id: id.to_string(),
            method: "POST".to_string(),
            endpoint: "/v1/chat/completions".to_string(),
            proxy_key_id: None,
            request_body: None,
            request_headers: None,
            content_truncated: false,
            client_ip: None,
            user_agent: None,
        })
    }

    fn ids(queue: &LogQueue) -> Vec<String> {
        queue
            .items
            .lock()
            .unwrap()
            .iter()
            .map(|item| match item {
                QueueItem::Start(entry) => entry.request_id.clone(),
                QueueItem::End(entry) => entry.request_id.clone(),
            })
            .collect()
    }

    // No drain task attached, so pushes land directly on the deque and
    // `dropped_count`/the deque's contents reflect only the strategy under
    // test, never a race against the drain loop.
    fn queue_with(capacity: usize, strategy: FullStrategy) -> LogQueue {
        LogQueue {
            items: Arc::new(Mutex::new(VecDeque::new())),
            capacity,
            dropped: Arc::new(AtomicU64::new(0)),
            strategy,
            room: Arc::new(Semaphore::new(capacity)),
        }
    }

    #[tokio::test]
    async fn reject_new_fails_every_insert_once_capacity_is_reached() {
        let queue = queue_with(3, FullStrategy::RejectNew);
        for i in 0..5 {
            queue.push(start(&i.to_string()));
        }
        assert_eq!(queue.dropped_count(), 2);
        assert_eq!(ids(&queue), vec!["0", "1", "2"], "RejectNew keeps the first arrivals");
    }

    #[tokio::test]
    async fn drop_oldest_evicts_the_genuine_head_and_keeps_the_newest() {
        let queue = queue_with(3, FullStrategy::DropOldest);
        for i in 0..5 {
            queue.push(start(&i.to_string()));
        }
        assert_eq!(queue.dropped_count(), 2);
        assert_eq!(ids(&queue), vec!["2", "3", "4"], "DropOldest keeps the most recent arrivals");
    }
}
