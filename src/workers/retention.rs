//! Log retention: deletes `RequestLog` rows older than the configured
//! retention window.

use crate::error::Result;
use crate::persistence::PersistenceStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

pub struct RetentionWorker {
    store: Arc<dyn PersistenceStore>,
    retention_days: i64,
}

impl RetentionWorker {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>, retention_days: i64) -> Self {
        Self { store, retention_days }
    }

    pub async fn run_once(&self) -> Result<u64> {
        let cutoff = Utc::now() - ChronoDuration::days(self.retention_days);
        let deleted = self.store.delete_request_logs_older_than(cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, "pruned expired request logs");
        }
        Ok(deleted)
    }
}
