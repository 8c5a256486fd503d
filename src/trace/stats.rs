//! Paginated/filterable reads and aggregate rollups, delegated straight to
//! the persistence port.

pub use crate::persistence::{PageRequest, PagedRequestLogs, RequestLogFilter, RequestLogStats};

use super::service::RequestLogger;
use crate::error::Result;

impl RequestLogger {
    pub async fn query_logs(&self, filter: &RequestLogFilter, page: PageRequest) -> Result<PagedRequestLogs> {
        self.store.list_request_logs(filter, page).await
    }

    pub async fn stats(&self, filter: &RequestLogFilter) -> Result<RequestLogStats> {
        self.store.aggregate_request_log_stats(filter).await
    }
}
