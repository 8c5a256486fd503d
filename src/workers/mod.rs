//! Background workers: key health reconciliation, log retention, and the
//! generic task scheduler they run under.

mod key_health;
mod retention;
mod scheduler;

pub use key_health::KeyHealthWorker;
pub use retention::RetentionWorker;
pub use scheduler::{ScheduledTask, TaskScheduler, TaskType};
