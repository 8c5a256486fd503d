//! Generic background-task registry: register once at startup, start and
//! stop as a group so no module has to track its own `JoinHandle`s.

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskType {
    KeyHealthReconciliation,
    LogRetention,
    LogQueueDrain,
    HealthProbe,
}

type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type TaskAction = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Clone)]
pub struct ScheduledTask {
    task_type: TaskType,
    start: TaskAction,
    stop: Option<TaskAction>,
}

impl ScheduledTask {
    #[must_use]
    pub fn builder(task_type: TaskType) -> ScheduledTaskBuilder {
        ScheduledTaskBuilder {
            task_type,
            start: None,
            stop: None,
        }
    }

    async fn start(&self) -> Result<()> {
        tracing::info!(task = ?self.task_type, "starting background task");
        (self.start)().await
    }

    async fn stop(&self) -> Result<()> {
        if let Some(action) = &self.stop {
            tracing::info!(task = ?self.task_type, "stopping background task");
            action().await
        } else {
            Ok(())
        }
    }
}

pub struct ScheduledTaskBuilder {
    task_type: TaskType,
    start: Option<TaskAction>,
    stop: Option<TaskAction>,
}

impl ScheduledTaskBuilder {
    #[must_use]
    pub fn on_start<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.start = Some(Arc::new(move || Box::pin(action())));
        self
    }

    #[must_use]
    pub fn on_stop<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.stop = Some(Arc::new(move || Box::pin(action())));
        self
    }

    #[must_use]
    pub fn build(self) -> ScheduledTask {
        let start = self.start.expect("ScheduledTask requires a start action");
        ScheduledTask {
            task_type: self.task_type,
            start,
            stop: self.stop,
        }
    }
}

#[derive(Default)]
pub struct TaskScheduler {
    tasks: RwLock<Vec<ScheduledTask>>,
}

impl TaskScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, task: ScheduledTask) {
        self.tasks.write().await.push(task);
    }

    pub async fn start_all(&self) -> Result<()> {
        let tasks = { self.tasks.read().await.clone() };
        for task in tasks {
            task.start().await?;
        }
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        let tasks = { self.tasks.read().await.clone() };
        for task in tasks.into_iter().rev() {
            task.stop().await?;
        }
        Ok(())
    }
}
