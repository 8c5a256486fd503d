//! Wires the gateway's core components together from configuration and a
//! live database connection.

use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Dialect, Result};
use crate::health::HealthChecker;
use crate::key_pool::KeyManager;
use crate::persistence::{PersistenceStore, SeaOrmStore};
use crate::provider::{build_http_client, AdapterTimeouts, AnthropicAdapter, GeminiAdapter, OpenAiAdapter, ProviderAdapter};
use crate::router::Router;
use crate::trace::{spawn_log_queue, RequestLogger};
use crate::workers::{KeyHealthWorker, RetentionWorker, ScheduledTask, TaskScheduler, TaskType};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;

/// The assembled runtime: every component request handlers and background
/// tasks depend on, held behind `Arc` for cheap cloning into axum state.
pub struct Services {
    config: Arc<AppConfig>,
    store: Arc<dyn PersistenceStore>,
    key_manager: Arc<KeyManager>,
    router: Arc<Router>,
    dispatcher: Arc<Dispatcher>,
    logger: Arc<RequestLogger>,
    health_checker: Arc<HealthChecker>,
    scheduler: Arc<TaskScheduler>,
}

impl Services {
    /// Builds every component from `config` and `db`, but does not start any
    /// background task — call `start_background_tasks` once the returned
    /// `Services` is behind its final `Arc`.
    pub fn initialize(config: AppConfig, db: DatabaseConnection) -> Result<Arc<Self>> {
        let config = Arc::new(config);
        let store: Arc<dyn PersistenceStore> = Arc::new(SeaOrmStore::new(db));

        let client = build_http_client(AdapterTimeouts::unary().connect);
        let adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>> = HashMap::from([
            (Dialect::OpenAi, Arc::new(OpenAiAdapter::new(client.clone())) as Arc<dyn ProviderAdapter>),
            (Dialect::Anthropic, Arc::new(AnthropicAdapter::new(client.clone())) as Arc<dyn ProviderAdapter>),
            (Dialect::Gemini, Arc::new(GeminiAdapter::new(client.clone())) as Arc<dyn ProviderAdapter>),
        ]);

        let key_manager = Arc::new(KeyManager::new(store.clone()));
        let router = Arc::new(Router::new(store.clone(), key_manager.clone()));

        let queue_cfg = config.request_logging.queue.clone();
        let queue = if config.request_logging.enabled && queue_cfg.enabled {
            let (queue, _handle) = spawn_log_queue(store.clone(), queue_cfg);
            Some(queue)
        } else {
            None
        };
        let logger = Arc::new(RequestLogger::new(
            store.clone(),
            queue,
            config.request_logging.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            router.clone(),
            key_manager.clone(),
            logger.clone(),
            adapters.clone(),
            config.global.clone(),
        ));

        let health_checker = Arc::new(HealthChecker::new(store.clone(), adapters, client));

        Ok(Arc::new(Self {
            config,
            store,
            key_manager,
            router,
            dispatcher,
            logger,
            health_checker,
            scheduler: Arc::new(TaskScheduler::new()),
        }))
    }

    /// Registers and starts the key-health, retention, and health-probe
    /// background tasks per their configured intervals.
    pub async fn start_background_tasks(self: &Arc<Self>) -> Result<()> {
        if self.config.key_health_check.enabled {
            let worker = Arc::new(KeyHealthWorker::new(
                self.store.clone(),
                self.key_manager.clone(),
                self.health_checker_adapters(),
            ));
            let interval = self.config.key_health_check.interval_minutes.max(1);
            self.scheduler
                .register(
                    ScheduledTask::builder(TaskType::KeyHealthReconciliation)
                        .on_start(move || {
                            let worker = worker.clone();
                            async move { spawn_periodic(interval, move || worker.run_once()) }
                        })
                        .build(),
                )
                .await;
        }

        let retention_days = self.config.request_logging.retention_days;
        let retention = Arc::new(RetentionWorker::new(self.store.clone(), retention_days));
        self.scheduler
            .register(
                ScheduledTask::builder(TaskType::LogRetention)
                    .on_start(move || {
                        let retention = retention.clone();
                        async move {
                            spawn_periodic(1440, move || {
                                let retention = retention.clone();
                                async move { retention.run_once().await.map(|_| ()) }
                            })
                        }
                    })
                    .build(),
            )
            .await;

        self.scheduler.start_all().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown().await
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn PersistenceStore> {
        self.store.clone()
    }

    #[must_use]
    pub fn key_manager(&self) -> Arc<KeyManager> {
        self.key_manager.clone()
    }

    #[must_use]
    pub fn router(&self) -> Arc<Router> {
        self.router.clone()
    }

    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    #[must_use]
    pub fn logger(&self) -> Arc<RequestLogger> {
        self.logger.clone()
    }

    #[must_use]
    pub fn health_checker(&self) -> Arc<HealthChecker> {
        self.health_checker.clone()
    }

    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    fn health_checker_adapters(&self) -> HashMap<Dialect, Arc<dyn ProviderAdapter>> {
        // `HealthChecker` and `KeyHealthWorker` each need their own adapter
        // map; cheap to rebuild since adapters only hold a cloned `Client`.
        let client = build_http_client(AdapterTimeouts::unary().connect);
        HashMap::from([
            (Dialect::OpenAi, Arc::new(OpenAiAdapter::new(client.clone())) as Arc<dyn ProviderAdapter>),
            (Dialect::Anthropic, Arc::new(AnthropicAdapter::new(client.clone())) as Arc<dyn ProviderAdapter>),
            (Dialect::Gemini, Arc::new(GeminiAdapter::new(client)) as Arc<dyn ProviderAdapter>),
        ])
    }
}

fn spawn_periodic<F, Fut>(interval_minutes: u64, action: F) -> Result<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_minutes.max(1) * 60));
        loop {
            ticker.tick().await;
            if let Err(err) = action().await {
                tracing::warn!(error = %err, "background task iteration failed");
            }
        }
    });
    Ok(())
}
