//! Wiring of the production adapters

use core_kernel::{HealthCheckable, RandomOffsets, Timezone};
use domain_queue::{AntreanClient, Reconciler};
use infra_db::{
    create_pool, load_queue_settings, DatabasePool, MySqlCheckpointAdapter, MySqlEntryAdapter, MySqlSourceAdapter,
    QueueSettings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::batch::BatchRunner;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::report::ReportStore;
use crate::scheduler::Watcher;
use crate::AppState;

/// Everything a command needs, connected and validated
pub struct ServiceContext {
    pub config: ServiceConfig,
    pub pool: DatabasePool,
    pub settings: QueueSettings,
    pub timezone: Timezone,
    pub entries: Arc<MySqlEntryAdapter>,
    pub store: Arc<MySqlCheckpointAdapter>,
    pub client: Arc<AntreanClient>,
    pub reconciler: Arc<Reconciler>,
    pub reports: Arc<ReportStore>,
}

impl ServiceContext {
    /// Connects to the database, loads the service credentials and opens
    /// the report archive
    ///
    /// # Errors
    ///
    /// Fails when the database is unreachable, the credentials lack a base
    /// URL or consumer id, or the report directory cannot be created.
    pub async fn connect(config: ServiceConfig) -> Result<Self, ServiceError> {
        let timezone = config.service.timezone()?;

        let pool = create_pool(config.database.pool_config()).await?;
        info!("Connected to MySQL database");

        let settings = load_queue_settings(&pool).await?;
        let client = Arc::new(AntreanClient::new(
            settings.credentials.clone(),
            config.service.request_timeout(),
        )?);
        info!(payer = %settings.payer_code, "Queue service credentials loaded from settings");

        let entries = Arc::new(MySqlEntryAdapter::new(pool.clone(), settings.payer_code.clone()));
        let store = Arc::new(MySqlCheckpointAdapter::new(pool.clone()));
        let sources = Arc::new(MySqlSourceAdapter::new(pool.clone()));

        let reconciler = Arc::new(Reconciler::new(
            sources,
            store.clone(),
            client.clone(),
            timezone,
            Arc::new(RandomOffsets),
        ));

        let reports = Arc::new(ReportStore::open(PathBuf::from(&config.report.dir), timezone.today()).await?);

        Ok(Self {
            config,
            pool,
            settings,
            timezone,
            entries,
            store,
            client,
            reconciler,
            reports,
        })
    }

    pub fn batch_runner(&self) -> BatchRunner {
        BatchRunner::new(
            self.entries.clone(),
            self.reconciler.clone(),
            Some(self.reports.clone()),
            self.timezone,
        )
    }

    pub fn watcher(&self) -> Watcher {
        Watcher::new(
            self.entries.clone(),
            self.reconciler.clone(),
            Some(self.reports.clone()),
            self.timezone,
            self.config.watcher.poll_interval(),
        )
    }

    /// State of the status API
    pub fn app_state(&self) -> AppState {
        let health_checks: Vec<Arc<dyn HealthCheckable>> =
            vec![self.store.clone(), self.entries.clone(), self.client.clone()];
        AppState {
            reports: self.reports.clone(),
            health_checks,
            timezone: self.timezone,
        }
    }
}
