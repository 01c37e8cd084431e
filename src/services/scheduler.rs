use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::state::SharedState;

pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
    retention_days: Option<u32>,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(state: Arc<SharedState>) -> Self {
        let config = state.config.scheduler.clone();
        let retention_days = state.config.logs.auto_cleanup_days;

        Self {
            state,
            config,
            retention_days,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let mut sched = JobScheduler::new().await?;

        let state_for_sweep = Arc::clone(&self.state);
        let sweep_job = Job::new_async(self.config.token_sweep_cron.as_str(), move |_uuid, _lock| {
            let state = Arc::clone(&state_for_sweep);
            Box::pin(async move {
                sweep_tokens(&state).await;
            })
        })?;
        sched.add(sweep_job).await?;
        info!("Token sweep scheduled: {}", self.config.token_sweep_cron);

        if let Some(days) = self.retention_days {
            let state_for_cleanup = Arc::clone(&self.state);
            let cleanup_job =
                Job::new_async(self.config.log_cleanup_cron.as_str(), move |_uuid, _lock| {
                    let state = Arc::clone(&state_for_cleanup);
                    Box::pin(async move {
                        cleanup_logs(&state, days).await;
                    })
                })?;
            sched.add(cleanup_job).await?;
            info!(
                "Log retention scheduled: {} (keep {} days)",
                self.config.log_cleanup_cron, days
            );
        }

        sched.start().await?;

        // Catch tokens that expired while the service was down.
        sweep_tokens(&self.state).await;

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

async fn sweep_tokens(state: &SharedState) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "token_sweep", "Sweeping expired tokens");

    match state.tokens.sweep_expired().await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = "token_sweep",
            users = report.users,
            admins = report.admins,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Expired tokens cleared"
        ),
        Err(e) => error!(event = "job_failed", job_name = "token_sweep", error = %e, "Token sweep failed"),
    }
}

async fn cleanup_logs(state: &SharedState, days: u32) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "log_retention", days, "Pruning API logs");

    match state.log_service.cleanup(days).await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = "log_retention",
            deleted = report.deleted_count,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "API log retention finished"
        ),
        Err(e) => error!(event = "job_failed", job_name = "log_retention", error = %e, "API log retention failed"),
    }
}
