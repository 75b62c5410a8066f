//! Periodic sync for every pair with auto-sync enabled.
//!
//! A cron job lists the eligible (user, student) pairs and runs one
//! reconciliation pass for each. Cancellation is explicit and every
//! lifecycle step runs under a timeout.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use duesync_core::{SettingsRepository, SyncReconciler};
use duesync_domain::{DueSyncError, Result, SyncConfig, SyncContext};
use futures::future::join_all;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the auto-sync scheduler.
#[derive(Debug, Clone)]
pub struct AutoSyncSchedulerConfig {
    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
    /// Timeout applied to one full tick across all targets.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
}

impl Default for AutoSyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: duesync_domain::constants::DEFAULT_AUTO_SYNC_CRON.into(),
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl AutoSyncSchedulerConfig {
    /// Cron expression from the sync config, default timeouts.
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self { cron_expression: config.auto_sync_cron.clone(), ..Self::default() }
    }
}

/// Counts for one auto-sync tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSyncSummary {
    /// Pairs listed for this tick
    pub targets: usize,
    pub succeeded: usize,
    /// A manual pass already held the student
    pub skipped_in_progress: usize,
    /// Passes that reported item errors, timed out or could not start
    pub failed: usize,
}

/// Cron-driven auto-sync with explicit lifecycle management.
pub struct AutoSyncScheduler {
    scheduler: Option<JobScheduler>,
    config: AutoSyncSchedulerConfig,
    cancellation: CancellationToken,
    reconciler: Arc<SyncReconciler>,
    settings: Arc<dyn SettingsRepository>,
}

impl AutoSyncScheduler {
    /// Scheduler using the default cron expression and timeouts.
    pub fn new(reconciler: Arc<SyncReconciler>, settings: Arc<dyn SettingsRepository>) -> Self {
        Self::with_config(AutoSyncSchedulerConfig::default(), reconciler, settings)
    }

    /// Scheduler with explicit timing. Nothing runs until [`Self::start`].
    pub fn with_config(
        config: AutoSyncSchedulerConfig,
        reconciler: Arc<SyncReconciler>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            cancellation: CancellationToken::new(),
            reconciler,
            settings,
        }
    }

    pub fn config(&self) -> &AutoSyncSchedulerConfig {
        &self.config
    }

    /// Start the scheduler with a fresh cancellation token.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        self.scheduler = Some(scheduler);

        info!("auto-sync scheduler started");
        Ok(())
    }

    /// Cancel in-flight ticks and shut the scheduler down.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        info!("auto-sync scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Run one tick immediately, outside the cron schedule.
    pub async fn run_once(&self) -> Result<AutoSyncSummary> {
        run_tick(&self.reconciler, self.settings.as_ref()).await
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new().await.map_err(SchedulerError::creation)?;
        let reconciler = Arc::clone(&self.reconciler);
        let settings = Arc::clone(&self.settings);
        let cancel = self.cancellation.clone();
        let job_timeout = self.config.job_timeout;

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let reconciler = Arc::clone(&reconciler);
            let settings = Arc::clone(&settings);
            let cancel = cancel.clone();

            Box::pin(async move {
                let started = Instant::now();
                let tick = tokio::time::timeout(job_timeout, run_tick(&reconciler, settings.as_ref()));

                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("auto-sync tick abandoned on shutdown");
                    }
                    outcome = tick => match outcome {
                        Ok(Ok(summary)) => {
                            debug!(
                                elapsed_ms = started.elapsed().as_millis() as u64,
                                ?summary,
                                "auto-sync tick finished"
                            );
                        }
                        Ok(Err(err)) => error!(error = %err, "auto-sync tick failed"),
                        Err(_) => {
                            warn!(timeout_secs = job_timeout.as_secs(), "auto-sync tick timed out");
                        }
                    },
                }
            })
        })
        .map_err(SchedulerError::registration)?;

        let job_id = job.guid();
        scheduler.add(job).await.map_err(SchedulerError::registration)?;

        debug!(cron = %self.config.cron_expression, %job_id, "registered auto-sync job");
        Ok(scheduler)
    }
}

impl Drop for AutoSyncScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            self.cancellation.cancel();
        }
    }
}

/// Pass every auto-sync target.
///
/// Distinct students never share a lock, so their passes run side by side.
/// Targets for the same student (several observers) run one after another,
/// since the student lock admits a single pass at a time. A student already
/// held by a manual pass is skipped, not retried.
async fn run_tick(
    reconciler: &SyncReconciler,
    settings: &dyn SettingsRepository,
) -> Result<AutoSyncSummary> {
    let targets = settings.list_auto_sync_targets().await?;
    let mut summary = AutoSyncSummary { targets: targets.len(), ..AutoSyncSummary::default() };
    if targets.is_empty() {
        debug!("no auto-sync targets");
        return Ok(summary);
    }

    let groups = group_by_student(targets);
    info!(targets = summary.targets, students = groups.len(), "auto-sync tick started");
    let outcomes = join_all(groups.into_iter().map(|group| async move {
        let mut outcomes = Vec::with_capacity(group.len());
        for ctx in group {
            let outcome = reconciler.run_pass(&ctx).await;
            outcomes.push((ctx, outcome));
        }
        outcomes
    }))
    .await;

    for (ctx, outcome) in outcomes.into_iter().flatten() {
        match outcome {
            Ok(result) if result.error_count() == 0 && !result.timed_out => summary.succeeded += 1,
            Ok(result) => {
                summary.failed += 1;
                warn!(
                    student_id = %ctx.student_id,
                    errors = result.error_count(),
                    timed_out = result.timed_out,
                    "auto-sync pass finished with errors"
                );
            }
            Err(DueSyncError::SyncInProgress(_)) => {
                summary.skipped_in_progress += 1;
                debug!(student_id = %ctx.student_id, "pass already running, skipped");
            }
            Err(err) => {
                summary.failed += 1;
                log_target_failure(&ctx, &err);
            }
        }
    }

    info!(
        targets = summary.targets,
        succeeded = summary.succeeded,
        skipped = summary.skipped_in_progress,
        failed = summary.failed,
        "auto-sync tick finished"
    );
    Ok(summary)
}

/// Targets bucketed per student, in first-seen order within a bucket.
fn group_by_student(targets: Vec<SyncContext>) -> Vec<Vec<SyncContext>> {
    let mut groups: BTreeMap<String, Vec<SyncContext>> = BTreeMap::new();
    for ctx in targets {
        groups.entry(ctx.student_id.clone()).or_default().push(ctx);
    }
    groups.into_values().collect()
}

fn log_target_failure(ctx: &SyncContext, err: &DueSyncError) {
    error!(user_id = %ctx.user_id, student_id = %ctx.student_id, error = %err, "auto-sync pass failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_follows_sync_cron() {
        let sync = SyncConfig { auto_sync_cron: "0 0 * * * *".into(), ..SyncConfig::default() };
        let config = AutoSyncSchedulerConfig::from_sync_config(&sync);

        assert_eq!(config.cron_expression, "0 0 * * * *");
        assert_eq!(config.start_timeout, Duration::from_secs(5));
    }

    #[test]
    fn targets_for_one_student_share_a_group() {
        let groups = group_by_student(vec![
            SyncContext::new("mom", "s1"),
            SyncContext::new("mom", "s2"),
            SyncContext::new("dad", "s1"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![SyncContext::new("mom", "s1"), SyncContext::new("dad", "s1")]);
        assert_eq!(groups[1], vec![SyncContext::new("mom", "s2")]);
    }
}
