//! Job monitor: tracks in-flight cross-ledger jobs to completion
//!
//! Each monitored job owns its own polling task, keyed by job id in a
//! shared registry; tasks are independent and do not block each other.
//! The loop's lifetime is owned by the registry entry's handle, so
//! stopping a job aborts its task rather than orphaning a timer.
//! Job records are in-memory only and do not survive restarts.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::SwapResult;
use crate::ledger::{BalanceSink, HomeLedger, JobStatus, NotificationSink, NotifyHandle, SwapJob};
use crate::metrics;

/// Seconds after terminal status at which balances are refreshed again,
/// to absorb eventual-consistency lag in balance sources
const REFRESH_OFFSETS_SECS: [u64; 5] = [0, 1, 2, 3, 5];

/// Callback run when a job settles successfully, e.g. to clear the
/// session's pending amounts
pub type SettledCallback = Arc<dyn Fn() + Send + Sync>;

/// Inputs for monitoring one job
#[derive(Clone)]
pub struct MonitorParams {
    pub job_id: u64,
    pub pay_symbol: String,
    pub pay_amount: String,
    pub receive_symbol: String,
    pub receive_amount: String,
    pub on_settled: Option<SettledCallback>,
}

/// Live view of a monitored job
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobStatusRecord {
    pub job_id: u64,
    pub pay_symbol: String,
    pub pay_amount: String,
    pub receive_symbol: String,
    pub receive_amount: String,
    pub status: JobStatus,
    pub pay_tx_signature: Option<String>,
    pub receive_tx_signature: Option<String>,
    /// Last poll error; polling continues regardless
    pub last_error: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

struct JobTracker {
    record: JobStatusRecord,
    notification: Option<NotifyHandle>,
    handle: Option<JoinHandle<()>>,
    on_settled: Option<SettledCallback>,
}

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    /// Grace window before a terminal record is discarded
    pub retain: Duration,
    pub explorer_tx_url: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
            retain: Duration::from_secs(30),
            explorer_tx_url: None,
        }
    }
}

struct MonitorInner {
    ledger: Arc<dyn HomeLedger>,
    notifications: Arc<dyn NotificationSink>,
    balances: Arc<dyn BalanceSink>,
    jobs: DashMap<u64, JobTracker>,
    config: MonitorConfig,
}

/// Cheaply cloneable handle to the job monitor
#[derive(Clone)]
pub struct JobMonitor {
    inner: Arc<MonitorInner>,
}

impl JobMonitor {
    pub fn new(
        ledger: Arc<dyn HomeLedger>,
        notifications: Arc<dyn NotificationSink>,
        balances: Arc<dyn BalanceSink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                ledger,
                notifications,
                balances,
                jobs: DashMap::new(),
                config,
            }),
        }
    }

    /// Begin monitoring a job: registry record, persistent processing
    /// notification, one immediate poll and a fixed-interval loop.
    pub fn start_monitoring(&self, params: MonitorParams) {
        let job_id = params.job_id;
        if self.inner.jobs.contains_key(&job_id) {
            warn!("Job {} is already being monitored", job_id);
            return;
        }

        let notification = self.inner.notifications.info(
            &format!(
                "Processing swap: {} {} -> {} {}",
                params.pay_amount, params.pay_symbol, params.receive_amount, params.receive_symbol
            ),
            None,
        );

        self.inner.jobs.insert(
            job_id,
            JobTracker {
                record: JobStatusRecord {
                    job_id,
                    pay_symbol: params.pay_symbol,
                    pay_amount: params.pay_amount,
                    receive_symbol: params.receive_symbol,
                    receive_amount: params.receive_amount,
                    status: JobStatus::Pending,
                    pay_tx_signature: None,
                    receive_tx_signature: None,
                    last_error: None,
                    started_at: chrono::Utc::now(),
                },
                notification: Some(notification),
                handle: None,
                on_settled: params.on_settled,
            },
        );
        metrics::inc_jobs_active();
        info!("Started monitoring job {}", job_id);

        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            monitor.monitor_loop(job_id).await;
        });

        if let Some(mut entry) = self.inner.jobs.get_mut(&job_id) {
            entry.handle = Some(handle);
        } else {
            // Stopped before the handle landed
            handle.abort();
        }
    }

    async fn monitor_loop(&self, job_id: u64) {
        let mut interval = tokio::time::interval(self.inner.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match self.poll_job(job_id).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => {
                    metrics::record_job_poll_error();
                    warn!("Poll for job {} failed: {}", job_id, e);
                    if let Some(mut entry) = self.inner.jobs.get_mut(&job_id) {
                        entry.record.last_error = Some(e.to_string());
                    }
                }
            }
        }

        debug!("Monitoring loop for job {} ended", job_id);
    }

    /// One poll iteration. Returns `Ok(true)` when monitoring should
    /// stop (terminal status reached or the job was unregistered).
    async fn poll_job(&self, job_id: u64) -> SwapResult<bool> {
        metrics::record_job_poll();
        let job = match self.inner.ledger.job_status(job_id).await? {
            Some(job) => job,
            // Not visible on the ledger yet: keep polling silently
            None => return Ok(false),
        };

        let (changed, stale_notification) = {
            let Some(mut entry) = self.inner.jobs.get_mut(&job_id) else {
                return Ok(true);
            };
            let changed = entry.record.status != job.status;
            let stale_notification = if changed {
                entry.record.status = job.status.clone();
                entry.record.pay_tx_signature = job.pay_tx_signature.clone();
                entry.record.receive_tx_signature = job.receive_tx_signature.clone();
                entry.notification.take()
            } else {
                None
            };
            (changed, stale_notification)
        };

        if !changed {
            return Ok(job.status.is_terminal());
        }

        info!("Job {} is now {}", job_id, job.status.name());
        if let Some(handle) = stale_notification {
            self.inner.notifications.dismiss(handle);
        }

        if job.status.is_terminal() {
            self.finish(job_id, &job).await;
            return Ok(true);
        }

        // Non-terminal progress: swap in a notification for the new
        // status and refresh balances
        let message = progress_message(&job.status);
        let handle = self.inner.notifications.info(&message, None);
        if let Some(mut entry) = self.inner.jobs.get_mut(&job_id) {
            entry.notification = Some(handle);
        } else {
            self.inner.notifications.dismiss(handle);
        }
        self.inner.balances.refresh_all().await;

        Ok(false)
    }

    /// Terminal handling: final notification, settled callback, balance
    /// refresh burst, and deferred removal of the record
    async fn finish(&self, job_id: u64, job: &SwapJob) {
        let on_settled = self
            .inner
            .jobs
            .get(&job_id)
            .and_then(|entry| entry.on_settled.clone());

        match &job.status {
            JobStatus::Confirmed | JobStatus::Submitted => {
                let mut message = {
                    let entry = self.inner.jobs.get(&job_id);
                    match entry {
                        Some(entry) => format!(
                            "Swap completed: received {} {}",
                            entry.record.receive_amount, entry.record.receive_symbol
                        ),
                        None => "Swap completed".to_string(),
                    }
                };
                if let Some(signature) = &job.receive_tx_signature {
                    match &self.inner.config.explorer_tx_url {
                        Some(prefix) => {
                            message.push_str(&format!(" ({}{})", prefix, signature));
                        }
                        None => message.push_str(&format!(" (tx {})", signature)),
                    }
                }
                self.inner.notifications.success(&message, Some(8_000));

                if let Some(callback) = on_settled {
                    callback();
                }
                self.schedule_refresh_burst();
            }
            JobStatus::Failed(reason) => {
                self.inner
                    .notifications
                    .error(&format!("Swap failed: {}", reason), Some(10_000));
                self.inner.balances.refresh_all().await;
            }
            other => {
                debug!("finish called with non-terminal status {}", other.name());
            }
        }

        metrics::dec_jobs_active();
        self.schedule_removal(job_id);
    }

    /// Refresh balances at fixed offsets after settlement; balance
    /// sources can lag the ledger by a few seconds
    fn schedule_refresh_burst(&self) {
        let balances = self.inner.balances.clone();
        tokio::spawn(async move {
            let mut previous = 0u64;
            for offset in REFRESH_OFFSETS_SECS {
                if offset > previous {
                    tokio::time::sleep(Duration::from_secs(offset - previous)).await;
                }
                previous = offset;
                balances.refresh_all().await;
            }
            balances.refresh_foreign().await;
        });
    }

    fn schedule_removal(&self, job_id: u64) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.retain).await;
            if inner.jobs.remove(&job_id).is_some() {
                debug!("Discarded record for job {}", job_id);
            }
        });
    }

    /// Stop monitoring one job: abort its loop and dismiss its
    /// notification without touching job status. No-op when the job is
    /// not monitored.
    pub fn stop_monitoring(&self, job_id: u64) {
        let Some((_, tracker)) = self.inner.jobs.remove(&job_id) else {
            return;
        };

        if let Some(handle) = tracker.handle {
            handle.abort();
        }
        if let Some(notification) = tracker.notification {
            self.inner.notifications.dismiss(notification);
        }
        if !tracker.record.status.is_terminal() {
            metrics::dec_jobs_active();
        }
        info!("Stopped monitoring job {}", job_id);
    }

    /// Stop every monitored job
    pub fn stop_all(&self) {
        let ids: Vec<u64> = self.inner.jobs.iter().map(|e| *e.key()).collect();
        for job_id in ids {
            self.stop_monitoring(job_id);
        }
    }

    /// Snapshot of one job's record
    pub fn job_record(&self, job_id: u64) -> Option<JobStatusRecord> {
        self.inner.jobs.get(&job_id).map(|e| e.record.clone())
    }

    /// Snapshot of all tracked jobs
    pub fn active_jobs(&self) -> Vec<JobStatusRecord> {
        self.inner.jobs.iter().map(|e| e.record.clone()).collect()
    }
}

fn progress_message(status: &JobStatus) -> String {
    match status {
        JobStatus::Pending => "Swap queued...".to_string(),
        JobStatus::Processing => "Processing swap...".to_string(),
        JobStatus::WaitingForSignature => "Waiting for signature...".to_string(),
        JobStatus::SendingToForeign => "Sending funds to the foreign chain...".to_string(),
        other => format!("Swap status: {}", other.name()),
    }
}
