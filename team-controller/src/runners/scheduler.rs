//! Per-resource reconcile scheduler.
//!
//! Each managed resource gets its own scheduler that reconciles it on an
//! interval, backs off exponentially after failures and stops once the
//! external object has been deleted.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use team_provider::config::ReconcileConfig;
use team_provider::ManagedResource;
use tracing::{debug, error, info, warn};

use super::reconciler::{ManagedReconciler, ReconcileOutcome};
use crate::context::Context;
use crate::error::{display_chain, ReconcileError};

/// Status information for one managed resource.
#[derive(Clone, Debug)]
pub struct ReconcileStatus {
    /// Last successful pass
    pub last_reconcile: Option<DateTime<Utc>>,
    pub last_outcome: Option<ReconcileOutcome>,
    /// Last error, rendered with its causes
    pub last_error: Option<String>,
    pub reconcile_count: u64,
    pub error_count: u64,
    /// Failures since the last successful pass
    pub consecutive_failures: u32,
    /// Set once the scheduler has stopped for good
    pub finished: bool,
    /// Resource as of the last pass, conditions and observed fields included
    pub resource: ManagedResource,
}

impl ReconcileStatus {
    fn new(resource: ManagedResource) -> Self {
        Self {
            last_reconcile: None,
            last_outcome: None,
            last_error: None,
            reconcile_count: 0,
            error_count: 0,
            consecutive_failures: 0,
            finished: false,
            resource,
        }
    }
}

/// Delay before retrying after `failures` consecutive failed passes.
///
/// Doubles from `initial` on every failure, capped at `max`.
pub fn backoff_delay(initial: Duration, max: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(31);
    initial
        .checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

/// Drives one managed resource until it is deleted or shutdown fires.
pub struct ResourceScheduler {
    reconciler: ManagedReconciler,
    resource: ManagedResource,
    settings: ReconcileConfig,
    /// Cancelled on controller shutdown
    shutdown: Context,
    status: Arc<tokio::sync::Mutex<ReconcileStatus>>,
}

impl ResourceScheduler {
    pub fn new(
        reconciler: ManagedReconciler,
        resource: ManagedResource,
        settings: ReconcileConfig,
        shutdown: Context,
    ) -> Self {
        let status = Arc::new(tokio::sync::Mutex::new(ReconcileStatus::new(
            resource.clone(),
        )));
        Self {
            reconciler,
            resource,
            settings,
            shutdown,
            status,
        }
    }

    /// Returns a clone of the status tracker for external monitoring.
    pub fn status(&self) -> Arc<tokio::sync::Mutex<ReconcileStatus>> {
        Arc::clone(&self.status)
    }

    /// Starts the reconcile loop (non-blocking).
    pub fn start(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let key = self.resource.key();
            info!(
                resource = %key,
                interval_secs = self.settings.poll_interval_seconds,
                "Starting resource scheduler"
            );

            while let Some(delay) = self.tick().await {
                debug!(resource = %key, delay_ms = delay.as_millis() as u64, "Next reconcile scheduled");
                if self.shutdown.sleep(delay).await.is_err() {
                    break;
                }
            }

            self.status.lock().await.finished = true;
            info!(resource = %key, "Resource scheduler stopped");
        })
    }

    /// Runs one pass and returns the delay before the next one, or `None`
    /// when the scheduler should stop.
    pub async fn tick(&mut self) -> Option<Duration> {
        if self.shutdown.is_done() {
            return None;
        }

        let ctx = self.shutdown.with_timeout(self.settings.call_timeout());
        let result = self.reconciler.reconcile(&ctx, &mut self.resource).await;

        let mut status = self.status.lock().await;
        status.resource = self.resource.clone();

        match result {
            Ok(outcome) => {
                status.last_reconcile = Some(Utc::now());
                status.last_outcome = Some(outcome);
                status.last_error = None;
                status.reconcile_count += 1;
                status.consecutive_failures = 0;

                match outcome {
                    ReconcileOutcome::Deleted => None,
                    // Observe again soon to pick up the provider's view of the change
                    ReconcileOutcome::Created | ReconcileOutcome::Updated => {
                        Some(self.settings.initial_backoff())
                    }
                    ReconcileOutcome::UpToDate => Some(self.settings.poll_interval()),
                }
            }
            Err(ReconcileError::Cancelled(_)) if self.shutdown.is_done() => None,
            Err(e) => {
                status.last_error = Some(display_chain(&e));
                status.error_count += 1;
                status.consecutive_failures += 1;

                if !e.is_retryable() {
                    error!(
                        resource = %self.resource.key(),
                        error = %e,
                        "Reconcile failed permanently, giving up"
                    );
                    return None;
                }

                let delay = backoff_delay(
                    self.settings.initial_backoff(),
                    self.settings.max_backoff(),
                    status.consecutive_failures,
                );
                warn!(
                    resource = %self.resource.key(),
                    failures = status.consecutive_failures,
                    delay_secs = delay.as_secs(),
                    "Backing off before retry"
                );
                Some(delay)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::github::TeamConnector;
    use crate::context::CancelHandle;
    use crate::testing::{platform_team, FakeTeams, Failure, StaticResolver};
    use team_provider::credentials::MemoryUsageTracker;

    fn settings() -> ReconcileConfig {
        ReconcileConfig {
            poll_interval_seconds: 60,
            initial_backoff_seconds: 1,
            max_backoff_seconds: 8,
            call_timeout_seconds: 5,
        }
    }

    fn scheduler(fake: &Arc<FakeTeams>, resource: ManagedResource, shutdown: Context) -> ResourceScheduler {
        let reconciler = ManagedReconciler::new(Arc::new(TeamConnector::new(
            Arc::new(StaticResolver(Arc::clone(fake))),
            Arc::new(MemoryUsageTracker::new()),
        )));
        ResourceScheduler::new(reconciler, resource, settings(), shutdown)
    }

    #[test]
    fn test_backoff_delay() {
        let initial = Duration::from_secs(1);
        let max = Duration::from_secs(300);
        assert_eq!(backoff_delay(initial, max, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(initial, max, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(initial, max, 4), Duration::from_secs(8));
        assert_eq!(backoff_delay(initial, max, 10), max);
        assert_eq!(backoff_delay(initial, max, u32::MAX), max);
    }

    #[tokio::test]
    async fn test_tick_delays_follow_outcome() {
        let fake = FakeTeams::new();
        let mut scheduler = scheduler(&fake, platform_team().into(), Context::background());

        // Created: come back quickly to observe it
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(1)));
        // In sync: regular poll interval
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(60)));

        let status = scheduler.status();
        let status = status.lock().await;
        assert_eq!(status.reconcile_count, 2);
        assert_eq!(status.last_outcome, Some(ReconcileOutcome::UpToDate));
        assert!(status.last_reconcile.is_some());
        assert!(status.resource.as_team().unwrap().status.at_provider.node_id.is_some());
    }

    #[tokio::test]
    async fn test_failures_back_off_then_reset() {
        let fake = FakeTeams::new();
        fake.fail_with(Some(Failure::RateLimited));
        let mut scheduler = scheduler(&fake, platform_team().into(), Context::background());

        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(1)));
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(2)));
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(4)));
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(8)));
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(8)));

        {
            let status = scheduler.status();
            let status = status.lock().await;
            assert_eq!(status.error_count, 5);
            assert_eq!(status.consecutive_failures, 5);
            assert!(status
                .last_error
                .as_deref()
                .unwrap()
                .starts_with("failed to observe external resource"));
        }

        fake.fail_with(None);
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(1)));
        let status = scheduler.status();
        let status = status.lock().await;
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_stops_after_delete() {
        let fake = FakeTeams::new();
        fake.insert("acme", "platform", None, None);
        let mut team = platform_team();
        team.metadata.deletion_requested = true;
        let mut scheduler = scheduler(&fake, team.into(), Context::background());

        assert_eq!(scheduler.tick().await, None);
        assert!(fake.get("acme", "platform").is_none());
    }

    #[tokio::test]
    async fn test_gives_up_on_invalid_resource() {
        let fake = FakeTeams::new();
        let mut team = platform_team();
        team.spec.org = String::new();
        let mut scheduler = scheduler(&fake, team.into(), Context::background());

        assert_eq!(scheduler.tick().await, None);
        assert_eq!(scheduler.status().lock().await.error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_hits_pass_deadline() {
        let fake = FakeTeams::new();
        fake.fail_with(Some(Failure::Hang));
        let mut scheduler = scheduler(&fake, platform_team().into(), Context::background());

        // The pass deadline expires; shutdown has not fired, so it is retried
        assert_eq!(scheduler.tick().await, Some(Duration::from_secs(1)));
        let status = scheduler.status();
        assert_eq!(
            status.lock().await.last_error.as_deref(),
            Some("operation deadline exceeded")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let fake = FakeTeams::new();
        let handle = CancelHandle::new();
        let scheduler = scheduler(&fake, platform_team().into(), handle.context());
        let status = scheduler.status();

        let task = scheduler.start();
        tokio::time::sleep(Duration::from_secs(120)).await;
        handle.cancel();
        task.await.unwrap();

        let status = status.lock().await;
        assert!(status.finished);
        assert!(status.reconcile_count >= 2);
        assert!(fake.get("acme", "platform").is_some());
    }
}
