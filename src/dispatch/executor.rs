//! Asynchronous task executor
//!
//! Thin job-queue stand-in on top of tokio tasks. Job bodies report their
//! fate explicitly — `Ok`, `Retryable`, or `Fatal` — and the executor
//! interprets `Retryable` as a resubmission signal, bounded by the
//! submission's retry policy. Waiting on a handle is a deadline-bounded
//! future wait; a handle dropped or timed out leaves the task running
//! detached.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// What a single job attempt reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Attempt succeeded; the job is done.
    Ok,
    /// Attempt failed in a way worth retrying.
    Retryable(String),
    /// Attempt failed terminally; never resubmitted.
    Fatal(String),
}

/// Final fate of a job after the executor is done with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

/// Resubmission bounds for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// Retry immediately, up to `max_retries` resubmissions.
    pub const fn immediate(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }

    /// Retry after `retry_delay`, up to `max_retries` resubmissions.
    pub const fn delayed(max_retries: u32, retry_delay: Duration) -> Self {
        RetryPolicy {
            max_retries,
            retry_delay,
        }
    }
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<JobOutcome>,
}

impl TaskHandle {
    /// Wait for the job's final outcome with no deadline.
    pub async fn wait(self) -> JobOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => JobOutcome::Failed(format!("job panicked: {err}")),
        }
    }

    /// Wait up to `budget` for the job to finish. A job that misses the
    /// deadline is reported as `Failed("Timeout")` and left running
    /// detached; its own logging still happens whenever it completes.
    pub async fn wait_with_deadline(mut self, budget: Duration) -> JobOutcome {
        match tokio::time::timeout(budget, &mut self.handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => JobOutcome::Failed(format!("job panicked: {err}")),
            Err(_) => JobOutcome::Failed("Timeout".to_string()),
        }
    }

    /// Fire-and-forget: let the job run to completion unobserved.
    pub fn detach(self) {}
}

/// Submits jobs as independent tokio tasks with retry handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutor;

impl TaskExecutor {
    pub fn new() -> Self {
        TaskExecutor
    }

    /// Submit a job. `job` is invoked once per attempt; `Retryable`
    /// results resubmit it until the policy is exhausted.
    pub fn submit<F, Fut>(&self, policy: RetryPolicy, job: F) -> TaskHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                match job().await {
                    JobResult::Ok => return JobOutcome::Succeeded,
                    JobResult::Fatal(reason) => return JobOutcome::Failed(reason),
                    JobResult::Retryable(reason) => {
                        if attempt >= policy.max_retries {
                            return JobOutcome::Failed(reason);
                        }
                        attempt += 1;
                        debug!(attempt, %reason, "resubmitting job");
                        if !policy.retry_delay.is_zero() {
                            tokio::time::sleep(policy.retry_delay).await;
                        }
                    }
                }
            }
        });
        TaskHandle { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ok_job_succeeds_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let handle = TaskExecutor::new().submit(RetryPolicy::immediate(3), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                JobResult::Ok
            }
        });
        assert_eq!(handle.wait().await, JobOutcome::Succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retryable_resubmits_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let handle = TaskExecutor::new().submit(RetryPolicy::immediate(3), move || {
            let seen = seen.clone();
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) < 2 {
                    JobResult::Retryable("flaky".into())
                } else {
                    JobResult::Ok
                }
            }
        });
        assert_eq!(handle.wait().await, JobOutcome::Succeeded);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retryable_exhausts_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let handle = TaskExecutor::new().submit(RetryPolicy::immediate(3), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                JobResult::Retryable("still down".into())
            }
        });
        assert_eq!(
            handle.wait().await,
            JobOutcome::Failed("still down".into())
        );
        // initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_never_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let handle = TaskExecutor::new().submit(RetryPolicy::immediate(3), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                JobResult::Fatal("Timeout".into())
            }
        });
        assert_eq!(handle.wait().await, JobOutcome::Failed("Timeout".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_is_respected() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let started = tokio::time::Instant::now();
        let handle = TaskExecutor::new().submit(
            RetryPolicy::delayed(1, Duration::from_secs(300)),
            move || {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                        JobResult::Retryable("first".into())
                    } else {
                        JobResult::Ok
                    }
                }
            },
        );
        assert_eq!(handle.wait().await, JobOutcome::Succeeded);
        assert!(started.elapsed() >= Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_miss_reports_timeout() {
        let handle = TaskExecutor::new().submit(RetryPolicy::immediate(0), || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            JobResult::Ok
        });
        let outcome = handle
            .wait_with_deadline(Duration::from_secs(20))
            .await;
        assert_eq!(outcome, JobOutcome::Failed("Timeout".into()));
    }
}
