//! Notification dispatch orchestration
//!
//! Expands a delimiter-encoded medium/recipient request into independent
//! delivery jobs and resolves them with first-success-wins semantics.
//! Every attempt outcome lands in the delivery log before it is reported
//! upward.

mod executor;
mod gateway;

pub use executor::{JobOutcome, JobResult, RetryPolicy, TaskExecutor, TaskHandle};
pub use gateway::{NotificationGateway, StubGateway};

use crate::store::DeliveryLog;
use crate::types::{DeliveryAttempt, DeliveryStatus, DispatchTask, Medium};
use std::sync::Arc;
use std::time::Duration;

/// Timing and retry knobs for delivery jobs.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Cooperative per-attempt send budget.
    pub soft_time_limit: Duration,
    /// How long the orchestrator waits on each submitted task.
    pub wait_budget: Duration,
    /// Resubmissions allowed per delivery job on non-timeout failure.
    pub delivery_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            soft_time_limit: Duration::from_secs(20),
            wait_budget: Duration::from_secs(20),
            delivery_retries: 3,
        }
    }
}

/// Result of expanding a dispatch request into tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub tasks: Vec<DispatchTask>,
    pub errors: Vec<String>,
}

/// Expand delimiter-encoded medium and recipient lists into tasks.
///
/// Media are comma-separated; recipients are `|`-separated positional
/// groups, where the group sharing a medium's position holds that
/// medium's `;`-separated recipients. Unsupported medium names become
/// error entries without stopping the rest of the expansion; a supported
/// medium with no positional group simply yields no tasks.
pub fn expand(medium: &str, recipient: &str, message: &str) -> Expansion {
    let groups: Vec<&str> = recipient.split('|').collect();
    let mut tasks = Vec::new();
    let mut errors = Vec::new();

    for (position, name) in medium.split(',').enumerate() {
        let medium = match name.parse::<Medium>() {
            Ok(medium) => medium,
            Err(err) => {
                errors.push(err.to_string());
                continue;
            }
        };
        let Some(group) = groups.get(position) else {
            continue;
        };
        for recipient in group.split(';') {
            tasks.push(DispatchTask {
                medium,
                recipient: recipient.to_string(),
                message: message.to_string(),
            });
        }
    }

    Expansion { tasks, errors }
}

/// Overall dispatch verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

/// Orchestrates delivery jobs across channels and recipients.
pub struct Dispatcher {
    gateway: Arc<dyn NotificationGateway>,
    log: Arc<dyn DeliveryLog>,
    executor: TaskExecutor,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        log: Arc<dyn DeliveryLog>,
        config: DispatchConfig,
    ) -> Self {
        Dispatcher {
            gateway,
            log,
            executor: TaskExecutor::new(),
            config,
        }
    }

    /// Submit one delivery job. Non-timeout failures are retried under the
    /// executor's delivery policy; a soft-timeout attempt is recorded and
    /// fails the job outright.
    pub fn submit(&self, task: DispatchTask) -> TaskHandle {
        let gateway = Arc::clone(&self.gateway);
        let log = Arc::clone(&self.log);
        let soft_time_limit = self.config.soft_time_limit;
        let policy = RetryPolicy::immediate(self.config.delivery_retries);
        self.executor.submit(policy, move || {
            deliver_once(
                Arc::clone(&gateway),
                Arc::clone(&log),
                task.clone(),
                soft_time_limit,
            )
        })
    }

    /// Expand a request and resolve it first-success-wins.
    ///
    /// All tasks are submitted up front and evaluated in submission order;
    /// the first success ends evaluation. Tasks not yet evaluated keep
    /// running and logging on their own. With no success, the accumulated
    /// per-task errors are returned.
    pub async fn dispatch(&self, medium: &str, recipient: &str, message: &str) -> DispatchOutcome {
        let Expansion { tasks, mut errors } = expand(medium, recipient, message);

        let submitted: Vec<(Medium, String, TaskHandle)> = tasks
            .into_iter()
            .map(|task| {
                let medium = task.medium;
                let recipient = task.recipient.clone();
                (medium, recipient, self.submit(task))
            })
            .collect();

        for (medium, recipient, handle) in submitted {
            match handle.wait_with_deadline(self.config.wait_budget).await {
                JobOutcome::Succeeded => {
                    return DispatchOutcome {
                        success: true,
                        errors,
                    };
                }
                JobOutcome::Failed(reason) => {
                    errors.push(format!("{medium} to {recipient}: {reason}"));
                }
            }
        }

        DispatchOutcome {
            success: false,
            errors,
        }
    }
}

/// One delivery attempt: gateway send under the soft time limit, with the
/// outcome appended to the audit log before it is reported.
async fn deliver_once(
    gateway: Arc<dyn NotificationGateway>,
    log: Arc<dyn DeliveryLog>,
    task: DispatchTask,
    soft_time_limit: Duration,
) -> JobResult {
    let send = async {
        match task.medium {
            Medium::Email => gateway.send_email(&task.recipient, &task.message).await,
            Medium::Sms => gateway.send_sms(&task.recipient, &task.message).await,
            Medium::Push => gateway.send_push(&task.recipient, &task.message).await,
            Medium::Telegram => gateway.send_telegram(&task.recipient, &task.message).await,
        }
    };

    match tokio::time::timeout(soft_time_limit, send).await {
        Ok(Ok(())) => {
            log.append(DeliveryAttempt::record(&task, &DeliveryStatus::Success));
            JobResult::Ok
        }
        Ok(Err(err)) => {
            let reason = err.to_string();
            log.append(DeliveryAttempt::record(
                &task,
                &DeliveryStatus::Failed(reason.clone()),
            ));
            JobResult::Retryable(reason)
        }
        Err(_) => {
            log.append(DeliveryAttempt::record(&task, &DeliveryStatus::Timeout));
            JobResult::Fatal("Timeout".to_string())
        }
    }
}
