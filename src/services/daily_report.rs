//! Scheduled daily report job
//!
//! Once a day, every merchant with transaction history gets a summary of
//! their daily count and amount over email and SMS. Contact resolution is
//! an external concern behind [`MerchantDirectory`]; the in-tree
//! implementation hands every merchant the configured contact, standing in
//! for a real directory service.

use crate::calendar;
use crate::dispatch::{Dispatcher, JobResult, RetryPolicy, TaskExecutor};
use crate::services::ReportService;
use crate::store::TransactionStore;
use crate::types::{format_value, DispatchTask, Granularity, Medium, MerchantId, MetricType};
use chrono::{Local, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Where a merchant's reports go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantContact {
    pub email: String,
    pub phone: String,
}

/// Resolves a merchant to their notification contact.
pub trait MerchantDirectory: Send + Sync {
    fn contact(&self, merchant: &MerchantId) -> Option<MerchantContact>;
}

/// Directory that answers every lookup with one configured contact.
pub struct StaticDirectory {
    contact: MerchantContact,
}

impl StaticDirectory {
    pub fn new(contact: MerchantContact) -> Self {
        StaticDirectory { contact }
    }
}

impl MerchantDirectory for StaticDirectory {
    fn contact(&self, _merchant: &MerchantId) -> Option<MerchantContact> {
        Some(self.contact.clone())
    }
}

/// Per-run retry bounds for the scheduled job.
#[derive(Debug, Clone, Copy)]
pub struct ReportJobConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ReportJobConfig {
    fn default() -> Self {
        ReportJobConfig {
            max_retries: 3,
            retry_delay: Duration::from_secs(5 * 60),
        }
    }
}

impl ReportJobConfig {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy::delayed(self.max_retries, self.retry_delay)
    }
}

pub struct DailyReportJob {
    transactions: Arc<dyn TransactionStore>,
    reports: ReportService,
    directory: Arc<dyn MerchantDirectory>,
    dispatcher: Arc<Dispatcher>,
}

impl DailyReportJob {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        reports: ReportService,
        directory: Arc<dyn MerchantDirectory>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        DailyReportJob {
            transactions,
            reports,
            directory,
            dispatcher,
        }
    }

    /// One pass over all merchants. Per-merchant failures are logged and
    /// skipped; only a failure to enumerate merchants at all is worth a
    /// job-level retry.
    pub async fn run_once(&self) -> JobResult {
        let merchants = match self.transactions.distinct_merchants() {
            Ok(merchants) => merchants,
            Err(err) => return JobResult::Retryable(err.to_string()),
        };

        let today_key = match calendar::period_key(Utc::now().date_naive(), Granularity::Daily) {
            Ok(key) => key,
            Err(err) => return JobResult::Fatal(err.to_string()),
        };

        let mut notified = 0usize;
        for merchant in merchants {
            let Some(contact) = self.directory.contact(&merchant) else {
                continue;
            };
            match self.merchant_totals(&merchant, &today_key) {
                Ok((count, amount)) => {
                    let message = format!(
                        "Hello, your daily report is as follows: Count: {}, Amount: {}.",
                        format_value(count),
                        format_value(amount)
                    );
                    self.dispatcher
                        .submit(DispatchTask {
                            medium: Medium::Email,
                            recipient: contact.email,
                            message: message.clone(),
                        })
                        .detach();
                    self.dispatcher
                        .submit(DispatchTask {
                            medium: Medium::Sms,
                            recipient: contact.phone,
                            message,
                        })
                        .detach();
                    notified += 1;
                }
                Err(err) => {
                    warn!(merchant = %merchant, %err, "daily report fetch failed, skipping merchant");
                }
            }
        }

        info!(notified, "daily report pass complete");
        JobResult::Ok
    }

    /// Today's (count, amount) aggregates for one merchant, via the live
    /// report path.
    fn merchant_totals(
        &self,
        merchant: &MerchantId,
        today_key: &str,
    ) -> crate::types::Result<(f64, f64)> {
        let mut totals = [0.0f64; 2];
        for (slot, metric) in MetricType::ALL.into_iter().enumerate() {
            let rows = self
                .reports
                .live(Granularity::Daily, metric, Some(merchant))?;
            totals[slot] = rows
                .iter()
                .filter(|row| row.key == today_key)
                .map(|row| row.value)
                .sum();
        }
        Ok((totals[0], totals[1]))
    }
}

/// Run the report job once under its retry policy and log the final fate.
pub async fn run_report_job(job: Arc<DailyReportJob>, config: ReportJobConfig) {
    let executor = TaskExecutor::new();
    let handle = executor.submit(config.policy(), move || {
        let job = Arc::clone(&job);
        async move { job.run_once().await }
    });
    match handle.wait().await {
        crate::dispatch::JobOutcome::Succeeded => {}
        crate::dispatch::JobOutcome::Failed(reason) => {
            error!(%reason, "daily report job failed after retries");
        }
    }
}

/// Submit the report job at every local midnight, forever.
pub async fn run_midnight_scheduler(job: Arc<DailyReportJob>, config: ReportJobConfig) {
    loop {
        let delay = sleep_until_next_midnight();
        info!(seconds = delay.as_secs(), "next daily report scheduled");
        tokio::time::sleep(delay).await;
        run_report_job(Arc::clone(&job), config).await;
    }
}

/// Time left until the next local midnight.
///
/// DST shifts can make midnight ambiguous or nonexistent; resolve to the
/// earliest valid instant, or 01:00 when midnight is skipped entirely.
fn sleep_until_next_midnight() -> Duration {
    let now = Local::now();
    let tomorrow = now.date_naive() + chrono::Days::new(1);
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default();
    let target = match Local.from_local_datetime(&midnight) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earlier, _) => earlier,
        chrono::LocalResult::None => {
            let fallback = tomorrow.and_hms_opt(1, 0, 0).unwrap_or_default();
            Local
                .from_local_datetime(&fallback)
                .earliest()
                .unwrap_or(now)
        }
    };
    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}
