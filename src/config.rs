//! Environment-driven runtime configuration

use crate::dispatch::DispatchConfig;
use crate::services::{MerchantContact, ReportJobConfig};
use std::env;
use std::time::Duration;

fn env_str(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_duration_secs(name: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        env::var(name)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(default_secs),
    )
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen address
    pub bind: String,
    /// Delivery job timing and retry bounds
    pub dispatch: DispatchConfig,
    /// Scheduled report job retry bounds
    pub report_job: ReportJobConfig,
    /// Contact used by the static merchant directory
    pub report_contact: MerchantContact,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            bind: env_str("TXREPORT_BIND", "127.0.0.1:8000"),
            dispatch: DispatchConfig {
                soft_time_limit: env_duration_secs("TXREPORT_SOFT_TIME_LIMIT_SECS", 20),
                wait_budget: env_duration_secs("TXREPORT_WAIT_BUDGET_SECS", 20),
                delivery_retries: env_u32("TXREPORT_DELIVERY_RETRIES", 3),
            },
            report_job: ReportJobConfig {
                max_retries: env_u32("TXREPORT_REPORT_RETRIES", 3),
                retry_delay: env_duration_secs("TXREPORT_REPORT_RETRY_DELAY_SECS", 5 * 60),
            },
            report_contact: MerchantContact {
                email: env_str("TXREPORT_REPORT_EMAIL", "merchant@example.com"),
                phone: env_str("TXREPORT_REPORT_PHONE", "09021166394"),
            },
        }
    }
}
