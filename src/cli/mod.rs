use crate::config::AppConfig;
use crate::dispatch::{Dispatcher, StubGateway};
use crate::http::{self, AppState};
use crate::services::{
    daily_report, DailyReportJob, Materializer, ReportService, StaticDirectory,
};
use crate::store::MemoryStore;
use crate::types::{Granularity, MetricType};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Transaction report aggregation and notification service
#[derive(Parser)]
#[command(name = "txreport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the midnight report scheduler (default)
    Serve {
        /// Listen address, overrides TXREPORT_BIND
        #[arg(long)]
        bind: Option<String>,

        /// JSONL file of transaction documents to load
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Update the transaction summary collection
    Materialize {
        /// Granularity: daily, weekly, or monthly (all when omitted)
        #[arg(long)]
        mode: Option<Granularity>,

        /// Metric: count or amount (all when omitted)
        #[arg(long = "type")]
        metric: Option<MetricType>,

        /// Restrict the run to one merchant
        #[arg(long)]
        merchant_id: Option<String>,

        /// JSONL file of transaction documents to load
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Run the daily report job once, immediately
    SendReports {
        /// JSONL file of transaction documents to load
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = AppConfig::from_env();
        match self.command {
            None => serve(None, None, config).await,
            Some(Commands::Serve { bind, data }) => serve(bind, data, config).await,
            Some(Commands::Materialize {
                mode,
                metric,
                merchant_id,
                data,
            }) => {
                let store = load_store(data)?;
                Materializer::new(store.clone(), store)
                    .run(mode, metric, merchant_id.as_deref())?;
                info!("Successfully updated transaction summary");
                Ok(())
            }
            Some(Commands::SendReports { data }) => {
                let store = load_store(data)?;
                let (job, _) = build_report_job(store, &config);
                daily_report::run_report_job(Arc::new(job), config.report_job).await;
                Ok(())
            }
        }
    }
}

fn load_store(data: Option<PathBuf>) -> anyhow::Result<Arc<MemoryStore>> {
    Ok(Arc::new(match data {
        Some(path) => MemoryStore::load_jsonl(&path)?,
        None => MemoryStore::new(),
    }))
}

fn build_report_job(store: Arc<MemoryStore>, config: &AppConfig) -> (DailyReportJob, Arc<Dispatcher>) {
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(StubGateway),
        store.clone(),
        config.dispatch,
    ));
    let reports = ReportService::new(store.clone(), store.clone());
    let directory = Arc::new(StaticDirectory::new(config.report_contact.clone()));
    let job = DailyReportJob::new(store, reports, directory, Arc::clone(&dispatcher));
    (job, dispatcher)
}

async fn serve(bind: Option<String>, data: Option<PathBuf>, config: AppConfig) -> anyhow::Result<()> {
    let store = load_store(data)?;
    let (job, dispatcher) = build_report_job(store.clone(), &config);

    tokio::spawn(daily_report::run_midnight_scheduler(
        Arc::new(job),
        config.report_job,
    ));

    let state = AppState {
        reports: ReportService::new(store.clone(), store),
        dispatcher,
    };
    http::serve(bind.as_deref().unwrap_or(&config.bind), state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["txreport"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["txreport", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { bind: Some(b), .. }) if b == "0.0.0.0:9000"
        ));
    }

    #[test]
    fn test_cli_parse_materialize_selectors() {
        let cli = Cli::try_parse_from([
            "txreport",
            "materialize",
            "--mode",
            "weekly",
            "--type",
            "amount",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Materialize {
                mode: Some(Granularity::Weekly),
                metric: Some(MetricType::Amount),
                ..
            })
        ));
    }

    #[test]
    fn test_cli_parse_materialize_rejects_bad_mode() {
        assert!(Cli::try_parse_from(["txreport", "materialize", "--mode", "hourly"]).is_err());
    }

    #[test]
    fn test_cli_parse_send_reports() {
        let cli = Cli::try_parse_from(["txreport", "send-reports"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::SendReports { .. })));
    }
}
