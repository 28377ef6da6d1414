//! Services for aggregation, materialization, and scheduled reporting

pub mod daily_report;
pub mod materializer;
pub mod reports;

pub use daily_report::{
    DailyReportJob, MerchantContact, MerchantDirectory, ReportJobConfig, StaticDirectory,
};
pub use materializer::Materializer;
pub use reports::ReportService;
