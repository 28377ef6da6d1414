//! Type definitions for txreport

mod error;
mod notify;
mod report;

pub use error::*;
pub use notify::*;
pub use report::*;
