//! Fieldbook core: congregation field-service records and the reports built
//! from them.
//!
//! - `period`: month arithmetic, rolling windows and service years
//! - `classify`: reporting status of publishers over windows
//! - `aggregate`: monthly and window totals per bucket
//! - `reports`: group, consolidated and dashboard views over a `Snapshot`
//! - `edit`: draft editing of a month's reports with batch save
//! - `applications`: auxiliary pioneer requests and signatures
//! - `store`: the document store seam with memory and file backends

pub mod aggregate;
pub mod applications;
pub mod classify;
pub mod config;
pub mod edit;
pub mod error;
pub mod models;
pub mod period;
pub mod reports;
pub mod snapshot;
pub mod store;
pub mod utils;

pub use aggregate::{summarize_month, summarize_window, BucketTotals, MonthlySummary, WindowSummary};
pub use classify::{has_reported, irregular, newly_inactive, pending, IrregularPublisher, ReportBucket};
pub use config::Config;
pub use edit::EditSession;
pub use error::{Error, Result, StoreError, ValidationError};
pub use models::{PioneerApplication, Publisher, PublisherStatus, ServiceReport, WatchAssignment};
pub use period::{Month, MonthYear};
pub use reports::{ConsolidatedReport, Dashboard, GroupReportRow, ReportFilter};
pub use snapshot::{ChangeSet, LiveSnapshot, Snapshot};
pub use store::{Document, DocumentStore, FileStore, MemoryStore};
