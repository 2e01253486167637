//! Data models for congregation records.
//!
//! This module contains the structures stored in the document store:
//!
//! - `Publisher`: congregation member with group, status and privileges
//! - `ServiceReport`: one publisher's monthly field-service report
//! - `PioneerApplication`: auxiliary-pioneer request with committee signatures
//! - `WatchAssignment`: dated watch-duty roster entry
//!
//! Field names follow the stored documents; numeric fields are read leniently.

pub mod application;
pub mod publisher;
pub mod report;
pub mod watch;

pub use application::{ApplicationStatus, PioneerApplication, SIGNATURE_SLOTS};
pub use publisher::{Publisher, PublisherStatus, REGULAR_PIONEER};
pub use report::{ReportKey, ServiceReport, AUXILIARY_MARKER};
pub use watch::{watch_for_group, watch_for_month, WatchAssignment};
