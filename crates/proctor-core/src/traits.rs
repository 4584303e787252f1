//! Traits for the external collaborators of an exam session.
//!
//! These async traits are implemented by the `proctor-store` crate. Errors
//! are returned as `anyhow::Error`; implementations should wrap a
//! [`StoreError`](crate::error::StoreError) so the proctor can tell a missing
//! exam from a transport failure.

use async_trait::async_trait;

use crate::model::{ExamDefinition, ExamReport, ReportAck};

/// Source of exam definitions.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Human-readable store name (e.g. "fs").
    fn name(&self) -> &str;

    /// Fetch one exam by identifier.
    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition>;
}

/// Destination for scored attempts.
///
/// Deliveries may be retried with the same report; implementations should
/// treat a repeated `report.id` as the same submission.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Human-readable sink name (e.g. "http").
    fn name(&self) -> &str;

    /// Persist one report.
    async fn submit_report(&self, report: &ExamReport) -> anyhow::Result<ReportAck>;
}
